//! Database operations.

pub mod runs;
pub mod stats;
pub mod tables;
