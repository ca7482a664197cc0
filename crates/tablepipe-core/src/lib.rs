//! Tablepipe Core - Table model, CSV codec and run types shared by every stage.

mod error;
mod table;
mod types;

pub use error::{Error, Result};
pub use table::{Table, Value, MISSING_TOKENS};
pub use types::*;
