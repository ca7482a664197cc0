//! Tablepipe pipeline - the four workflow stages and the runner around them.
//!
//! This crate provides:
//! - Ingest: raw CSV into the relational table
//! - Extract: the table back out to CSV
//! - Clean: normalization of the extracted CSV
//! - Publish: one search document per cleaned row
//! - A sequential runner with run history and a fixed retry
//! - The schedule descriptor an external scheduler consumes

mod error;
mod runner;
mod schedule;
pub mod stages;

pub use error::{PipelineError, PipelineResult};
pub use runner::{NoopObserver, Pipeline, PipelineSettings, RunObserver, StageOutcome};
pub use schedule::{RetryPolicy, WorkflowSchedule};
pub use stages::clean::{CleanReport, CleanRules};
pub use stages::publish::{PublishReport, PublishSettings};
