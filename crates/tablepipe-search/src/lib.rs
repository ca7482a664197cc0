//! Tablepipe Search - client for the search index the pipeline publishes to.
//!
//! [`SearchClient`] talks to an Elasticsearch-compatible HTTP API.
//! [`MemoryIndex`] keeps documents in process and backs dry runs and tests.
//! Both implement [`DocumentIndex`], which is all the publish stage needs.

mod client;
mod error;
mod index;
mod memory;
mod types;

pub use client::SearchClient;
pub use error::{SearchError, SearchResult};
pub use index::{Document, DocumentIndex};
pub use memory::MemoryIndex;
pub use types::*;
