//! # Glaive
//!
//! A near-real-time, crash-consistent full-text search index for content
//! records.
//!
//! ## Features
//!
//! - Segment-based inverted index with a JSON manifest as the commit point
//! - Write log replay after an unclean shutdown
//! - Upsert by record id, delete of absent ids is a no-op
//! - Immutable reader snapshots, refreshed after every commit
//! - BM25 ranking over title, body and tags with exact category and author filters
//! - Query text is escaped, so user input never fails to parse
//! - Best-fragment highlighting with fallbacks
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use glaive::prelude::*;
//!
//! let index = ContentIndex::with_storage(
//!     Arc::new(MemoryStorage::new_default()),
//!     EngineConfig::default(),
//! )
//! .unwrap();
//!
//! index
//!     .index_content(
//!         &ContentRecord::new("Release notes", "Faster search and smaller segments")
//!             .with_id(1)
//!             .with_author("alice"),
//!     )
//!     .unwrap();
//!
//! let hits = index.search(Some("search"), None, Some("alice"), 10).unwrap();
//! assert_eq!(hits[0].id, Some(1));
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod index;
pub mod search;
pub mod service;
pub mod storage;
pub mod store;
pub mod util;

pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::document::{ContentRecord, SearchHit};
    pub use crate::engine::{ContentIndex, IndexStats};
    pub use crate::error::{GlaiveError, Result};
    pub use crate::search::QueryRequest;
    pub use crate::service::{ContentDraft, ContentService};
    pub use crate::storage::{FileStorage, MemoryStorage, Storage};
    pub use crate::store::{ContentSource, ContentStore, MemoryContentStore};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
