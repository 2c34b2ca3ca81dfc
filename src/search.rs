//! Query construction, ranking and highlighting.
//!
//! A [`builder::QueryRequest`] is turned into a [`query::Query`] tree by
//! [`builder::QueryBuilder`]; a [`searcher::Searcher`] evaluates the tree over
//! an [`IndexSnapshot`](crate::index::reader::IndexSnapshot) with BM25 and a
//! top-N collector; [`highlight::Highlighter`] extracts display fragments for
//! the selected hits.

pub mod builder;
pub mod collector;
pub mod highlight;
pub mod parser;
pub mod query;
pub mod scoring;
pub mod searcher;

pub use builder::{QueryBuilder, QueryRequest};
pub use highlight::Highlighter;
pub use query::{BooleanQuery, Occur, Query, TermQuery};
pub use scoring::Bm25;
pub use searcher::{Searcher, TopDocs};
