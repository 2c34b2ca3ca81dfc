//! Text analysis: turning field text into the terms stored in the index.
//!
//! Indexing and querying must agree on term normalization, so the same
//! [`Analyzer`](analyzer::Analyzer) is shared by the writer, the query parser
//! and the highlighter.

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;
