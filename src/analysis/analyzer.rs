//! Analyzers combine a tokenizer with a chain of filters.
//!
//! # Examples
//!
//! ```
//! use glaive::analysis::analyzer::Analyzer;
//! use glaive::analysis::analyzer::standard::StandardAnalyzer;
//!
//! let analyzer = StandardAnalyzer::new();
//! let terms = analyzer.terms("The Quarterly REPORT").unwrap();
//! assert_eq!(terms, vec!["the", "quarterly", "report"]);
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

pub mod pipeline;
pub mod standard;

/// Trait for analyzers that turn text into index terms.
///
/// The same analyzer must be used for indexing, query parsing and
/// highlighting, otherwise terms will not line up.
pub trait Analyzer: Send + Sync + std::fmt::Debug {
    /// Analyze the given text and return a stream of tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer (for debugging and configuration).
    fn name(&self) -> &'static str;

    /// Analyze the text and keep only the term texts, in order.
    fn terms(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.analyze(text)?.map(|token| token.text).collect())
    }
}
