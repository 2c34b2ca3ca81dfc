//! Free-text parsing.
//!
//! User input is escaped with [`escape`] before parsing so that characters
//! such as `:` `*` or `(` are taken literally. The parser then accepts only
//! literal text: every term found by the analyzer becomes a disjunction over
//! the searched fields, and those disjunctions are OR-ed together.

use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::error::{GlaiveError, Result};
use crate::search::query::{BooleanQuery, Query};

/// Characters with a meaning in query syntax.
const SPECIAL_CHARS: &[char] = &[
    '\\', '+', '-', '!', '(', ')', ':', '^', '[', ']', '"', '{', '}', '~', '*', '?', '|', '&', '/',
];

/// Escape every query-syntax character in `text` with a backslash.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Parses escaped free text into a multi-field query.
#[derive(Debug, Clone)]
pub struct QueryParser {
    analyzer: Arc<dyn Analyzer>,
    fields: Vec<String>,
}

impl QueryParser {
    /// Search `fields`, analyzing input with `analyzer`.
    pub fn new<S: AsRef<str>>(analyzer: Arc<dyn Analyzer>, fields: &[S]) -> Self {
        QueryParser {
            analyzer,
            fields: fields.iter().map(|f| f.as_ref().to_string()).collect(),
        }
    }

    /// The searched fields.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Parse escaped input.
    ///
    /// Unescaped syntax characters and a dangling backslash are syntax errors.
    /// Input that yields no terms parses to [`Query::MatchNone`].
    pub fn parse(&self, input: &str) -> Result<Query> {
        let text = unescape(input)?;
        let terms = self.analyzer.terms(&text)?;

        let mut seen = Vec::with_capacity(terms.len());
        let mut query = BooleanQuery::new();
        for term in terms {
            if seen.contains(&term) {
                continue;
            }
            let mut per_field = BooleanQuery::new();
            for field in &self.fields {
                per_field = per_field.should(Query::term(field.as_str(), term.as_str()));
            }
            query = query.should(Query::Boolean(per_field));
            seen.push(term);
        }

        if query.is_empty() {
            Ok(Query::MatchNone)
        } else {
            Ok(Query::Boolean(query))
        }
    }
}

fn unescape(input: &str) -> Result<String> {
    let mut text = String::with_capacity(input.len());
    let mut chars = input.char_indices();
    while let Some((position, c)) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some((_, escaped)) => text.push(escaped),
                None => {
                    return Err(GlaiveError::query(format!(
                        "Dangling escape character at position {position}"
                    )));
                }
            }
        } else if SPECIAL_CHARS.contains(&c) {
            return Err(GlaiveError::query(format!(
                "Unexpected '{c}' at position {position}"
            )));
        } else {
            text.push(c);
        }
    }
    Ok(text)
}
