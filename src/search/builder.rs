//! Builds the query for a search request.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::Analyzer;
use crate::document::{FIELD_AUTHOR, FIELD_CATEGORY, TEXT_FIELDS};
use crate::error::Result;
use crate::search::parser::{QueryParser, escape};
use crate::search::query::{BooleanQuery, Query};

/// Default number of results.
pub const DEFAULT_LIMIT: usize = 50;

/// A search request: free text plus exact-match filters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryRequest {
    /// Free text matched against title, body and tags.
    pub query: Option<String>,
    /// Exact category.
    pub category: Option<String>,
    /// Exact author.
    pub author: Option<String>,
    /// Maximum number of hits.
    pub limit: usize,
}

impl Default for QueryRequest {
    fn default() -> Self {
        QueryRequest {
            query: None,
            category: None,
            author: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl QueryRequest {
    /// A free-text request.
    pub fn new<S: Into<String>>(query: S) -> Self {
        QueryRequest {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    pub fn with_category<S: Into<String>>(mut self, category: S) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_author<S: Into<String>>(mut self, author: S) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// The free text, if it is not blank.
    pub fn text(&self) -> Option<&str> {
        non_blank(self.query.as_deref())
    }

    /// The category filter, if it is not blank.
    pub fn category_filter(&self) -> Option<&str> {
        non_blank(self.category.as_deref())
    }

    /// The author filter, if it is not blank.
    pub fn author_filter(&self) -> Option<&str> {
        non_blank(self.author.as_deref())
    }

    /// Whether the request has neither text nor filters.
    pub fn is_empty(&self) -> bool {
        self.text().is_none() && self.category_filter().is_none() && self.author_filter().is_none()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Turns requests into query trees.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    parser: QueryParser,
}

impl QueryBuilder {
    /// Build queries whose free text is analyzed with `analyzer`.
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        QueryBuilder {
            parser: QueryParser::new(analyzer, &TEXT_FIELDS),
        }
    }

    /// The AND of the free-text clause and the filters present in `request`,
    /// or `None` when the request is empty.
    pub fn build(&self, request: &QueryRequest) -> Result<Option<Query>> {
        let mut query = BooleanQuery::new();

        if let Some(text) = request.text() {
            query = query.must(self.parser.parse(&escape(text))?);
        }
        if let Some(category) = request.category_filter() {
            query = query.must(Query::keyword(FIELD_CATEGORY, category));
        }
        if let Some(author) = request.author_filter() {
            query = query.must(Query::keyword(FIELD_AUTHOR, author));
        }

        if query.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Query::Boolean(query)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::standard::StandardAnalyzer;

    fn builder() -> QueryBuilder {
        QueryBuilder::new(Arc::new(StandardAnalyzer::new()))
    }

    #[test]
    fn test_empty_request_builds_nothing() {
        assert_eq!(builder().build(&QueryRequest::default()).unwrap(), None);

        let blank = QueryRequest::new("   ").with_category("").with_author(" ");
        assert!(blank.is_empty());
        assert_eq!(builder().build(&blank).unwrap(), None);
    }

    #[test]
    fn test_text_and_filters_are_anded() {
        let request = QueryRequest::new("report")
            .with_category("finance")
            .with_author("alice");
        let query = builder().build(&request).unwrap().unwrap();

        assert_eq!(
            query.to_string(),
            "(+((title:report body:report tags:report)) \
             +category.keyword:finance +author.keyword:alice)"
        );
    }

    #[test]
    fn test_filters_alone() {
        let query = builder()
            .build(&QueryRequest::default().with_category("Finance"))
            .unwrap()
            .unwrap();
        assert_eq!(query.to_string(), "(+category.keyword:Finance)");
    }

    #[test]
    fn test_operator_characters_never_fail() {
        for text in ["title:* AND", "(unbalanced", "a\\", "\"quoted", "x^2 || y && !z"] {
            assert!(builder().build(&QueryRequest::new(text)).is_ok(), "{text}");
        }
    }

    #[test]
    fn test_default_limit() {
        assert_eq!(QueryRequest::default().limit, 50);
        let parsed: QueryRequest = serde_json::from_str(r#"{"query":"x"}"#).unwrap();
        assert_eq!(parsed.limit, DEFAULT_LIMIT);
    }
}
