//! Schema-less field set stored per document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::FIELD_ID;
use crate::error::{GlaiveError, Result};

/// How a field value is indexed. Every field is stored verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indexing {
    /// Stored only, never searchable.
    Stored,
    /// Indexed as one exact, case-sensitive term.
    Keyword,
    /// Analyzed into terms for free-text search.
    Text,
    /// Analyzed, and also indexed as one exact term.
    TextAndKeyword,
}

impl Indexing {
    /// Whether the value is run through the analyzer.
    pub fn is_analyzed(self) -> bool {
        matches!(self, Indexing::Text | Indexing::TextAndKeyword)
    }

    /// Whether the verbatim value is indexed as a term.
    pub fn is_keyword(self) -> bool {
        matches!(self, Indexing::Keyword | Indexing::TextAndKeyword)
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Indexing::Stored => 0,
            Indexing::Keyword => 1,
            Indexing::Text => 2,
            Indexing::TextAndKeyword => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Indexing::Stored),
            1 => Ok(Indexing::Keyword),
            2 => Ok(Indexing::Text),
            3 => Ok(Indexing::TextAndKeyword),
            other => Err(GlaiveError::index(format!("Unknown field indexing {other}"))),
        }
    }
}

/// A stored field value with its indexing mode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub value: String,
    pub indexing: Indexing,
}

/// The per-record document held inside the index.
///
/// # Examples
///
/// ```
/// use glaive::document::{IndexedDocument, Indexing};
///
/// let doc = IndexedDocument::new()
///     .with_field("id", "7", Indexing::Keyword)
///     .with_field("title", "Quarterly report", Indexing::Text);
///
/// assert_eq!(doc.id(), Some(7));
/// assert_eq!(doc.get("title"), Some("Quarterly report"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDocument {
    fields: BTreeMap<String, Field>,
}

impl IndexedDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field.
    pub fn add_field<N: Into<String>, V: Into<String>>(
        &mut self,
        name: N,
        value: V,
        indexing: Indexing,
    ) {
        self.fields.insert(
            name.into(),
            Field {
                value: value.into(),
                indexing,
            },
        );
    }

    /// Builder-style [`add_field`](Self::add_field).
    pub fn with_field<N: Into<String>, V: Into<String>>(
        mut self,
        name: N,
        value: V,
        indexing: Indexing,
    ) -> Self {
        self.add_field(name, value, indexing);
        self
    }

    /// Get a field's stored value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|field| field.value.as_str())
    }

    /// Get a field with its indexing mode.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Iterate over fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The record identifier, if present and well-formed.
    pub fn id(&self) -> Option<i64> {
        self.get(FIELD_ID).and_then(|value| value.parse().ok())
    }
}
