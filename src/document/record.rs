//! The system-of-record content shape.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A content item as owned by the record store.
///
/// Serialized in camelCase so JSON lines exported by the record store can be
/// fed straight to the CLI.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

impl ContentRecord {
    /// Create a record with a title and body and nothing else.
    pub fn new<T: Into<String>, B: Into<String>>(title: T, body: B) -> Self {
        ContentRecord {
            title: title.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    /// Set the identifier.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the category.
    pub fn with_category<S: Into<String>>(mut self, category: S) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the author.
    pub fn with_author<S: Into<String>>(mut self, author: S) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the tags.
    pub fn with_tags<S: Into<String>>(mut self, tags: S) -> Self {
        self.tags = Some(tags.into());
        self
    }
}
