//! Orchestration of the record store and the index.
//!
//! Writes go to the store first and are then mirrored into the index. The two
//! are not updated atomically: if the index write fails after the store write
//! succeeded, the error is returned and [`ContentService::reindex_all`] brings
//! the index back in line.

use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::document::{ContentRecord, SearchHit};
use crate::engine::ContentIndex;
use crate::error::{GlaiveError, Result};
use crate::store::{ContentSource, ContentStore};

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 255;
/// Maximum category length in characters.
pub const MAX_CATEGORY_LEN: usize = 100;
/// Maximum author length in characters.
pub const MAX_AUTHOR_LEN: usize = 100;
/// Maximum tags length in characters.
pub const MAX_TAGS_LEN: usize = 500;

/// User-supplied fields of a content item.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentDraft {
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub author: Option<String>,
    pub tags: Option<String>,
}

impl ContentDraft {
    pub fn new<T: Into<String>, B: Into<String>>(title: T, body: B) -> Self {
        ContentDraft {
            title: title.into(),
            body: body.into(),
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

    pub fn with_tags<S: Into<String>>(mut self, tags: S) -> Self {
        self.tags = Some(tags.into());
        self
    }

    /// Check the draft, reporting every violated rule at once.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.title.trim().is_empty() {
            problems.push("Title is required".to_string());
        } else if self.title.chars().count() > MAX_TITLE_LEN {
            problems.push(format!("Title must not exceed {MAX_TITLE_LEN} characters"));
        }
        if self.body.trim().is_empty() {
            problems.push("Body is required".to_string());
        }
        for (name, value, max) in [
            ("Category", &self.category, MAX_CATEGORY_LEN),
            ("Author", &self.author, MAX_AUTHOR_LEN),
            ("Tags", &self.tags, MAX_TAGS_LEN),
        ] {
            if value.as_ref().is_some_and(|v| v.chars().count() > max) {
                problems.push(format!("{name} must not exceed {max} characters"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(GlaiveError::validation(problems.join("; ")))
        }
    }

    fn into_record(self) -> ContentRecord {
        ContentRecord {
            title: self.title,
            body: self.body,
            category: self.category,
            author: self.author,
            tags: self.tags,
            ..Default::default()
        }
    }
}

impl From<&ContentRecord> for ContentDraft {
    fn from(record: &ContentRecord) -> Self {
        ContentDraft {
            title: record.title.clone(),
            body: record.body.clone(),
            category: record.category.clone(),
            author: record.author.clone(),
            tags: record.tags.clone(),
        }
    }
}

fn not_found(id: i64) -> GlaiveError {
    GlaiveError::not_found(format!("Content not found with id: {id}"))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Coordinates the record store with the index.
#[derive(Clone)]
pub struct ContentService {
    store: Arc<dyn ContentStore>,
    index: Arc<ContentIndex>,
}

impl std::fmt::Debug for ContentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentService")
            .field("index", &self.index)
            .finish()
    }
}

impl ContentService {
    pub fn new(store: Arc<dyn ContentStore>, index: Arc<ContentIndex>) -> Self {
        ContentService { store, index }
    }

    /// The index this service writes to.
    pub fn index(&self) -> &Arc<ContentIndex> {
        &self.index
    }

    /// Every stored record.
    pub fn list(&self) -> Result<Vec<ContentRecord>> {
        self.store.list()
    }

    /// The stored record with `id`.
    pub fn get(&self, id: i64) -> Result<ContentRecord> {
        self.store.get(id)?.ok_or_else(|| not_found(id))
    }

    /// Validate, store and index a new record.
    pub fn create(&self, draft: ContentDraft) -> Result<ContentRecord> {
        draft.validate()?;
        let saved = self.store.create(draft.into_record())?;
        self.index.index_content(&saved)?;
        debug!("Created content {:?}", saved.id);
        Ok(saved)
    }

    /// Validate and apply an edit to an existing record.
    pub fn update(&self, id: i64, draft: ContentDraft) -> Result<ContentRecord> {
        draft.validate()?;
        let updated = self
            .store
            .update(id, draft.into_record())?
            .ok_or_else(|| not_found(id))?;
        self.index.index_content(&updated)?;
        debug!("Updated content {id}");
        Ok(updated)
    }

    /// Remove a record from the store and then from the index.
    pub fn delete(&self, id: i64) -> Result<()> {
        if self.store.get(id)?.is_none() {
            return Err(not_found(id));
        }
        self.store.delete(id)?;
        self.index.delete_content(id)?;
        debug!("Deleted content {id}");
        Ok(())
    }

    /// Full-text search through the index.
    pub fn search(
        &self,
        query: Option<&str>,
        category: Option<&str>,
        author: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<SearchHit>> {
        self.index.search(query, category, author, max_results)
    }

    /// Store-side filtering. Blank criteria are ignored.
    pub fn find_by_filters(
        &self,
        category: Option<&str>,
        author: Option<&str>,
        query: Option<&str>,
    ) -> Result<Vec<ContentRecord>> {
        self.store
            .find_by_filters(non_blank(category), non_blank(author), non_blank(query))
    }

    /// Re-index every stored record.
    pub fn reindex_all(&self) -> Result<usize> {
        let source: &dyn ContentSource = self.store.as_ref();
        self.index.reindex_all(source)
    }
}
