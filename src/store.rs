//! The system of record.
//!
//! The index only mirrors records; [`ContentStore`] is the authority that
//! assigns ids and timestamps. [`MemoryContentStore`] is a thread-safe
//! in-process implementation used by the CLI and tests.

use std::collections::BTreeMap;

use chrono::Local;
use parking_lot::RwLock;

use crate::document::ContentRecord;
use crate::error::Result;

/// Anything that can enumerate every record, for a full reindex.
pub trait ContentSource {
    /// Every record, in id order where ids exist.
    fn records(&self) -> Result<Vec<ContentRecord>>;
}

impl ContentSource for [ContentRecord] {
    fn records(&self) -> Result<Vec<ContentRecord>> {
        Ok(self.to_vec())
    }
}

impl ContentSource for Vec<ContentRecord> {
    fn records(&self) -> Result<Vec<ContentRecord>> {
        Ok(self.clone())
    }
}

/// CRUD access to stored records.
pub trait ContentStore: ContentSource + Send + Sync {
    /// Store a new record. The store assigns its id and timestamps.
    fn create(&self, record: ContentRecord) -> Result<ContentRecord>;

    /// Look up a record.
    fn get(&self, id: i64) -> Result<Option<ContentRecord>>;

    /// Replace the editable fields of a record. `None` if it does not exist.
    fn update(&self, id: i64, record: ContentRecord) -> Result<Option<ContentRecord>>;

    /// Remove a record. Returns whether it existed.
    fn delete(&self, id: i64) -> Result<bool>;

    /// Every record.
    fn list(&self) -> Result<Vec<ContentRecord>>;

    /// Records matching exact category and author, and containing `query`
    /// case-insensitively in title, body or tags. Absent criteria match all.
    fn find_by_filters(
        &self,
        category: Option<&str>,
        author: Option<&str>,
        query: Option<&str>,
    ) -> Result<Vec<ContentRecord>>;
}

/// Whether `record` passes the store-side filters.
pub fn matches_filters(
    record: &ContentRecord,
    category: Option<&str>,
    author: Option<&str>,
    query: Option<&str>,
) -> bool {
    if let Some(category) = category
        && record.category.as_deref() != Some(category)
    {
        return false;
    }
    if let Some(author) = author
        && record.author.as_deref() != Some(author)
    {
        return false;
    }
    let Some(query) = query else {
        return true;
    };

    let needle = query.to_lowercase();
    [
        Some(record.title.as_str()),
        Some(record.body.as_str()),
        record.tags.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|text| text.to_lowercase().contains(&needle))
}

#[derive(Debug, Default)]
struct Records {
    next_id: i64,
    by_id: BTreeMap<i64, ContentRecord>,
}

/// A record store held in memory.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    inner: RwLock<Records>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding `records`. Records without id get fresh ones.
    pub fn with_records<I: IntoIterator<Item = ContentRecord>>(records: I) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.write();
            for mut record in records {
                let id = match record.id {
                    Some(id) => id,
                    None => inner.next_id + 1,
                };
                inner.next_id = inner.next_id.max(id);
                record.id = Some(id);
                inner.by_id.insert(id, record);
            }
        }
        store
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().by_id.is_empty()
    }
}

impl ContentSource for MemoryContentStore {
    fn records(&self) -> Result<Vec<ContentRecord>> {
        self.list()
    }
}

impl ContentStore for MemoryContentStore {
    fn create(&self, mut record: ContentRecord) -> Result<ContentRecord> {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let id = inner.next_id;
        let now = Local::now().naive_local();

        record.id = Some(id);
        record.created_at = Some(now);
        record.updated_at = Some(now);
        inner.by_id.insert(id, record.clone());
        Ok(record)
    }

    fn get(&self, id: i64) -> Result<Option<ContentRecord>> {
        Ok(self.inner.read().by_id.get(&id).cloned())
    }

    fn update(&self, id: i64, record: ContentRecord) -> Result<Option<ContentRecord>> {
        let mut inner = self.inner.write();
        let Some(existing) = inner.by_id.get_mut(&id) else {
            return Ok(None);
        };

        existing.title = record.title;
        existing.body = record.body;
        existing.category = record.category;
        existing.author = record.author;
        existing.tags = record.tags;
        existing.updated_at = Some(Local::now().naive_local());
        Ok(Some(existing.clone()))
    }

    fn delete(&self, id: i64) -> Result<bool> {
        Ok(self.inner.write().by_id.remove(&id).is_some())
    }

    fn list(&self) -> Result<Vec<ContentRecord>> {
        Ok(self.inner.read().by_id.values().cloned().collect())
    }

    fn find_by_filters(
        &self,
        category: Option<&str>,
        author: Option<&str>,
        query: Option<&str>,
    ) -> Result<Vec<ContentRecord>> {
        Ok(self
            .inner
            .read()
            .by_id
            .values()
            .filter(|record| matches_filters(record, category, author, query))
            .cloned()
            .collect())
    }
}
