//! Content records and their index-native projection.
//!
//! - [`record::ContentRecord`] is the system-of-record shape handed to the index.
//! - [`field::IndexedDocument`] is what the index stores per record.
//! - [`codec`] maps between the two and builds [`hit::SearchHit`] projections.

pub mod codec;
pub mod field;
pub mod hit;
pub mod record;

pub use codec::{decode, encode};
pub use field::{Field, IndexedDocument, Indexing};
pub use hit::SearchHit;
pub use record::ContentRecord;

/// Stored + exact-match identifier field.
pub const FIELD_ID: &str = "id";
/// Analyzed title field.
pub const FIELD_TITLE: &str = "title";
/// Analyzed body field.
pub const FIELD_BODY: &str = "body";
/// Analyzed category field, also indexed verbatim for filtering.
pub const FIELD_CATEGORY: &str = "category";
/// Analyzed author field, also indexed verbatim for filtering.
pub const FIELD_AUTHOR: &str = "author";
/// Analyzed tags field.
pub const FIELD_TAGS: &str = "tags";
/// Stored-only creation timestamp.
pub const FIELD_CREATED_AT: &str = "createdAt";
/// Stored-only modification timestamp.
pub const FIELD_UPDATED_AT: &str = "updatedAt";

/// Fields searched by free text.
pub const TEXT_FIELDS: [&str; 3] = [FIELD_TITLE, FIELD_BODY, FIELD_TAGS];

/// Name under which the verbatim value of `field` is indexed.
pub fn keyword_field(field: &str) -> String {
    format!("{field}.keyword")
}
