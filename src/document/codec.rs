//! Mapping between content records, indexed documents and search hits.

use chrono::NaiveDateTime;
use log::debug;

use crate::document::field::{IndexedDocument, Indexing};
use crate::document::hit::SearchHit;
use crate::document::record::ContentRecord;
use crate::document::{
    FIELD_AUTHOR, FIELD_BODY, FIELD_CATEGORY, FIELD_CREATED_AT, FIELD_ID, FIELD_TAGS, FIELD_TITLE,
    FIELD_UPDATED_AT,
};

/// ISO-8601 local date-time, fractional seconds only when non-zero.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Format a timestamp the way it is stored in the index.
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()
}

/// Encode a record into its indexed form.
///
/// Missing text fields become empty strings. Missing timestamps are omitted.
///
/// # Examples
///
/// ```
/// use glaive::document::{encode, ContentRecord, Indexing};
///
/// let doc = encode(&ContentRecord::new("Report", "Numbers").with_id(5));
/// assert_eq!(doc.id(), Some(5));
/// assert_eq!(doc.get("category"), Some(""));
/// assert_eq!(doc.field("category").unwrap().indexing, Indexing::TextAndKeyword);
/// assert!(doc.get("createdAt").is_none());
/// ```
pub fn encode(record: &ContentRecord) -> IndexedDocument {
    let mut doc = IndexedDocument::new();

    if let Some(id) = record.id {
        doc.add_field(FIELD_ID, id.to_string(), Indexing::Keyword);
    }

    doc.add_field(FIELD_TITLE, record.title.as_str(), Indexing::Text);
    doc.add_field(FIELD_BODY, record.body.as_str(), Indexing::Text);
    doc.add_field(
        FIELD_CATEGORY,
        record.category.as_deref().unwrap_or_default(),
        Indexing::TextAndKeyword,
    );
    doc.add_field(
        FIELD_AUTHOR,
        record.author.as_deref().unwrap_or_default(),
        Indexing::TextAndKeyword,
    );
    doc.add_field(
        FIELD_TAGS,
        record.tags.as_deref().unwrap_or_default(),
        Indexing::Text,
    );

    if let Some(created_at) = &record.created_at {
        doc.add_field(FIELD_CREATED_AT, format_timestamp(created_at), Indexing::Stored);
    }
    if let Some(updated_at) = &record.updated_at {
        doc.add_field(FIELD_UPDATED_AT, format_timestamp(updated_at), Indexing::Stored);
    }

    doc
}

/// Decode a stored document into a hit carrying `score`.
///
/// A missing or malformed `id` yields a hit without identifier. Highlights are
/// left empty.
pub fn decode(doc: &IndexedDocument, score: f32) -> SearchHit {
    let text = |name: &str| doc.get(name).unwrap_or_default().to_string();
    let timestamp = |name: &str| {
        doc.get(name).and_then(|value| {
            let parsed = parse_timestamp(value);
            if parsed.is_none() {
                debug!("Ignoring unparseable {name} value {value:?}");
            }
            parsed
        })
    };

    SearchHit {
        id: doc.id(),
        title: text(FIELD_TITLE),
        body: text(FIELD_BODY),
        category: text(FIELD_CATEGORY),
        author: text(FIELD_AUTHOR),
        tags: text(FIELD_TAGS),
        created_at: timestamp(FIELD_CREATED_AT),
        updated_at: timestamp(FIELD_UPDATED_AT),
        score,
        highlighted_title: None,
        highlighted_body: None,
    }
}

/// Rebuild a record from an indexed document. Empty optional fields map to `None`.
pub fn to_record(doc: &IndexedDocument) -> ContentRecord {
    let optional = |name: &str| {
        doc.get(name)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    ContentRecord {
        id: doc.id(),
        title: doc.get(FIELD_TITLE).unwrap_or_default().to_string(),
        body: doc.get(FIELD_BODY).unwrap_or_default().to_string(),
        category: optional(FIELD_CATEGORY),
        author: optional(FIELD_AUTHOR),
        tags: optional(FIELD_TAGS),
        created_at: doc.get(FIELD_CREATED_AT).and_then(parse_timestamp),
        updated_at: doc.get(FIELD_UPDATED_AT).and_then(parse_timestamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timestamp(millis: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_milli_opt(14, 5, 7, millis)
            .unwrap()
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(format_timestamp(&timestamp(0)), "2024-03-09T14:05:07");
        assert_eq!(format_timestamp(&timestamp(250)), "2024-03-09T14:05:07.250");
        assert_eq!(
            parse_timestamp("2024-03-09T14:05:07.250"),
            Some(timestamp(250))
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_encode_nulls_become_empty() {
        let doc = encode(&ContentRecord::new("Title", "Body"));

        assert_eq!(doc.id(), None);
        assert!(doc.field(FIELD_ID).is_none());
        assert_eq!(doc.get(FIELD_AUTHOR), Some(""));
        assert_eq!(doc.get(FIELD_TAGS), Some(""));
        assert!(doc.get(FIELD_UPDATED_AT).is_none());
        assert_eq!(doc.field(FIELD_ID).map(|f| f.indexing), None);
    }

    #[test]
    fn test_decode_inverts_encode() {
        let record = ContentRecord {
            id: Some(11),
            title: "Quarterly report".to_string(),
            body: "Revenue grew".to_string(),
            category: Some("finance".to_string()),
            author: Some("alice".to_string()),
            tags: Some("q3".to_string()),
            created_at: Some(timestamp(0)),
            updated_at: Some(timestamp(125)),
        };

        let hit = decode(&encode(&record), 1.5);

        assert_eq!(hit.id, Some(11));
        assert_eq!(hit.title, "Quarterly report");
        assert_eq!(hit.category, "finance");
        assert_eq!(hit.author, "alice");
        assert_eq!(hit.created_at, Some(timestamp(0)));
        assert_eq!(hit.updated_at, Some(timestamp(125)));
        assert_eq!(hit.score, 1.5);
        assert!(hit.highlighted_body.is_none());

        assert_eq!(to_record(&encode(&record)), record);
    }

    #[test]
    fn test_decode_tolerates_missing_id() {
        let doc = IndexedDocument::new().with_field(FIELD_TITLE, "orphan", Indexing::Text);
        let hit = decode(&doc, 0.0);
        assert_eq!(hit.id, None);
        assert_eq!(hit.title, "orphan");
        assert_eq!(hit.body, "");
    }
}
