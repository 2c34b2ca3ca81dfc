//! Point-in-time views over committed segments.

use std::sync::Arc;

use ahash::AHashMap;

use crate::document::field::IndexedDocument;
use crate::error::{GlaiveError, Result};
use crate::index::deletion::DeletionSet;
use crate::index::manifest::SegmentEntry;
use crate::index::segment::Segment;
use crate::index::term::Term;
use crate::storage::Storage;

/// Aggregate length statistics of one field over live documents.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FieldStats {
    /// Live documents with at least one term in the field.
    pub doc_count: u64,
    /// Sum of field lengths over live documents.
    pub total_length: u64,
}

impl FieldStats {
    fn merge(&mut self, other: &FieldStats) {
        self.doc_count += other.doc_count;
        self.total_length += other.total_length;
    }

    /// Average field length, or 1.0 for a field with no data.
    pub fn average_length(&self) -> f32 {
        if self.doc_count == 0 {
            1.0
        } else {
            self.total_length as f32 / self.doc_count as f32
        }
    }
}

/// A segment together with the deletions of one commit.
#[derive(Clone, Debug)]
pub struct SegmentReader {
    segment: Arc<Segment>,
    deletions: Arc<DeletionSet>,
    deletion_generation: Option<u64>,
    field_stats: Arc<AHashMap<String, FieldStats>>,
}

impl SegmentReader {
    /// Wrap a segment that has no deletions.
    pub fn new(segment: Arc<Segment>) -> Self {
        let deletions = DeletionSet::new(segment.max_doc());
        Self::with_deletions(segment, deletions, None)
    }

    /// Wrap a segment with the given deletions.
    pub fn with_deletions(
        segment: Arc<Segment>,
        deletions: DeletionSet,
        deletion_generation: Option<u64>,
    ) -> Self {
        let field_stats = Arc::new(compute_field_stats(&segment, &deletions));
        SegmentReader {
            segment,
            deletions: Arc::new(deletions),
            deletion_generation,
            field_stats,
        }
    }

    /// Load the segment and deletions named by a manifest entry.
    pub fn open(storage: &dyn Storage, entry: &SegmentEntry) -> Result<Self> {
        let segment = Segment::read(storage, &entry.name)?;
        if segment.max_doc() != entry.doc_count {
            return Err(GlaiveError::index(format!(
                "Segment {} has {} documents, manifest says {}",
                entry.name,
                segment.max_doc(),
                entry.doc_count
            )));
        }

        let deletions = match entry.deletion_file() {
            Some(file) => DeletionSet::read(storage, &file, segment.max_doc())?,
            None => DeletionSet::new(segment.max_doc()),
        };

        Ok(Self::with_deletions(
            Arc::new(segment),
            deletions,
            entry.deletion_generation,
        ))
    }

    /// The underlying segment.
    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    /// Shared handle to the underlying segment.
    pub fn segment_arc(&self) -> &Arc<Segment> {
        &self.segment
    }

    /// The deletions visible through this reader.
    pub fn deletions(&self) -> &DeletionSet {
        &self.deletions
    }

    /// Generation of the deletion file backing this reader.
    pub fn deletion_generation(&self) -> Option<u64> {
        self.deletion_generation
    }

    /// Whether `doc` is live.
    pub fn is_live(&self, doc: u32) -> bool {
        doc < self.segment.max_doc() && !self.deletions.is_deleted(doc)
    }

    /// Number of live documents.
    pub fn live_count(&self) -> u32 {
        self.deletions.live_count()
    }

    /// Field statistics over live documents.
    pub fn field_stats(&self, field: &str) -> FieldStats {
        self.field_stats.get(field).copied().unwrap_or_default()
    }

    /// Manifest entry describing this reader.
    pub fn entry(&self) -> SegmentEntry {
        SegmentEntry {
            name: self.segment.name().to_string(),
            doc_count: self.segment.max_doc(),
            deleted_count: self.deletions.deleted_count(),
            deletion_generation: self.deletion_generation,
        }
    }
}

fn compute_field_stats(segment: &Segment, deletions: &DeletionSet) -> AHashMap<String, FieldStats> {
    let mut stats: AHashMap<String, FieldStats> = AHashMap::new();
    for doc in 0..segment.max_doc() {
        if deletions.is_deleted(doc) {
            continue;
        }
        let Some(document) = segment.document(doc) else {
            continue;
        };
        for (name, field) in document.fields() {
            if field.indexing.is_analyzed() {
                let length = segment.field_length(name, doc);
                if length > 0 {
                    let entry = stats.entry(name.to_string()).or_default();
                    entry.doc_count += 1;
                    entry.total_length += length as u64;
                }
            }
        }
    }
    stats
}

/// Address of a document within a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocAddress {
    /// Index of the segment in the snapshot.
    pub segment: usize,
    /// Document number within the segment.
    pub doc: u32,
}

/// An immutable view of one commit.
#[derive(Clone, Debug, Default)]
pub struct IndexSnapshot {
    generation: u64,
    segments: Vec<SegmentReader>,
}

impl IndexSnapshot {
    /// A snapshot of `generation` over `segments`.
    pub fn new(generation: u64, segments: Vec<SegmentReader>) -> Self {
        IndexSnapshot {
            generation,
            segments,
        }
    }

    /// A snapshot with no documents.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Commit generation this snapshot reflects.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Segment readers in this snapshot.
    pub fn segments(&self) -> &[SegmentReader] {
        &self.segments
    }

    /// Live documents.
    pub fn num_docs(&self) -> u64 {
        self.segments
            .iter()
            .map(|reader| reader.live_count() as u64)
            .sum()
    }

    /// Stored fields of a live document.
    pub fn document(&self, address: DocAddress) -> Option<&IndexedDocument> {
        let reader = self.segments.get(address.segment)?;
        if !reader.is_live(address.doc) {
            return None;
        }
        reader.segment().document(address.doc)
    }

    /// Number of live documents containing `term`.
    pub fn doc_freq(&self, term: &Term) -> u64 {
        self.segments
            .iter()
            .filter_map(|reader| {
                reader.segment().postings(term).map(|postings| {
                    postings
                        .docs()
                        .iter()
                        .filter(|&&doc| reader.is_live(doc))
                        .count() as u64
                })
            })
            .sum()
    }

    /// Length statistics of `field` over live documents.
    pub fn field_stats(&self, field: &str) -> FieldStats {
        let mut total = FieldStats::default();
        for reader in &self.segments {
            total.merge(&reader.field_stats(field));
        }
        total
    }

    /// Addresses of live documents whose id equals `id`.
    pub fn find_by_id(&self, id: i64) -> Vec<DocAddress> {
        let term = Term::keyword(crate::document::FIELD_ID, id.to_string());
        let mut found = Vec::new();
        for (segment, reader) in self.segments.iter().enumerate() {
            if let Some(postings) = reader.segment().postings(&term) {
                found.extend(
                    postings
                        .docs()
                        .iter()
                        .filter(|&&doc| reader.is_live(doc))
                        .map(|&doc| DocAddress { segment, doc }),
                );
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::standard::StandardAnalyzer;
    use crate::document::{ContentRecord, encode};
    use crate::index::segment::SegmentBuilder;

    fn reader(records: &[ContentRecord], name: &str) -> SegmentReader {
        let mut builder = SegmentBuilder::new(Arc::new(StandardAnalyzer::new()));
        for record in records {
            builder.add_document(encode(record)).unwrap();
        }
        SegmentReader::new(Arc::new(builder.build(name)))
    }

    #[test]
    fn test_deleted_documents_are_invisible() {
        let base = reader(
            &[
                ContentRecord::new("alpha beta", "x").with_id(1),
                ContentRecord::new("alpha", "y").with_id(2),
            ],
            "seg_1",
        );
        let mut deletions = base.deletions().clone();
        deletions.delete(0);
        let with_delete =
            SegmentReader::with_deletions(base.segment_arc().clone(), deletions, Some(2));

        let snapshot = IndexSnapshot::new(2, vec![with_delete]);
        assert_eq!(snapshot.num_docs(), 1);
        assert_eq!(snapshot.doc_freq(&Term::new("title", "alpha")), 1);
        assert_eq!(snapshot.doc_freq(&Term::new("title", "beta")), 0);
        assert!(snapshot.document(DocAddress { segment: 0, doc: 0 }).is_none());
        assert!(snapshot.find_by_id(1).is_empty());
        assert_eq!(
            snapshot.find_by_id(2),
            vec![DocAddress { segment: 0, doc: 1 }]
        );

        let stats = snapshot.field_stats("title");
        assert_eq!(stats.doc_count, 1);
        assert_eq!(stats.total_length, 1);
        assert_eq!(snapshot.segments()[0].entry().deleted_count, 1);
    }

    #[test]
    fn test_stats_span_segments() {
        let snapshot = IndexSnapshot::new(
            3,
            vec![
                reader(&[ContentRecord::new("one two", "b").with_id(1)], "seg_1"),
                reader(&[ContentRecord::new("three four five six", "b").with_id(2)], "seg_2"),
            ],
        );

        let stats = snapshot.field_stats("title");
        assert_eq!(stats.doc_count, 2);
        assert_eq!(stats.total_length, 6);
        assert!((stats.average_length() - 3.0).abs() < f32::EPSILON);
        assert_eq!(snapshot.field_stats("tags").average_length(), 1.0);
        assert_eq!(IndexSnapshot::empty().num_docs(), 0);
    }
}
