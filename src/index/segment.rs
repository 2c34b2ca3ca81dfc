//! Immutable segments: postings, field lengths and stored documents.
//!
//! A segment is built in memory by [`SegmentBuilder`], written once, and never
//! modified afterwards. Deletions live beside it in a
//! [`DeletionSet`](crate::index::deletion::DeletionSet).

use std::collections::BTreeMap;
use std::sync::Arc;

use ahash::AHashMap;
use log::debug;

use crate::analysis::analyzer::Analyzer;
use crate::document::field::{IndexedDocument, Indexing};
use crate::document::keyword_field;
use crate::error::{GlaiveError, Result};
use crate::index::segment_file_name;
use crate::index::term::Term;
use crate::storage::{Storage, StructReader, StructWriter};

const SEGMENT_MAGIC: u32 = 0x4753_4547; // "GSEG"
const SEGMENT_VERSION: u32 = 1;

/// Documents containing a term, ascending, with per-document frequencies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostingList {
    docs: Vec<u32>,
    freqs: Vec<u32>,
}

impl PostingList {
    fn push(&mut self, doc: u32, freq: u32) {
        self.docs.push(doc);
        self.freqs.push(freq);
    }

    /// Number of documents in the list, deleted ones included.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Document numbers in ascending order.
    pub fn docs(&self) -> &[u32] {
        &self.docs
    }

    /// Iterate `(doc, term frequency)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.docs.iter().copied().zip(self.freqs.iter().copied())
    }
}

/// An immutable, fully loaded segment.
#[derive(Debug)]
pub struct Segment {
    name: String,
    documents: Vec<IndexedDocument>,
    postings: BTreeMap<Term, PostingList>,
    field_lengths: AHashMap<String, Vec<u32>>,
}

impl Segment {
    /// Segment name, e.g. `seg_3`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of documents, deleted ones included.
    pub fn max_doc(&self) -> u32 {
        self.documents.len() as u32
    }

    /// Stored fields of document `doc`.
    pub fn document(&self, doc: u32) -> Option<&IndexedDocument> {
        self.documents.get(doc as usize)
    }

    /// Postings for `term`, if any document contains it.
    pub fn postings(&self, term: &Term) -> Option<&PostingList> {
        self.postings.get(term)
    }

    /// Number of terms produced for `field` in document `doc`.
    pub fn field_length(&self, field: &str, doc: u32) -> u32 {
        self.field_lengths
            .get(field)
            .and_then(|lengths| lengths.get(doc as usize))
            .copied()
            .unwrap_or(0)
    }

    /// Number of distinct terms.
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    /// Write the segment to `<name>.seg`. Returns the file name.
    pub fn write(&self, storage: &dyn Storage) -> Result<String> {
        let file_name = segment_file_name(&self.name);
        let output = storage.create_output(&file_name)?;
        let mut writer = StructWriter::new(output);

        writer.write_u32(SEGMENT_MAGIC)?;
        writer.write_u32(SEGMENT_VERSION)?;
        writer.write_string(&self.name)?;

        writer.write_varint(self.documents.len() as u64)?;
        for doc in &self.documents {
            writer.write_varint(doc.len() as u64)?;
            for (name, field) in doc.fields() {
                writer.write_string(name)?;
                writer.write_u8(field.indexing.to_u8())?;
                writer.write_string(&field.value)?;
            }
        }

        let mut length_fields: Vec<(&String, &Vec<u32>)> = self.field_lengths.iter().collect();
        length_fields.sort_by(|a, b| a.0.cmp(b.0));
        writer.write_varint(length_fields.len() as u64)?;
        for (field, lengths) in length_fields {
            writer.write_string(field)?;
            for &length in lengths {
                writer.write_varint(length as u64)?;
            }
        }

        writer.write_varint(self.postings.len() as u64)?;
        for (term, postings) in &self.postings {
            writer.write_string(term.field())?;
            writer.write_string(term.text())?;
            writer.write_delta_compressed_u32s(&postings.docs)?;
            for &freq in &postings.freqs {
                writer.write_varint(freq as u64)?;
            }
        }

        writer.close()?;
        debug!(
            "Wrote segment {} ({} docs, {} terms)",
            self.name,
            self.documents.len(),
            self.postings.len()
        );
        Ok(file_name)
    }

    /// Load segment `name` and verify its checksum.
    pub fn read(storage: &dyn Storage, name: &str) -> Result<Self> {
        let file_name = segment_file_name(name);
        let input = storage.open_input(&file_name)?;
        let mut reader = StructReader::new(input)?;

        let magic = reader.read_u32()?;
        if magic != SEGMENT_MAGIC {
            return Err(GlaiveError::index(format!("{file_name} is not a segment file")));
        }
        let version = reader.read_u32()?;
        if version != SEGMENT_VERSION {
            return Err(GlaiveError::index(format!(
                "Unsupported segment version {version} in {file_name}"
            )));
        }
        let stored_name = reader.read_string()?;
        if stored_name != name {
            return Err(GlaiveError::index(format!(
                "{file_name} holds segment {stored_name}"
            )));
        }

        let doc_count = reader.read_len()?;
        let mut documents = Vec::with_capacity(doc_count);
        for _ in 0..doc_count {
            let field_count = reader.read_len()?;
            let mut doc = IndexedDocument::new();
            for _ in 0..field_count {
                let field_name = reader.read_string()?;
                let indexing = Indexing::from_u8(reader.read_u8()?)?;
                let value = reader.read_string()?;
                doc.add_field(field_name, value, indexing);
            }
            documents.push(doc);
        }

        let length_field_count = reader.read_len()?;
        let mut field_lengths = AHashMap::with_capacity(length_field_count);
        for _ in 0..length_field_count {
            let field = reader.read_string()?;
            let mut lengths = Vec::with_capacity(doc_count);
            for _ in 0..doc_count {
                lengths.push(reader.read_varint()? as u32);
            }
            field_lengths.insert(field, lengths);
        }

        let term_count = reader.read_len()?;
        let mut postings = BTreeMap::new();
        for _ in 0..term_count {
            let field = reader.read_string()?;
            let text = reader.read_string()?;
            let docs = reader.read_delta_compressed_u32s()?;
            let mut freqs = Vec::with_capacity(docs.len());
            for &doc in &docs {
                if doc as usize >= doc_count {
                    return Err(GlaiveError::index(format!(
                        "Posting for doc {doc} out of range in {file_name}"
                    )));
                }
                freqs.push(reader.read_varint()? as u32);
            }
            postings.insert(Term::new(field, text), PostingList { docs, freqs });
        }

        reader.verify_checksum().map_err(|e| {
            GlaiveError::index(format!("Segment {file_name} is corrupt: {e}"))
        })?;

        Ok(Segment {
            name: name.to_string(),
            documents,
            postings,
            field_lengths,
        })
    }
}

/// Accumulates documents into a new in-memory segment.
pub struct SegmentBuilder {
    analyzer: Arc<dyn Analyzer>,
    documents: Vec<IndexedDocument>,
    postings: BTreeMap<Term, PostingList>,
    field_lengths: AHashMap<String, Vec<u32>>,
}

impl SegmentBuilder {
    /// Create a builder analyzing text fields with `analyzer`.
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        SegmentBuilder {
            analyzer,
            documents: Vec::new(),
            postings: BTreeMap::new(),
            field_lengths: AHashMap::new(),
        }
    }

    /// Number of documents added so far.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether no document has been added.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Analyze and add a document, returning its number within the segment.
    pub fn add_document(&mut self, doc: IndexedDocument) -> Result<u32> {
        let doc_id = self.documents.len() as u32;
        let mut freqs: BTreeMap<Term, u32> = BTreeMap::new();
        let mut lengths: Vec<(String, u32)> = Vec::new();

        for (name, field) in doc.fields() {
            if field.indexing.is_analyzed() {
                let mut length = 0u32;
                for token in self.analyzer.analyze(&field.value)? {
                    *freqs.entry(Term::new(name, token.text)).or_insert(0) += 1;
                    length += 1;
                }
                lengths.push((name.to_string(), length));
            }

            if field.indexing.is_keyword() && !field.value.is_empty() {
                freqs.insert(Term::keyword(name, field.value.as_str()), 1);
                lengths.push((keyword_field(name), 1));
            }
        }

        for (term, freq) in freqs {
            self.postings.entry(term).or_default().push(doc_id, freq);
        }
        for (field, length) in lengths {
            let column = self.field_lengths.entry(field).or_default();
            column.resize(doc_id as usize, 0);
            column.push(length);
        }

        self.documents.push(doc);
        Ok(doc_id)
    }

    /// Finish the segment under `name`.
    pub fn build<S: Into<String>>(mut self, name: S) -> Segment {
        let doc_count = self.documents.len();
        for column in self.field_lengths.values_mut() {
            column.resize(doc_count, 0);
        }

        Segment {
            name: name.into(),
            documents: self.documents,
            postings: self.postings,
            field_lengths: self.field_lengths,
        }
    }
}
