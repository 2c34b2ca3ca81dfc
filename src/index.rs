//! The on-disk inverted index.
//!
//! An index directory holds immutable segment files, per-segment deletion
//! files, a JSON manifest naming the committed set, and a write log:
//!
//! ```text
//! seg_<n>.seg           postings, field lengths and stored fields
//! seg_<n>_<gen>.del     deleted-document bitmap written at generation <gen>
//! manifest.json         the commit point, replaced atomically via manifest.json.tmp
//! write.log             operations appended since the last commit
//! write.lock            held by the single writer
//! ```
//!
//! [`writer::IndexWriter`] is the only component that mutates the directory.
//! [`manager::ReaderManager`] publishes immutable [`reader::IndexSnapshot`]s.

pub mod deletion;
pub mod manager;
pub mod manifest;
pub mod merge;
pub mod reader;
pub mod segment;
pub mod term;
pub mod wal;
pub mod writer;

/// Name of the manifest file.
pub const MANIFEST_FILE: &str = "manifest.json";
/// Name of the write log.
pub const WRITE_LOG_FILE: &str = "write.log";
/// Name of the writer lock.
pub const WRITE_LOCK_FILE: &str = "write.lock";

/// File holding segment `name`.
pub fn segment_file_name(name: &str) -> String {
    format!("{name}.seg")
}

/// File holding the deletions of segment `name` as of `generation`.
pub fn deletion_file_name(name: &str, generation: u64) -> String {
    format!("{name}_{generation}.del")
}

/// Whether `file` is an index data file this crate manages.
pub(crate) fn is_index_data_file(file: &str) -> bool {
    file.ends_with(".seg") || file.ends_with(".del") || file.ends_with(".tmp")
}
