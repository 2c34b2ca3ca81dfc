//! The manifest: the single commit point of the index.
//!
//! A commit is durable once `manifest.json` names it. The file is written to
//! `manifest.json.tmp`, synced, then renamed over the old one, so readers see
//! either the previous or the new commit and never a mix.

use std::collections::HashSet;
use std::io::{Read, Write};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{GlaiveError, Result};
use crate::index::{MANIFEST_FILE, deletion_file_name, segment_file_name};
use crate::storage::Storage;

const MANIFEST_VERSION: u32 = 1;

/// One committed segment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentEntry {
    /// Segment name.
    pub name: String,
    /// Documents in the segment, deleted ones included.
    pub doc_count: u32,
    /// Deleted documents.
    pub deleted_count: u32,
    /// Generation of the deletion file, if any document is deleted.
    pub deletion_generation: Option<u64>,
}

impl SegmentEntry {
    /// File holding the segment.
    pub fn segment_file(&self) -> String {
        segment_file_name(&self.name)
    }

    /// File holding the deletions, if any.
    pub fn deletion_file(&self) -> Option<String> {
        self.deletion_generation
            .map(|generation| deletion_file_name(&self.name, generation))
    }

    /// Live documents.
    pub fn live_count(&self) -> u32 {
        self.doc_count - self.deleted_count
    }
}

/// The committed state of the index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Format version.
    pub version: u32,
    /// Incremented by every commit.
    pub generation: u64,
    /// Counter used to name the next segment.
    pub next_segment: u64,
    /// Highest write-log sequence number covered by this commit.
    pub log_seq: u64,
    /// Committed segments.
    pub segments: Vec<SegmentEntry>,
    /// Local time the commit was written.
    #[serde(default)]
    pub committed_at: Option<NaiveDateTime>,
}

impl Default for Manifest {
    fn default() -> Self {
        Manifest {
            version: MANIFEST_VERSION,
            generation: 0,
            next_segment: 1,
            log_seq: 0,
            segments: Vec::new(),
            committed_at: None,
        }
    }
}

impl Manifest {
    /// Load the current manifest, or `None` for a fresh directory.
    pub fn load(storage: &dyn Storage) -> Result<Option<Self>> {
        if !storage.file_exists(MANIFEST_FILE) {
            return Ok(None);
        }

        let mut input = storage.open_input(MANIFEST_FILE)?;
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;

        let manifest: Manifest = serde_json::from_slice(&bytes)
            .map_err(|e| GlaiveError::index(format!("Corrupt manifest: {e}")))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(GlaiveError::index(format!(
                "Unsupported manifest version {}",
                manifest.version
            )));
        }
        Ok(Some(manifest))
    }

    /// Atomically replace the stored manifest with this one.
    pub fn store(&self, storage: &dyn Storage) -> Result<()> {
        let tmp = format!("{MANIFEST_FILE}.tmp");
        let bytes = serde_json::to_vec_pretty(self)?;

        let mut output = storage.create_output(&tmp)?;
        output.write_all(&bytes)?;
        output.flush_and_sync()?;
        output.close()?;
        drop(output);

        storage.rename_file(&tmp, MANIFEST_FILE)
    }

    /// Live documents across all segments.
    pub fn live_doc_count(&self) -> u64 {
        self.segments
            .iter()
            .map(|entry| entry.live_count() as u64)
            .sum()
    }

    /// Every data file this commit needs.
    pub fn referenced_files(&self) -> HashSet<String> {
        let mut files = HashSet::new();
        for entry in &self.segments {
            files.insert(entry.segment_file());
            if let Some(deletions) = entry.deletion_file() {
                files.insert(deletions);
            }
        }
        files
    }
}
