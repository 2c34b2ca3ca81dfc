//! The single writer session.
//!
//! [`IndexWriter`] owns the write lock, the write log and the committed
//! segment set. Mutations are logged, buffered, and become durable on
//! [`commit`](IndexWriter::commit), which writes new segment and deletion
//! files and then atomically swaps the manifest.

use std::sync::Arc;

use ahash::AHashSet;
use log::{debug, info, warn};

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::standard::StandardAnalyzer;
use crate::document::FIELD_ID;
use crate::document::field::IndexedDocument;
use crate::error::{GlaiveError, Result};
use crate::index::manifest::Manifest;
use crate::index::merge::MergePolicy;
use crate::index::reader::SegmentReader;
use crate::index::segment::SegmentBuilder;
use crate::index::term::Term;
use crate::index::wal::{LogEntry, WriteLog};
use crate::index::{WRITE_LOCK_FILE, WRITE_LOG_FILE, deletion_file_name, is_index_data_file};
use crate::storage::{Storage, StorageLock};

/// Index writer configuration.
#[derive(Clone)]
pub struct IndexWriterConfig {
    /// Analyzer for text fields.
    pub analyzer: Arc<dyn Analyzer>,

    /// Whether to take the exclusive write lock.
    pub use_locking: bool,

    /// When to merge segments.
    pub merge_policy: MergePolicy,
}

impl std::fmt::Debug for IndexWriterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexWriterConfig")
            .field("analyzer", &self.analyzer.name())
            .field("use_locking", &self.use_locking)
            .field("merge_policy", &self.merge_policy)
            .finish()
    }
}

impl Default for IndexWriterConfig {
    fn default() -> Self {
        IndexWriterConfig {
            analyzer: Arc::new(StandardAnalyzer::new()),
            use_locking: true,
            merge_policy: MergePolicy::default(),
        }
    }
}

/// Counters kept by the writer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Upserts accepted.
    pub upserts: u64,
    /// Deletes accepted.
    pub deletes: u64,
    /// Successful commits that changed the index.
    pub commits: u64,
    /// Merges performed.
    pub merges: u64,
    /// Operations replayed from the write log on open.
    pub recovered: u64,
}

struct PreparedCommit {
    manifest: Manifest,
    segments: Vec<SegmentReader>,
    merged: bool,
}

/// The single writer of an index directory.
pub struct IndexWriter {
    storage: Arc<dyn Storage>,
    config: IndexWriterConfig,
    lock: Option<Box<dyn StorageLock>>,
    log: WriteLog,
    manifest: Manifest,
    segments: Vec<SegmentReader>,
    pending_docs: Vec<IndexedDocument>,
    pending_deletes: AHashSet<i64>,
    stats: WriterStats,
    closed: bool,
}

impl std::fmt::Debug for IndexWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexWriter")
            .field("config", &self.config)
            .field("generation", &self.manifest.generation)
            .field("segments", &self.segments.len())
            .field("pending_docs", &self.pending_docs.len())
            .field("pending_deletes", &self.pending_deletes.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl IndexWriter {
    /// Open the writer, creating the index if the directory is empty.
    ///
    /// Takes the write lock, loads the committed segments, and replays any
    /// logged operations the last commit did not cover.
    pub fn open(storage: Arc<dyn Storage>, config: IndexWriterConfig) -> Result<Self> {
        let lock = if config.use_locking {
            let lock = storage.obtain_lock(WRITE_LOCK_FILE).map_err(|e| {
                GlaiveError::index(format!("Index is locked by another writer: {e}"))
            })?;
            Some(lock)
        } else {
            None
        };

        let existing = Manifest::load(storage.as_ref())?;
        let fresh = existing.is_none();
        let manifest = existing.unwrap_or_default();

        let mut segments = Vec::with_capacity(manifest.segments.len());
        for entry in &manifest.segments {
            segments.push(SegmentReader::open(storage.as_ref(), entry)?);
        }

        let log = WriteLog::new(storage.clone(), WRITE_LOG_FILE);
        let contents = log.read_all()?;
        if log.last_seq() < manifest.log_seq {
            log.set_next_seq(manifest.log_seq + 1);
        }

        let mut writer = IndexWriter {
            storage,
            config,
            lock,
            log,
            manifest,
            segments,
            pending_docs: Vec::new(),
            pending_deletes: AHashSet::new(),
            stats: WriterStats::default(),
            closed: false,
        };

        if fresh {
            writer.manifest.store(writer.storage.as_ref())?;
            info!("Created new index");
        }
        writer.remove_unreferenced_files();

        let mut replayed = 0u64;
        for record in &contents.records {
            if record.seq <= writer.manifest.log_seq {
                continue;
            }
            match &record.entry {
                LogEntry::Upsert { document } => writer.buffer_upsert(document.clone()),
                LogEntry::Delete { id } => writer.buffer_delete(*id),
            }
            replayed += 1;
        }

        if replayed > 0 {
            info!("Replaying {replayed} operations from the write log");
            writer.commit()?;
            writer.stats.recovered = replayed;
        } else if contents.torn_tail || !contents.records.is_empty() {
            writer.log.truncate()?;
        }

        info!(
            "Opened index writer at generation {} ({} segments, {} live documents)",
            writer.manifest.generation,
            writer.segments.len(),
            writer.manifest.live_doc_count()
        );
        Ok(writer)
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(GlaiveError::index("Index writer is closed"))
        } else {
            Ok(())
        }
    }

    /// Insert `doc`, first replacing any document with the same id.
    ///
    /// A document without id is inserted unconditionally.
    pub fn upsert(&mut self, doc: IndexedDocument) -> Result<()> {
        self.check_open()?;
        self.log.append(&LogEntry::Upsert {
            document: doc.clone(),
        })?;
        self.buffer_upsert(doc);
        self.stats.upserts += 1;
        Ok(())
    }

    /// Delete every document with `id`. Deleting an absent id is a no-op.
    pub fn delete(&mut self, id: i64) -> Result<()> {
        self.check_open()?;
        self.log.append(&LogEntry::Delete { id })?;
        self.buffer_delete(id);
        self.stats.deletes += 1;
        Ok(())
    }

    fn buffer_upsert(&mut self, doc: IndexedDocument) {
        if let Some(id) = doc.id() {
            self.buffer_delete(id);
        }
        self.pending_docs.push(doc);
    }

    fn buffer_delete(&mut self, id: i64) {
        self.pending_docs.retain(|doc| doc.id() != Some(id));
        self.pending_deletes.insert(id);
    }

    /// Whether mutations are waiting for a commit.
    pub fn has_pending_changes(&self) -> bool {
        !self.pending_docs.is_empty() || !self.pending_deletes.is_empty()
    }

    /// Make buffered mutations durable. Returns the committed generation.
    ///
    /// Either the whole batch becomes the new commit or, on error, nothing
    /// changes and the batch stays buffered.
    pub fn commit(&mut self) -> Result<u64> {
        self.check_open()?;
        if !self.has_pending_changes() {
            return Ok(self.manifest.generation);
        }

        let generation = self.manifest.generation + 1;
        let prepared = self
            .prepare_commit(generation)
            .and_then(|prepared| {
                prepared.manifest.store(self.storage.as_ref())?;
                Ok(prepared)
            })
            .inspect_err(|e| {
                warn!("Commit of generation {generation} failed: {e}");
                self.remove_unreferenced_files();
            })?;

        self.manifest = prepared.manifest;
        self.segments = prepared.segments;
        self.pending_docs.clear();
        self.pending_deletes.clear();
        self.stats.commits += 1;
        if prepared.merged {
            self.stats.merges += 1;
        }

        if let Err(e) = self.log.truncate() {
            warn!("Failed to truncate write log after commit {generation}: {e}");
        }
        self.remove_unreferenced_files();

        debug!(
            "Committed generation {generation}: {} segments, {} live documents",
            self.segments.len(),
            self.manifest.live_doc_count()
        );
        Ok(generation)
    }

    fn prepare_commit(&self, generation: u64) -> Result<PreparedCommit> {
        let storage = self.storage.as_ref();
        let mut next_segment = self.manifest.next_segment;
        let mut segments = Vec::with_capacity(self.segments.len() + 1);

        let id_terms: Vec<Term> = self
            .pending_deletes
            .iter()
            .map(|id| Term::keyword(FIELD_ID, id.to_string()))
            .collect();

        for reader in &self.segments {
            let mut deletions = reader.deletions().clone();
            let mut changed = false;
            for term in &id_terms {
                if let Some(postings) = reader.segment().postings(term) {
                    for &doc in postings.docs() {
                        changed |= deletions.delete(doc);
                    }
                }
            }

            if !changed {
                segments.push(reader.clone());
            } else if deletions.live_count() == 0 {
                debug!("Dropping fully deleted segment {}", reader.segment().name());
            } else {
                let file = deletion_file_name(reader.segment().name(), generation);
                deletions.write(storage, &file)?;
                segments.push(SegmentReader::with_deletions(
                    reader.segment_arc().clone(),
                    deletions,
                    Some(generation),
                ));
            }
        }

        if !self.pending_docs.is_empty() {
            let mut builder = SegmentBuilder::new(self.config.analyzer.clone());
            for doc in &self.pending_docs {
                builder.add_document(doc.clone())?;
            }
            let segment = builder.build(format!("seg_{next_segment}"));
            next_segment += 1;
            segment.write(storage)?;
            segments.push(SegmentReader::new(Arc::new(segment)));
        }

        let entries: Vec<_> = segments.iter().map(SegmentReader::entry).collect();
        let mut merged = false;
        if let Some(indices) = self.config.merge_policy.find_merge(&entries) {
            let mut builder = SegmentBuilder::new(self.config.analyzer.clone());
            for &i in &indices {
                let reader = &segments[i];
                for doc in 0..reader.segment().max_doc() {
                    if let Some(document) = reader
                        .is_live(doc)
                        .then(|| reader.segment().document(doc))
                        .flatten()
                    {
                        builder.add_document(document.clone())?;
                    }
                }
            }
            for &i in indices.iter().rev() {
                segments.remove(i);
            }

            if !builder.is_empty() {
                let segment = builder.build(format!("seg_{next_segment}"));
                next_segment += 1;
                segment.write(storage)?;
                debug!(
                    "Merged {} segments into {} ({} documents)",
                    indices.len(),
                    segment.name(),
                    segment.max_doc()
                );
                segments.push(SegmentReader::new(Arc::new(segment)));
            }
            merged = true;
        }

        let manifest = Manifest {
            generation,
            next_segment,
            log_seq: self.log.last_seq(),
            segments: segments.iter().map(SegmentReader::entry).collect(),
            committed_at: Some(chrono::Local::now().naive_local()),
            ..Manifest::default()
        };

        Ok(PreparedCommit {
            manifest,
            segments,
            merged,
        })
    }

    /// Discard buffered mutations and clear them from the write log.
    pub fn rollback(&mut self) -> Result<()> {
        self.check_open()?;
        let discarded = self.pending_docs.len() + self.pending_deletes.len();
        self.pending_docs.clear();
        self.pending_deletes.clear();
        self.log.truncate()?;
        if discarded > 0 {
            info!("Rolled back {discarded} buffered operations");
        }
        Ok(())
    }

    /// Delete data files the current manifest does not reference.
    fn remove_unreferenced_files(&self) {
        let referenced = self.manifest.referenced_files();
        let files = match self.storage.list_files() {
            Ok(files) => files,
            Err(e) => {
                warn!("Could not list index files: {e}");
                return;
            }
        };

        for file in files {
            if !is_index_data_file(&file) || referenced.contains(&file) {
                continue;
            }
            match self.storage.delete_file(&file) {
                Ok(()) => debug!("Removed unreferenced file {file}"),
                Err(e) => warn!("Could not remove {file}: {e}"),
            }
        }
    }

    /// Close the writer and release the write lock. Closing twice is a no-op.
    ///
    /// Uncommitted operations stay in the write log and are replayed by the
    /// next writer.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if self.has_pending_changes() {
            warn!(
                "Closing writer with {} uncommitted operations; they remain in the write log",
                self.pending_docs.len() + self.pending_deletes.len()
            );
        }

        let log_result = self.log.close();
        let lock_result = match self.lock.take() {
            Some(mut lock) => lock.release(),
            None => Ok(()),
        };
        debug!("Closed index writer at generation {}", self.manifest.generation);

        log_result.and(lock_result)
    }

    /// Whether the writer is closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Generation of the last commit.
    pub fn generation(&self) -> u64 {
        self.manifest.generation
    }

    /// The last committed manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Number of committed segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Live documents as of the last commit.
    pub fn live_doc_count(&self) -> u64 {
        self.manifest.live_doc_count()
    }

    /// Writer counters.
    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close index writer: {e}");
        }
    }
}
