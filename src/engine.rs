//! The content index engine.
//!
//! [`ContentIndex`] is constructed once and shared by reference or `Arc`. It
//! owns the storage handle, the single [`IndexWriter`] and the
//! [`ReaderManager`]. Every mutation is committed and published before the
//! call returns, so a search issued afterwards sees it.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use glaive::config::EngineConfig;
//! use glaive::document::ContentRecord;
//! use glaive::engine::ContentIndex;
//! use glaive::storage::MemoryStorage;
//!
//! let index = ContentIndex::with_storage(
//!     Arc::new(MemoryStorage::new_default()),
//!     EngineConfig::default(),
//! )
//! .unwrap();
//!
//! index
//!     .index_content(&ContentRecord::new("Quarterly report", "Revenue grew").with_id(1))
//!     .unwrap();
//! let hits = index.search(Some("report"), None, None, 10).unwrap();
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].highlighted_title.as_deref(), Some("Quarterly <mark>report</mark>"));
//!
//! index.close().unwrap();
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::standard::StandardAnalyzer;
use crate::config::EngineConfig;
use crate::document::codec::to_record;
use crate::document::{ContentRecord, FIELD_BODY, FIELD_TITLE, SearchHit, decode, encode};
use crate::error::{GlaiveError, Result};
use crate::index::manager::ReaderManager;
use crate::index::writer::{IndexWriter, IndexWriterConfig};
use crate::search::builder::{QueryBuilder, QueryRequest};
use crate::search::highlight::Highlighter;
use crate::search::searcher::Searcher;
use crate::storage::{FileStorage, Storage};
use crate::store::ContentSource;

/// Point-in-time figures about the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Live documents in the published snapshot.
    pub live_docs: u64,
    /// Segments in the published snapshot.
    pub segments: usize,
    /// Commit generation of the published snapshot.
    pub generation: u64,
    /// Snapshots acquired and not yet released.
    pub outstanding_snapshots: usize,
}

/// The search index engine.
pub struct ContentIndex {
    config: EngineConfig,
    storage: Option<Arc<dyn Storage>>,
    writer: Mutex<Option<IndexWriter>>,
    readers: Option<ReaderManager>,
    builder: QueryBuilder,
    highlighter: Highlighter,
    closed: AtomicBool,
}

impl std::fmt::Debug for ContentIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentIndex")
            .field("index_path", &self.config.index_path)
            .field("readers", &self.readers)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl ContentIndex {
    /// Open or create the index directory named by `config`.
    pub fn open(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let storage = FileStorage::new(&config.index_path, config.storage.clone())?;
        info!("Opening content index at {}", config.index_path.display());
        Self::with_storage(Arc::new(storage), config)
    }

    /// Open the index held by `storage`.
    pub fn with_storage(storage: Arc<dyn Storage>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let analyzer: Arc<dyn Analyzer> = Arc::new(StandardAnalyzer::new());
        let highlighter = Highlighter::new(analyzer.clone())
            .with_fragment_size(config.fragment_size)
            .with_tags(
                config.highlight_pre_tag.clone(),
                config.highlight_post_tag.clone(),
            );
        let writer_config = IndexWriterConfig {
            analyzer: analyzer.clone(),
            use_locking: config.storage.use_locking,
            merge_policy: config.merge.clone(),
        };

        // Filled in step by step; dropping a partial engine closes what exists.
        let mut index = ContentIndex {
            config,
            storage: Some(storage.clone()),
            writer: Mutex::new(None),
            readers: None,
            builder: QueryBuilder::new(analyzer),
            highlighter,
            closed: AtomicBool::new(false),
        };
        *index.writer.get_mut() = Some(IndexWriter::open(storage.clone(), writer_config)?);
        index.readers = Some(ReaderManager::open(storage)?);

        let stats = index.stats()?;
        info!(
            "Content index ready: {} documents in {} segments (generation {})",
            stats.live_docs, stats.segments, stats.generation
        );
        Ok(index)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(GlaiveError::index("Content index is closed"))
        } else {
            Ok(())
        }
    }

    fn readers(&self) -> Result<&ReaderManager> {
        self.check_open()?;
        self.readers
            .as_ref()
            .ok_or_else(|| GlaiveError::index("Reader manager is not initialized"))
    }

    /// Run `f` against the writer, commit, and publish the result.
    ///
    /// If `f` or the commit fails the buffered batch is rolled back so the
    /// failure is reported exactly once.
    fn write<F>(&self, f: F) -> Result<u64>
    where
        F: FnOnce(&mut IndexWriter) -> Result<()>,
    {
        self.check_open()?;
        let generation = {
            let mut guard = self.writer.lock();
            let writer = guard
                .as_mut()
                .ok_or_else(|| GlaiveError::index("Index writer is not initialized"))?;

            match f(writer).and_then(|()| writer.commit()) {
                Ok(generation) => generation,
                Err(e) => {
                    if let Err(rollback) = writer.rollback() {
                        warn!("Rollback after failed write also failed: {rollback}");
                    }
                    return Err(e);
                }
            }
        };
        self.readers()?.refresh()?;
        Ok(generation)
    }

    /// Index `record`, replacing any indexed record with the same id.
    pub fn index_content(&self, record: &ContentRecord) -> Result<()> {
        let doc = encode(record);
        let generation = self.write(|writer| writer.upsert(doc))?;
        debug!("Indexed content {:?} at generation {generation}", record.id);
        Ok(())
    }

    /// Remove the record with `id` from the index. Absent ids are ignored.
    pub fn delete_content(&self, id: i64) -> Result<()> {
        let generation = self.write(|writer| writer.delete(id))?;
        debug!("Deleted content {id} at generation {generation}");
        Ok(())
    }

    /// Search with optional free text and exact category and author filters.
    pub fn search(
        &self,
        query: Option<&str>,
        category: Option<&str>,
        author: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<SearchHit>> {
        let request = QueryRequest {
            query: query.map(str::to_string),
            category: category.map(str::to_string),
            author: author.map(str::to_string),
            limit: max_results,
        };
        self.search_request(&request)
    }

    /// Run a search request. An empty request returns no hits.
    pub fn search_request(&self, request: &QueryRequest) -> Result<Vec<SearchHit>> {
        self.check_open()?;
        if request.limit == 0 {
            return Err(GlaiveError::validation("max results must be positive"));
        }
        let Some(query) = self.builder.build(request)? else {
            debug!("Empty search request, returning no hits");
            return Ok(Vec::new());
        };

        let readers = self.readers()?;
        readers.refresh()?;
        let snapshot = readers.acquire()?;

        let top = Searcher::with_bm25(&snapshot, self.config.bm25).search(&query, request.limit)?;
        let title_terms = query.field_terms(FIELD_TITLE);
        let body_terms = query.field_terms(FIELD_BODY);

        let mut hits = Vec::with_capacity(top.docs.len());
        for scored in &top.docs {
            let Some(doc) = snapshot.document(scored.address) else {
                continue;
            };
            let mut hit = decode(doc, scored.score);
            hit.highlighted_title = Some(self.highlighter.highlight_title(&hit.title, &title_terms));
            hit.highlighted_body = Some(self.highlighter.highlight_body(&hit.body, &body_terms));
            hits.push(hit);
        }
        readers.release(snapshot);

        debug!(
            "Search {:?} returned {} of {} hits",
            request.query,
            hits.len(),
            top.total_hits
        );
        Ok(hits)
    }

    /// The indexed copy of the record with `id`, if any.
    pub fn get_indexed(&self, id: i64) -> Result<Option<ContentRecord>> {
        let readers = self.readers()?;
        readers.refresh()?;
        let snapshot = readers.acquire()?;
        let record = snapshot
            .find_by_id(id)
            .first()
            .and_then(|&address| snapshot.document(address))
            .map(to_record);
        Ok(record)
    }

    /// Re-upsert every record of `source` in one commit. Returns the number
    /// of records indexed.
    ///
    /// Stops at the first record that fails; records before it are committed.
    pub fn reindex_all(&self, source: &dyn ContentSource) -> Result<usize> {
        let records = source.records()?;
        let total = records.len();
        info!("Reindexing {total} records");

        let mut indexed = 0;
        let mut failure = None;
        self.write(|writer| {
            for record in &records {
                if let Err(e) = writer.upsert(encode(record)) {
                    warn!("Reindex stopped at record {:?}: {e}", record.id);
                    failure = Some(e);
                    break;
                }
                indexed += 1;
            }
            Ok(())
        })?;

        if let Some(e) = failure {
            return Err(e);
        }
        info!("Reindexed {indexed} records");
        Ok(indexed)
    }

    /// Publish the latest commit. Returns whether anything changed.
    pub fn refresh(&self) -> Result<bool> {
        self.readers()?.refresh()
    }

    /// Figures about the published snapshot.
    pub fn stats(&self) -> Result<IndexStats> {
        let readers = self.readers()?;
        let snapshot = readers.acquire()?;
        let stats = IndexStats {
            live_docs: snapshot.num_docs(),
            segments: snapshot.segments().len(),
            generation: snapshot.generation(),
            outstanding_snapshots: readers.outstanding() - 1,
        };
        readers.release(snapshot);
        Ok(stats)
    }

    /// The reader manager, for callers that evaluate queries themselves.
    pub fn reader_manager(&self) -> Result<&ReaderManager> {
        self.readers()
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Release the writer, then the readers, then storage. Closing twice is
    /// a no-op.
    ///
    /// Every handle is released even if an earlier one fails; the first
    /// error is returned.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut first_error = None;
        let mut record = |what: &str, result: Result<()>| {
            if let Err(e) = result {
                warn!("Failed to close {what}: {e}");
                first_error.get_or_insert(e);
            }
        };

        if let Some(mut writer) = self.writer.lock().take() {
            record("index writer", writer.close());
        }
        if let Some(readers) = &self.readers {
            record("reader manager", readers.close());
        }
        if let Some(storage) = &self.storage {
            record("storage", storage.close());
        }
        info!("Closed content index at {}", self.config.index_path.display());

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for ContentIndex {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Error while dropping content index: {e}");
        }
    }
}
