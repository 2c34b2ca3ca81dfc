//! Reader pool and refresh.
//!
//! [`ReaderManager`] holds the currently published [`IndexSnapshot`]. Searches
//! acquire it, use it, and release it; [`refresh`](ReaderManager::refresh)
//! loads the latest commit and publishes a new snapshot without disturbing
//! snapshots already handed out.

use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use ahash::AHashMap;
use arc_swap::ArcSwap;
use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::error::{GlaiveError, Result};
use crate::index::deletion::DeletionSet;
use crate::index::manifest::{Manifest, SegmentEntry};
use crate::index::reader::{IndexSnapshot, SegmentReader};
use crate::storage::Storage;

/// Attempts made when segment files vanish underneath a refresh.
const REFRESH_ATTEMPTS: usize = 3;

type ReaderKey = (String, Option<u64>);

/// Publishes snapshots of the latest commit.
pub struct ReaderManager {
    storage: Arc<dyn Storage>,
    current: ArcSwap<IndexSnapshot>,
    readers: Mutex<AHashMap<ReaderKey, SegmentReader>>,
    refresh_lock: Mutex<()>,
    outstanding: Arc<AtomicUsize>,
    closed: AtomicBool,
}

impl std::fmt::Debug for ReaderManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderManager")
            .field("generation", &self.generation())
            .field("outstanding", &self.outstanding())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl ReaderManager {
    /// Open over `storage` and publish the current commit.
    pub fn open(storage: Arc<dyn Storage>) -> Result<Self> {
        let manager = ReaderManager {
            storage,
            current: ArcSwap::from_pointee(IndexSnapshot::empty()),
            readers: Mutex::new(AHashMap::new()),
            refresh_lock: Mutex::new(()),
            outstanding: Arc::new(AtomicUsize::new(0)),
            closed: AtomicBool::new(false),
        };
        manager.refresh()?;
        Ok(manager)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(GlaiveError::index("Reader manager is closed"))
        } else {
            Ok(())
        }
    }

    /// Publish the latest commit if it is newer than the current snapshot.
    ///
    /// Returns whether a new snapshot was published. Concurrent calls are
    /// serialized and a call that finds nothing new is a no-op.
    pub fn refresh(&self) -> Result<bool> {
        self.check_open()?;
        let _guard = self.refresh_lock.lock();

        let mut attempt = 1;
        loop {
            let Some(manifest) = Manifest::load(self.storage.as_ref())? else {
                return Ok(false);
            };
            if manifest.generation == self.current.load().generation() {
                return Ok(false);
            }

            match self.load_segments(&manifest.segments) {
                Ok(segments) => {
                    self.publish(manifest.generation, segments);
                    return Ok(true);
                }
                Err(e) if attempt < REFRESH_ATTEMPTS && self.manifest_moved(&manifest) => {
                    debug!(
                        "Commit {} was superseded during refresh ({e}); retrying",
                        manifest.generation
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn manifest_moved(&self, seen: &Manifest) -> bool {
        match Manifest::load(self.storage.as_ref()) {
            Ok(Some(latest)) => latest.generation != seen.generation,
            Ok(None) => false,
            Err(e) => {
                warn!("Could not reload manifest: {e}");
                false
            }
        }
    }

    fn load_segments(&self, entries: &[SegmentEntry]) -> Result<Vec<SegmentReader>> {
        let cached = self.readers.lock().clone();
        let mut segments = Vec::with_capacity(entries.len());
        let mut loaded = 0;

        for entry in entries {
            let key = (entry.name.clone(), entry.deletion_generation);
            if let Some(reader) = cached.get(&key) {
                segments.push(reader.clone());
                continue;
            }

            // Reuse the parsed segment when only the deletions changed.
            let known = cached
                .iter()
                .find(|((name, _), _)| *name == entry.name)
                .map(|(_, reader)| reader.segment_arc().clone());
            let reader = match (known, entry.deletion_file()) {
                (Some(segment), Some(file)) => {
                    let deletions = DeletionSet::read(
                        self.storage.as_ref(),
                        &file,
                        segment.max_doc(),
                    )?;
                    SegmentReader::with_deletions(segment, deletions, entry.deletion_generation)
                }
                (Some(segment), None) => SegmentReader::new(segment),
                (None, _) => SegmentReader::open(self.storage.as_ref(), entry)?,
            };
            loaded += 1;
            segments.push(reader);
        }

        let mut readers = self.readers.lock();
        readers.clear();
        for reader in &segments {
            readers.insert(
                (reader.segment().name().to_string(), reader.deletion_generation()),
                reader.clone(),
            );
        }
        debug!("Loaded {loaded} of {} segment readers", segments.len());

        Ok(segments)
    }

    fn publish(&self, generation: u64, segments: Vec<SegmentReader>) {
        let snapshot = IndexSnapshot::new(generation, segments);
        info!(
            "Published snapshot at generation {generation} ({} live documents)",
            snapshot.num_docs()
        );
        self.current.store(Arc::new(snapshot));
    }

    /// Acquire the current snapshot. Release it with [`release`](Self::release)
    /// or by dropping the guard.
    pub fn acquire(&self) -> Result<SnapshotGuard> {
        self.check_open()?;
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        Ok(SnapshotGuard {
            snapshot: self.current.load_full(),
            outstanding: self.outstanding.clone(),
        })
    }

    /// Return a snapshot acquired from this manager.
    pub fn release(&self, guard: SnapshotGuard) {
        drop(guard);
    }

    /// Generation of the published snapshot.
    pub fn generation(&self) -> u64 {
        self.current.load().generation()
    }

    /// Snapshots acquired and not yet released.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Stop handing out snapshots. Closing twice is a no-op.
    ///
    /// Snapshots already acquired stay valid until released.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let _guard = self.refresh_lock.lock();
        self.readers.lock().clear();
        self.current.store(Arc::new(IndexSnapshot::empty()));

        let outstanding = self.outstanding();
        if outstanding > 0 {
            warn!("Closing reader manager with {outstanding} snapshots still acquired");
        }
        debug!("Closed reader manager");
        Ok(())
    }

    /// Whether the manager is closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// An acquired snapshot. Dereferences to [`IndexSnapshot`].
#[derive(Debug)]
pub struct SnapshotGuard {
    snapshot: Arc<IndexSnapshot>,
    outstanding: Arc<AtomicUsize>,
}

impl SnapshotGuard {
    /// Shared handle to the snapshot, usable past the guard's lifetime.
    pub fn snapshot(&self) -> &Arc<IndexSnapshot> {
        &self.snapshot
    }
}

impl Deref for SnapshotGuard {
    type Target = IndexSnapshot;

    fn deref(&self) -> &IndexSnapshot {
        &self.snapshot
    }
}

impl Drop for SnapshotGuard {
    fn drop(&mut self) {
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
    }
}
