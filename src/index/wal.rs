//! Write log for index mutations.
//!
//! Every upsert and delete is appended here before it is applied to the
//! writer's in-memory buffer. Records are `[len: u32 LE][JSON]`. On open the
//! writer replays records newer than the manifest's `log_seq`; after each
//! commit the log is truncated.

use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::warn;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::document::field::IndexedDocument;
use crate::error::Result;
use crate::storage::{Storage, StorageOutput};

pub type SeqNumber = u64;

/// A single logged mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogEntry {
    /// Insert a document, replacing any with the same id.
    Upsert { document: IndexedDocument },
    /// Delete every document with this id.
    Delete { id: i64 },
}

/// A log entry with its sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub seq: SeqNumber,
    pub entry: LogEntry,
}

/// Result of reading the log back.
#[derive(Debug, Default)]
pub struct LogContents {
    /// Complete records, in append order.
    pub records: Vec<LogRecord>,
    /// Whether an incomplete or unreadable tail was discarded.
    pub torn_tail: bool,
}

/// Appends to and replays the write log.
#[derive(Debug)]
pub struct WriteLog {
    storage: Arc<dyn Storage>,
    path: String,
    writer: Mutex<Option<Box<dyn StorageOutput>>>,
    next_seq: AtomicU64,
}

impl WriteLog {
    /// Create a log handle for `path`. Nothing is opened until the first append.
    pub fn new(storage: Arc<dyn Storage>, path: &str) -> Self {
        WriteLog {
            storage,
            path: path.to_string(),
            writer: Mutex::new(None),
            next_seq: AtomicU64::new(1),
        }
    }

    /// Set the next sequence number.
    pub fn set_next_seq(&self, seq: SeqNumber) {
        self.next_seq.store(seq, Ordering::SeqCst);
    }

    /// Get the last assigned sequence number.
    pub fn last_seq(&self) -> SeqNumber {
        self.next_seq.load(Ordering::SeqCst).saturating_sub(1)
    }

    /// Append an entry and sync it. Returns the assigned sequence number.
    pub fn append(&self, entry: &LogEntry) -> Result<SeqNumber> {
        let mut writer_guard = self.writer.lock();
        if writer_guard.is_none() {
            *writer_guard = Some(self.storage.create_output_append(&self.path)?);
        }

        let seq = self.next_seq.load(Ordering::SeqCst);
        let record = LogRecord {
            seq,
            entry: entry.clone(),
        };
        let bytes = serde_json::to_vec(&record)?;

        if let Some(writer) = writer_guard.as_mut() {
            writer.write_all(&(bytes.len() as u32).to_le_bytes())?;
            writer.write_all(&bytes)?;
            writer.flush_and_sync()?;
        }

        self.next_seq.store(seq + 1, Ordering::SeqCst);
        Ok(seq)
    }

    /// Read every complete record. Advances the next sequence number past them.
    ///
    /// A trailing record that is cut short or does not parse is treated as an
    /// interrupted append: it is dropped with a warning and reading stops.
    pub fn read_all(&self) -> Result<LogContents> {
        if !self.storage.file_exists(&self.path) {
            return Ok(LogContents::default());
        }

        let mut reader = self.storage.open_input(&self.path)?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let mut contents = LogContents::default();
        let mut position = 0usize;
        let mut max_seq = 0;

        while position < bytes.len() {
            if position + 4 > bytes.len() {
                contents.torn_tail = true;
                break;
            }
            let mut len_bytes = [0u8; 4];
            len_bytes.copy_from_slice(&bytes[position..position + 4]);
            let len = u32::from_le_bytes(len_bytes) as usize;
            position += 4;

            if position + len > bytes.len() {
                contents.torn_tail = true;
                break;
            }

            match serde_json::from_slice::<LogRecord>(&bytes[position..position + len]) {
                Ok(record) => {
                    max_seq = max_seq.max(record.seq);
                    contents.records.push(record);
                }
                Err(e) => {
                    warn!("Unreadable record in {} at byte {}: {e}", self.path, position - 4);
                    contents.torn_tail = true;
                    break;
                }
            }
            position += len;
        }

        if contents.torn_tail {
            warn!(
                "Discarding incomplete tail of {} after {} records",
                self.path,
                contents.records.len()
            );
        }

        if max_seq >= self.next_seq.load(Ordering::SeqCst) {
            self.next_seq.store(max_seq + 1, Ordering::SeqCst);
        }

        Ok(contents)
    }

    /// Clear the log. Sequence numbers keep increasing.
    pub fn truncate(&self) -> Result<()> {
        let mut writer_guard = self.writer.lock();
        *writer_guard = None;

        let mut writer = self.storage.create_output(&self.path)?;
        writer.flush_and_sync()?;
        writer.close()
    }

    /// Close the append handle.
    pub fn close(&self) -> Result<()> {
        if let Some(mut writer) = self.writer.lock().take() {
            writer.close()?;
        }
        Ok(())
    }
}
