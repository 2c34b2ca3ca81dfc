//! Per-segment deleted-document bitmaps.

use bit_vec::BitVec;

use crate::error::{GlaiveError, Result};
use crate::storage::{Storage, StructReader, StructWriter};

const DELETION_MAGIC: u32 = 0x4744_454C; // "GDEL"
const DELETION_VERSION: u32 = 1;

/// Bitmap of deleted documents in one segment (bit set = deleted).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletionSet {
    bits: BitVec,
    deleted_count: u32,
}

impl DeletionSet {
    /// An empty set for a segment holding `max_doc` documents.
    pub fn new(max_doc: u32) -> Self {
        DeletionSet {
            bits: BitVec::from_elem(max_doc as usize, false),
            deleted_count: 0,
        }
    }

    /// Mark `doc` deleted. Returns false if it was already deleted or out of range.
    pub fn delete(&mut self, doc: u32) -> bool {
        match self.bits.get(doc as usize) {
            Some(false) => {
                self.bits.set(doc as usize, true);
                self.deleted_count += 1;
                true
            }
            _ => false,
        }
    }

    /// Whether `doc` is deleted.
    pub fn is_deleted(&self, doc: u32) -> bool {
        self.bits.get(doc as usize).unwrap_or(false)
    }

    /// Number of documents the segment holds.
    pub fn max_doc(&self) -> u32 {
        self.bits.len() as u32
    }

    /// Number of deleted documents.
    pub fn deleted_count(&self) -> u32 {
        self.deleted_count
    }

    /// Number of live documents.
    pub fn live_count(&self) -> u32 {
        self.max_doc() - self.deleted_count
    }

    /// Fraction of documents deleted (0.0 to 1.0).
    pub fn deletion_ratio(&self) -> f64 {
        if self.bits.is_empty() {
            0.0
        } else {
            self.deleted_count as f64 / self.bits.len() as f64
        }
    }

    /// Write the bitmap to `file_name`.
    pub fn write(&self, storage: &dyn Storage, file_name: &str) -> Result<()> {
        let output = storage.create_output(file_name)?;
        let mut writer = StructWriter::new(output);

        writer.write_u32(DELETION_MAGIC)?;
        writer.write_u32(DELETION_VERSION)?;
        writer.write_varint(self.bits.len() as u64)?;
        writer.write_varint(self.deleted_count as u64)?;
        writer.write_bytes(&self.bits.to_bytes())?;

        writer.close()
    }

    /// Read a bitmap written by [`write`](Self::write) for a segment of `max_doc` documents.
    pub fn read(storage: &dyn Storage, file_name: &str, max_doc: u32) -> Result<Self> {
        let input = storage.open_input(file_name)?;
        let mut reader = StructReader::new(input)?;

        if reader.read_u32()? != DELETION_MAGIC {
            return Err(GlaiveError::index(format!(
                "{file_name} is not a deletion file"
            )));
        }
        let version = reader.read_u32()?;
        if version != DELETION_VERSION {
            return Err(GlaiveError::index(format!(
                "Unsupported deletion file version {version} in {file_name}"
            )));
        }

        let len = reader.read_varint()?;
        if len != max_doc as u64 {
            return Err(GlaiveError::index(format!(
                "{file_name} covers {len} documents, segment has {max_doc}"
            )));
        }
        let deleted_count = reader.read_varint()? as u32;
        let mut bits = BitVec::from_bytes(&reader.read_bytes()?);
        bits.truncate(max_doc as usize);
        reader
            .verify_checksum()
            .map_err(|e| GlaiveError::index(format!("Deletions {file_name} are corrupt: {e}")))?;

        let counted = bits.iter().filter(|deleted| *deleted).count() as u32;
        if bits.len() != max_doc as usize || counted != deleted_count {
            return Err(GlaiveError::index(format!(
                "{file_name} is inconsistent with its header"
            )));
        }

        Ok(DeletionSet {
            bits,
            deleted_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;

    #[test]
    fn test_delete_counts_once() {
        let mut deletions = DeletionSet::new(10);

        assert!(deletions.delete(3));
        assert!(!deletions.delete(3));
        assert!(!deletions.delete(42));

        assert!(deletions.is_deleted(3));
        assert!(!deletions.is_deleted(4));
        assert!(!deletions.is_deleted(42));
        assert_eq!(deletions.deleted_count(), 1);
        assert_eq!(deletions.live_count(), 9);
        assert!((deletions.deletion_ratio() - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_write_then_read() {
        let storage = MemoryStorage::new_default();
        let mut deletions = DeletionSet::new(13);
        deletions.delete(0);
        deletions.delete(12);
        deletions.write(&storage, "seg_1_4.del").unwrap();

        let loaded = DeletionSet::read(&storage, "seg_1_4.del", 13).unwrap();
        assert_eq!(loaded, deletions);
        assert!(DeletionSet::read(&storage, "seg_1_4.del", 12).is_err());
    }
}
