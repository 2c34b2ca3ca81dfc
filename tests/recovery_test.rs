use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use glaive::config::EngineConfig;
use glaive::document::{ContentRecord, encode};
use glaive::engine::ContentIndex;
use glaive::error::Result;
use glaive::index::writer::{IndexWriter, IndexWriterConfig};
use glaive::index::{MANIFEST_FILE, WRITE_LOG_FILE};
use glaive::storage::{FileStorage, Storage, StorageConfig};

fn open_index(path: &Path) -> Result<ContentIndex> {
    ContentIndex::open(EngineConfig::new(path))
}

fn open_writer(path: &Path) -> Result<IndexWriter> {
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(path, StorageConfig::default())?);
    IndexWriter::open(storage, IndexWriterConfig::default())
}

#[test]
fn test_committed_data_survives_restart() -> Result<()> {
    let dir = tempfile::tempdir()?;

    {
        let index = open_index(dir.path())?;
        for i in 1..=5 {
            index.index_content(
                &ContentRecord::new(format!("Note {i}"), "persistent body")
                    .with_id(i)
                    .with_author("alice"),
            )?;
        }
        index.delete_content(3)?;
        index.close()?;
    }

    let index = open_index(dir.path())?;
    assert_eq!(index.stats()?.live_docs, 4);
    let hits = index.search(Some("persistent"), None, Some("alice"), 10)?;
    let mut ids: Vec<_> = hits.iter().filter_map(|hit| hit.id).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2, 4, 5]);
    assert!(index.get_indexed(3)?.is_none());
    Ok(())
}

#[test]
fn test_uncommitted_operations_are_replayed() -> Result<()> {
    let dir = tempfile::tempdir()?;

    {
        let mut writer = open_writer(dir.path())?;
        writer.upsert(encode(&ContentRecord::new("Committed", "first").with_id(1)))?;
        writer.commit()?;

        // Logged but never committed.
        writer.upsert(encode(&ContentRecord::new("Pending", "second").with_id(2)))?;
        writer.delete(1)?;
        writer.close()?;
    }

    let index = open_index(dir.path())?;
    assert_eq!(index.stats()?.live_docs, 1);
    assert!(index.get_indexed(1)?.is_none());
    assert_eq!(index.get_indexed(2)?.map(|r| r.title), Some("Pending".to_string()));
    index.close()?;

    // The log was folded into a commit; a second restart changes nothing.
    let index = open_index(dir.path())?;
    let stats = index.stats()?;
    assert_eq!(stats.live_docs, 1);
    assert_eq!(stats.generation, 2);
    Ok(())
}

#[test]
fn test_torn_log_tail_is_discarded() -> Result<()> {
    let dir = tempfile::tempdir()?;

    {
        let mut writer = open_writer(dir.path())?;
        writer.upsert(encode(&ContentRecord::new("Survivor", "intact record").with_id(1)))?;
        writer.close()?;
    }

    // Simulate a crash in the middle of appending a second record.
    let mut log = OpenOptions::new()
        .append(true)
        .open(dir.path().join(WRITE_LOG_FILE))?;
    log.write_all(&[0xC8, 0x00, 0x00, 0x00])?;
    log.write_all(b"{\"seq\":2,\"entry\"")?;
    drop(log);

    let index = open_index(dir.path())?;
    assert_eq!(index.stats()?.live_docs, 1);
    let hits = index.search(Some("survivor"), None, None, 10)?;
    assert_eq!(hits.len(), 1);

    index.index_content(&ContentRecord::new("After", "recovery").with_id(2))?;
    assert_eq!(index.stats()?.live_docs, 2);
    Ok(())
}

#[test]
fn test_manifest_is_the_commit_point() -> Result<()> {
    let dir = tempfile::tempdir()?;

    {
        let index = open_index(dir.path())?;
        index.index_content(&ContentRecord::new("Visible", "text").with_id(1))?;
        index.close()?;
    }
    assert!(dir.path().join(MANIFEST_FILE).exists());
    assert!(!dir.path().join(format!("{MANIFEST_FILE}.tmp")).exists());

    // Stray files from an interrupted commit are ignored and cleaned up.
    std::fs::write(dir.path().join("seg_99.seg"), b"half written")?;
    std::fs::write(dir.path().join(format!("{MANIFEST_FILE}.tmp")), b"{")?;

    let index = open_index(dir.path())?;
    assert_eq!(index.stats()?.live_docs, 1);
    assert!(!dir.path().join("seg_99.seg").exists());
    Ok(())
}

#[test]
fn test_second_engine_on_same_directory_is_locked_out() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let first = open_index(dir.path())?;

    let err = open_index(dir.path()).unwrap_err();
    assert!(err.to_string().contains("locked"), "{err}");

    first.close()?;
    let second = open_index(dir.path())?;
    assert!(!second.is_closed());
    Ok(())
}

#[test]
fn test_close_is_idempotent_and_final() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let index = open_index(dir.path())?;
    index.index_content(&ContentRecord::new("Doc", "body").with_id(1))?;

    index.close()?;
    index.close()?;
    assert!(index.is_closed());
    assert!(index.search(Some("doc"), None, None, 10).is_err());
    assert!(index.delete_content(1).is_err());
    assert!(index.stats().is_err());

    // Dropping a closed engine is harmless and the directory reopens.
    drop(index);
    assert_eq!(open_index(dir.path())?.stats()?.live_docs, 1);
    Ok(())
}
