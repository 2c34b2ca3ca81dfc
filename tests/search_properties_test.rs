use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use glaive::config::EngineConfig;
use glaive::document::ContentRecord;
use glaive::engine::ContentIndex;
use glaive::error::Result;
use glaive::search::QueryRequest;
use glaive::storage::MemoryStorage;

fn create_index() -> Result<ContentIndex> {
    create_index_with(EngineConfig::default())
}

fn create_index_with(config: EngineConfig) -> Result<ContentIndex> {
    ContentIndex::with_storage(Arc::new(MemoryStorage::new_default()), config)
}

fn ids(hits: &[glaive::document::SearchHit]) -> Vec<Option<i64>> {
    hits.iter().map(|hit| hit.id).collect()
}

#[test]
fn test_upsert_is_idempotent() -> Result<()> {
    let index = create_index()?;
    let record = ContentRecord::new("Release plan", "Ship the search engine")
        .with_id(7)
        .with_category("eng");

    index.index_content(&record)?;
    index.index_content(&record)?;
    index.index_content(&record)?;

    assert_eq!(index.stats()?.live_docs, 1);
    let hits = index.search(Some("release"), None, None, 10)?;
    assert_eq!(ids(&hits), vec![Some(7)]);

    // Re-indexing with new content replaces the old terms.
    index.index_content(&record.clone().with_category("ops"))?;
    assert!(index.search(None, Some("eng"), None, 10)?.is_empty());
    assert_eq!(ids(&index.search(None, Some("ops"), None, 10)?), vec![Some(7)]);
    Ok(())
}

#[test]
fn test_delete_of_absent_id_is_a_noop() -> Result<()> {
    let index = create_index()?;
    index.index_content(&ContentRecord::new("Kept", "still here").with_id(1))?;
    let before = index.stats()?;

    index.delete_content(999)?;
    index.delete_content(999)?;

    let after = index.stats()?;
    assert_eq!(after.live_docs, before.live_docs);
    assert_eq!(ids(&index.search(Some("kept"), None, None, 10)?), vec![Some(1)]);

    index.delete_content(1)?;
    index.delete_content(1)?;
    assert!(index.search(Some("kept"), None, None, 10)?.is_empty());
    assert_eq!(index.stats()?.live_docs, 0);
    Ok(())
}

#[test]
fn test_read_after_write_and_snapshot_isolation() -> Result<()> {
    let index = create_index()?;
    index.index_content(&ContentRecord::new("First note", "alpha").with_id(1))?;

    let readers = index.reader_manager()?;
    let old = readers.acquire()?;
    assert_eq!(old.num_docs(), 1);

    index.index_content(&ContentRecord::new("Second note", "alpha").with_id(2))?;
    index.delete_content(1)?;

    // A search issued after the writes sees them.
    assert_eq!(ids(&index.search(Some("alpha"), None, None, 10)?), vec![Some(2)]);

    // The snapshot acquired earlier still reflects its own commit.
    assert_eq!(old.num_docs(), 1);
    assert_eq!(old.find_by_id(1).len(), 1);
    assert!(old.find_by_id(2).is_empty());
    assert!(old.generation() < readers.generation());

    assert_eq!(index.stats()?.outstanding_snapshots, 1);
    readers.release(old);
    assert_eq!(index.stats()?.outstanding_snapshots, 0);
    Ok(())
}

#[test]
fn test_empty_request_returns_nothing() -> Result<()> {
    let index = create_index()?;
    index.index_content(&ContentRecord::new("Anything", "at all").with_id(1))?;

    assert!(index.search(None, None, None, 10)?.is_empty());
    assert!(index.search(Some(""), Some("  "), Some(""), 10)?.is_empty());
    assert!(index.search_request(&QueryRequest::default())?.is_empty());

    // Text that analyzes to no terms matches nothing either.
    assert!(index.search(Some("!!! ???"), None, None, 10)?.is_empty());
    Ok(())
}

#[test]
fn test_query_syntax_in_user_input_is_literal() -> Result<()> {
    let index = create_index()?;
    index.index_content(
        &ContentRecord::new("Operators", "title and body with AND OR NOT words").with_id(1),
    )?;

    for text in [
        "title:*",
        "AND OR NOT",
        "(unbalanced",
        "\"unterminated",
        "a\\",
        "x^2 || y && !z",
        "[1 TO 5]",
        "{}~?/",
        "body:*",
    ] {
        assert!(index.search(Some(text), None, None, 10).is_ok(), "{text}");
    }

    // Field syntax is not interpreted: "title:*" is the word "title".
    assert_eq!(ids(&index.search(Some("title:*"), None, None, 10)?), vec![Some(1)]);
    assert_eq!(ids(&index.search(Some("NOT"), None, None, 10)?), vec![Some(1)]);
    assert!(index.search(Some("zzz:*"), None, None, 10)?.is_empty());
    Ok(())
}

#[test]
fn test_filters_are_anded_and_exact() -> Result<()> {
    let index = create_index()?;
    let records = [
        ContentRecord::new("Budget report", "numbers")
            .with_id(1)
            .with_category("finance")
            .with_author("alice"),
        ContentRecord::new("Budget review", "numbers")
            .with_id(2)
            .with_category("finance")
            .with_author("bob"),
        ContentRecord::new("Budget roadmap", "plans")
            .with_id(3)
            .with_category("product")
            .with_author("alice"),
        ContentRecord::new("Hiring", "people")
            .with_id(4)
            .with_category("finance")
            .with_author("alice"),
    ];
    for record in &records {
        index.index_content(record)?;
    }

    let hits = index.search(Some("budget"), Some("finance"), Some("alice"), 10)?;
    assert_eq!(ids(&hits), vec![Some(1)]);

    let mut finance = ids(&index.search(None, Some("finance"), None, 10)?);
    finance.sort();
    assert_eq!(finance, vec![Some(1), Some(2), Some(4)]);

    // Filters match the whole value, case-sensitively.
    assert!(index.search(None, Some("Finance"), None, 10)?.is_empty());
    assert!(index.search(None, None, Some("ali"), 10)?.is_empty());
    Ok(())
}

#[test]
fn test_multi_word_category_is_a_single_value() -> Result<()> {
    let index = create_index()?;
    index.index_content(
        &ContentRecord::new("Launch", "go")
            .with_id(1)
            .with_category("Product News"),
    )?;
    assert_eq!(
        ids(&index.search(None, Some("Product News"), None, 10)?),
        vec![Some(1)]
    );
    assert!(index.search(None, Some("Product"), None, 10)?.is_empty());
    Ok(())
}

#[test]
fn test_highlight_fallbacks() -> Result<()> {
    let index = create_index()?;
    let body = "x".repeat(350);
    index.index_content(
        &ContentRecord::new("Plain title", body.clone())
            .with_id(1)
            .with_tags("needle"),
    )?;

    let hits = index.search(Some("needle"), None, None, 10)?;
    assert_eq!(hits.len(), 1);
    let hit = &hits[0];
    assert_eq!(hit.highlighted_title.as_deref(), Some("Plain title"));
    let expected = format!("{}...", "x".repeat(200));
    assert_eq!(hit.highlighted_body.as_deref(), Some(expected.as_str()));
    assert_eq!(hit.body, body);

    // A short body is returned as-is.
    index.index_content(&ContentRecord::new("Other", "short").with_id(2).with_tags("pin"))?;
    let hits = index.search(Some("pin"), None, None, 10)?;
    assert_eq!(hits[0].highlighted_body.as_deref(), Some("short"));
    Ok(())
}

#[test]
fn test_body_fallback_length_does_not_follow_fragment_size() -> Result<()> {
    let index = create_index_with(EngineConfig::default().with_fragment_size(50))?;
    index.index_content(&ContentRecord::new("report", "z".repeat(350)).with_id(1))?;

    let hits = index.search(Some("report"), None, None, 10)?;
    let expected = format!("{}...", "z".repeat(200));
    assert_eq!(hits[0].highlighted_body.as_deref(), Some(expected.as_str()));
    assert_eq!(hits[0].highlighted_title.as_deref(), Some("<mark>report</mark>"));
    Ok(())
}

#[test]
fn test_concurrent_readers_and_writer() -> Result<()> {
    const DISTINCT_IDS: i64 = 50;
    const WRITES: i64 = 200;
    const READERS: usize = 4;
    const SEARCHES: usize = 200;

    let index = Arc::new(create_index()?);
    index.index_content(&ContentRecord::new("seed", "shared text").with_id(0))?;

    let writer = {
        let index = Arc::clone(&index);
        thread::spawn(move || -> Result<()> {
            for i in 0..WRITES {
                let id = i % DISTINCT_IDS;
                index.index_content(
                    &ContentRecord::new(format!("note {id}"), format!("shared text round {i}"))
                        .with_id(id),
                )?;
            }
            Ok(())
        })
    };

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let index = Arc::clone(&index);
            thread::spawn(move || -> Result<()> {
                for _ in 0..SEARCHES {
                    let hits = index.search(Some("shared"), None, None, 100)?;
                    let unique: HashSet<_> = hits.iter().map(|hit| hit.id).collect();
                    assert_eq!(unique.len(), hits.len(), "duplicate ids in results");
                    assert!(hits.windows(2).all(|pair| pair[0].score >= pair[1].score));
                }
                Ok(())
            })
        })
        .collect();

    writer.join().expect("writer thread panicked")?;
    for reader in readers {
        reader.join().expect("reader thread panicked")?;
    }

    let stats = index.stats()?;
    assert_eq!(stats.live_docs, DISTINCT_IDS as u64);
    assert_eq!(stats.outstanding_snapshots, 0);
    assert_eq!(index.reader_manager()?.outstanding(), 0);
    Ok(())
}

#[test]
fn test_highlight_marks_matches() -> Result<()> {
    let index = create_index()?;
    let filler = "lorem ipsum dolor sit amet ".repeat(20);
    let body = format!("{filler}the quick brown fox jumps {filler}");
    index.index_content(&ContentRecord::new("Quick fox", body).with_id(1))?;

    let hits = index.search(Some("fox"), None, None, 10)?;
    let title = hits[0].highlighted_title.as_deref().unwrap();
    assert_eq!(title, "Quick <mark>fox</mark>");

    let fragment = hits[0].highlighted_body.as_deref().unwrap();
    assert!(fragment.contains("<mark>fox</mark>"));
    let plain = fragment.replace("<mark>", "").replace("</mark>", "");
    assert!(plain.chars().count() <= 200);
    Ok(())
}

#[test]
fn test_results_are_ordered_by_score() -> Result<()> {
    let index = create_index()?;
    index.index_content(&ContentRecord::new("Gardening", "nothing to see").with_id(3))?;
    index.index_content(&ContentRecord::new("Cooking", "a short note about rust").with_id(2))?;
    index.index_content(
        &ContentRecord::new("Rust", "rust rust rust: the rust guide")
            .with_id(1)
            .with_tags("rust"),
    )?;

    let hits = index.search(Some("rust"), None, None, 10)?;
    assert_eq!(ids(&hits), vec![Some(1), Some(2)]);
    assert!(hits.windows(2).all(|pair| pair[0].score >= pair[1].score));
    assert!(hits.iter().all(|hit| hit.score > 0.0));

    let limited = index.search(Some("rust"), None, None, 1)?;
    assert_eq!(ids(&limited), vec![Some(1)]);
    Ok(())
}

#[test]
fn test_equal_scores_keep_index_order() -> Result<()> {
    let index = create_index()?;
    index.index_content(&ContentRecord::new("Twin", "same words").with_id(10))?;
    index.index_content(&ContentRecord::new("Twin", "same words").with_id(11))?;

    let hits = index.search(Some("twin"), None, None, 10)?;
    assert_eq!(ids(&hits), vec![Some(10), Some(11)]);
    assert_eq!(hits[0].score, hits[1].score);
    Ok(())
}

#[test]
fn test_zero_results_limit_is_rejected() -> Result<()> {
    let index = create_index()?;
    let err = index.search(Some("x"), None, None, 0).unwrap_err();
    assert!(err.is_client_error());
    Ok(())
}
