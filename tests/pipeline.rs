//! End-to-end scenarios for the ingestion coordinator and backfill scanner,
//! driven through an in-memory chat connector. Article URLs use reserved
//! example domains, so every resolution degrades to a fetch-error placeholder
//! record; the dedup and checkpoint behavior under test is identical either
//! way.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use newswatch::connector::{ChatConnector, ChatTarget};
use newswatch::error::Result;
use newswatch::models::{Publication, RawMessage};
use newswatch::pipeline::{BackfillScanner, IngestionCoordinator, Outcome};
use newswatch::services::{ArticleResolver, MessageClassifier};
use newswatch::store::{CheckpointStore, PublicationStore};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn msg(text: &str, secs: i64) -> RawMessage {
    RawMessage {
        chat_key: "me".to_string(),
        sender: "Alice".to_string(),
        text: text.to_string(),
        sent_at: ts(secs),
    }
}

struct Harness {
    coordinator: IngestionCoordinator,
    // Held for the lifetime of the test so the stores' files survive.
    _dir: TempDir,
}

fn harness(write_documents: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let checkpoints = CheckpointStore::open(dir.path());
    let publications = PublicationStore::open(dir.path());
    let documents_dir = write_documents.then(|| dir.path().to_path_buf());
    let coordinator = IngestionCoordinator::new(
        checkpoints,
        publications,
        ArticleResolver::new(None),
        MessageClassifier::new(None),
        documents_dir,
    );
    Harness {
        coordinator,
        _dir: dir,
    }
}

/// In-memory connector; `history` is newest first, as the real one pages it.
struct MemoryConnector {
    history: Vec<RawMessage>,
}

#[async_trait]
impl ChatConnector for MemoryConnector {
    async fn resolve_chat(&mut self, _target: &ChatTarget) -> Result<String> {
        Ok("me".to_string())
    }

    async fn history(&self, _chat_key: &str, limit: usize) -> Result<Vec<RawMessage>> {
        Ok(self.history.iter().take(limit).cloned().collect())
    }

    async fn next_message(&mut self) -> Result<Option<RawMessage>> {
        Ok(None)
    }
}

fn analysis_texts(records: &[Publication]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| match r {
            Publication::MessageAnalysis(m) => Some(m.original_text.clone()),
            Publication::Article(_) => None,
        })
        .collect()
}

#[tokio::test]
async fn text_message_yields_one_analysis_record() {
    let mut h = harness(false);
    let outcome = h.coordinator.process(&msg("hello there", 10)).await.unwrap();

    assert_eq!(
        outcome,
        Outcome::Processed {
            articles: 0,
            analyzed: true
        }
    );
    assert_eq!(h.coordinator.publications().len(), 1);
    assert_eq!(h.coordinator.checkpoint("me"), Some(ts(10)));
}

#[tokio::test]
async fn whitespace_only_message_still_advances_checkpoint() {
    let mut h = harness(false);
    let outcome = h.coordinator.process(&msg("   \n", 10)).await.unwrap();

    assert_eq!(
        outcome,
        Outcome::Processed {
            articles: 0,
            analyzed: false
        }
    );
    assert!(h.coordinator.publications().is_empty());
    assert_eq!(h.coordinator.checkpoint("me"), Some(ts(10)));
}

#[tokio::test]
async fn replaying_a_processed_message_is_filtered() {
    let mut h = harness(false);
    let message = msg("hello there", 10);

    h.coordinator.process(&message).await.unwrap();
    let outcome = h.coordinator.process(&message).await.unwrap();

    assert_eq!(outcome, Outcome::Skipped);
    assert_eq!(h.coordinator.publications().len(), 1);
}

#[tokio::test]
async fn equal_timestamp_is_not_reprocessed() {
    // Boundary policy: strictly-greater-than filtering means the second of
    // two messages with an identical timestamp is dropped.
    let mut h = harness(false);
    h.coordinator.process(&msg("first", 10)).await.unwrap();

    let outcome = h.coordinator.process(&msg("second", 10)).await.unwrap();
    assert_eq!(outcome, Outcome::Skipped);
    assert_eq!(analysis_texts(h.coordinator.publications().records()), vec!["first"]);
}

#[tokio::test]
async fn monotonic_checkpoint_over_ordered_batch() {
    let mut h = harness(false);
    for (text, at) in [("a", 10), ("b", 20), ("c", 30)] {
        h.coordinator.process(&msg(text, at)).await.unwrap();
    }
    assert_eq!(h.coordinator.checkpoint("me"), Some(ts(30)));
    assert_eq!(
        analysis_texts(h.coordinator.publications().records()),
        vec!["a", "b", "c"]
    );
}

#[tokio::test]
async fn duplicate_url_in_one_message_resolves_once() {
    let mut h = harness(false);
    let outcome = h
        .coordinator
        .process(&msg(
            "check this out http://a.example/x and http://a.example/x",
            10,
        ))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Processed {
            articles: 1,
            analyzed: true
        }
    );
    let article_urls: Vec<_> = h
        .coordinator
        .publications()
        .records()
        .iter()
        .filter_map(Publication::url)
        .collect();
    assert_eq!(article_urls, vec!["http://a.example/x"]);
}

#[tokio::test]
async fn same_url_across_messages_yields_one_article_record() {
    let mut h = harness(false);
    h.coordinator
        .process(&msg("see http://a.example/x", 10))
        .await
        .unwrap();
    let outcome = h
        .coordinator
        .process(&msg("again http://a.example/x", 20))
        .await
        .unwrap();

    // The second message still gets its analysis record, but no new article.
    assert_eq!(
        outcome,
        Outcome::Processed {
            articles: 0,
            analyzed: true
        }
    );
    let article_count = h
        .coordinator
        .publications()
        .records()
        .iter()
        .filter(|r| r.url().is_some())
        .count();
    assert_eq!(article_count, 1);
}

#[tokio::test]
async fn fetch_failure_still_produces_a_stored_record() {
    let mut h = harness(false);
    h.coordinator
        .process(&msg("http://b.example/down", 10))
        .await
        .unwrap();

    let article = h
        .coordinator
        .publications()
        .records()
        .iter()
        .find_map(|r| match r {
            Publication::Article(a) => Some(a),
            _ => None,
        })
        .expect("article record should exist despite fetch failure");
    assert_eq!(article.title, "Could not extract title");
    assert_eq!(h.coordinator.checkpoint("me"), Some(ts(10)));
}

#[tokio::test]
async fn persist_failure_leaves_checkpoint_untouched() {
    let mut h = harness(false);
    // Occupy the store's staging path with a non-empty directory so the
    // database write cannot succeed.
    let staging = h._dir.path().join("news_database.json.tmp");
    std::fs::create_dir(&staging).unwrap();
    std::fs::write(staging.join("occupied"), b"x").unwrap();

    let result = h.coordinator.process(&msg("hello there", 10)).await;

    assert!(result.is_err());
    // The failed batch must not advance the checkpoint, so a restart
    // replays this message instead of losing it.
    assert_eq!(h.coordinator.checkpoint("me"), None);
    assert!(!h._dir.path().join("news_database.json").exists());
}

#[tokio::test]
async fn backfill_processes_history_chronologically() {
    let mut h = harness(false);
    let connector = MemoryConnector {
        history: vec![msg("newest", 30), msg("middle", 20), msg("oldest", 10)],
    };

    let scanner = BackfillScanner::new(3);
    let processed = scanner
        .scan(&mut h.coordinator, &connector, "me")
        .await
        .unwrap();

    assert_eq!(processed, 3);
    assert_eq!(
        analysis_texts(h.coordinator.publications().records()),
        vec!["oldest", "middle", "newest"]
    );
    assert_eq!(h.coordinator.checkpoint("me"), Some(ts(30)));
}

#[tokio::test]
async fn backfill_filters_by_checkpoint_snapshot() {
    let mut h = harness(false);
    h.coordinator.process(&msg("seen", 15)).await.unwrap();

    // Out-of-order history: a newer message appears after an older one in
    // the newest-first walk. The snapshot filter must still collect it.
    let connector = MemoryConnector {
        history: vec![msg("new-a", 30), msg("old", 10), msg("new-b", 20)],
    };

    let scanner = BackfillScanner::new(10);
    let processed = scanner
        .scan(&mut h.coordinator, &connector, "me")
        .await
        .unwrap();

    assert_eq!(processed, 2);
    assert_eq!(
        analysis_texts(h.coordinator.publications().records()),
        vec!["seen", "new-b", "new-a"]
    );
    assert_eq!(h.coordinator.checkpoint("me"), Some(ts(30)));
}

#[tokio::test]
async fn empty_backfill_touches_absent_checkpoint() {
    let mut h = harness(false);
    let connector = MemoryConnector { history: vec![] };

    let scanner = BackfillScanner::new(10);
    let processed = scanner
        .scan(&mut h.coordinator, &connector, "me")
        .await
        .unwrap();

    assert_eq!(processed, 0);
    // Future scans must know a check already happened.
    assert!(h.coordinator.checkpoint("me").is_some());
}

#[tokio::test]
async fn backfill_respects_the_limit() {
    let mut h = harness(false);
    let connector = MemoryConnector {
        history: vec![msg("c", 30), msg("b", 20), msg("a", 10)],
    };

    let scanner = BackfillScanner::new(2);
    let processed = scanner
        .scan(&mut h.coordinator, &connector, "me")
        .await
        .unwrap();

    assert_eq!(processed, 2);
    assert_eq!(
        analysis_texts(h.coordinator.publications().records()),
        vec!["b", "c"]
    );
}

#[tokio::test]
async fn documents_are_written_for_article_records() {
    let mut h = harness(true);
    h.coordinator
        .process(&msg("read http://a.example/x", 10))
        .await
        .unwrap();

    let docs: Vec<PathBuf> = std::fs::read_dir(h._dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("article_") && n.ends_with(".txt"))
        })
        .collect();
    assert_eq!(docs.len(), 1);
}
