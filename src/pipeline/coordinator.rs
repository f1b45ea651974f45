use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::export;
use crate::models::{ArticleRecord, Publication, RawMessage};
use crate::services::{extract_urls, ArticleResolver, MessageClassifier};
use crate::store::{CheckpointStore, PublicationStore};

/// Terminal state of one message's pass through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Older than (or equal to) the chat's checkpoint; no side effects.
    Skipped,
    Processed { articles: usize, analyzed: bool },
}

/// The central state machine: filters each message against the checkpoint,
/// turns it into zero or more records, persists them as one batch, and only
/// then advances the checkpoint.
///
/// Persist-before-advance is the delivery contract: a crash between the two
/// steps means the message is reprocessed on restart, and URL-level dedup in
/// the store absorbs the replay. At-least-once with dedup by key, not true
/// exactly-once.
pub struct IngestionCoordinator {
    checkpoints: CheckpointStore,
    publications: PublicationStore,
    resolver: ArticleResolver,
    classifier: MessageClassifier,
    documents_dir: Option<PathBuf>,
}

impl IngestionCoordinator {
    pub fn new(
        checkpoints: CheckpointStore,
        publications: PublicationStore,
        resolver: ArticleResolver,
        classifier: MessageClassifier,
        documents_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            checkpoints,
            publications,
            resolver,
            classifier,
            documents_dir,
        }
    }

    pub fn checkpoint(&self, chat_key: &str) -> Option<DateTime<Utc>> {
        self.checkpoints.get(chat_key)
    }

    pub fn checkpoint_summary(&self) -> Vec<(String, String)> {
        self.checkpoints.summary()
    }

    pub fn touch_checkpoint_if_absent(&mut self, chat_key: &str) -> Result<()> {
        self.checkpoints.touch_if_absent(chat_key)
    }

    pub fn reset_checkpoint(&mut self, chat_key: &str) -> Result<bool> {
        self.checkpoints.reset(chat_key)
    }

    pub fn reset_all_checkpoints(&mut self) -> Result<()> {
        self.checkpoints.reset_all()
    }

    pub fn publications(&self) -> &PublicationStore {
        &self.publications
    }

    pub async fn process(&mut self, message: &RawMessage) -> Result<Outcome> {
        if !self
            .checkpoints
            .should_process(message.sent_at, &message.chat_key)
        {
            tracing::debug!(
                "Skipping message from {} at {} (before last check)",
                message.sender,
                message.sent_at
            );
            return Ok(Outcome::Skipped);
        }

        let mut batch: Vec<Publication> = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();

        for url in extract_urls(&message.text) {
            if self.publications.contains_url(&url) || seen_urls.contains(&url) {
                tracing::debug!("URL already known, not re-fetching: {}", url);
                continue;
            }
            tracing::info!("Resolving article: {}", url);
            let record = self.resolver.resolve(&url, &message.sender).await;
            seen_urls.insert(url);
            batch.push(Publication::Article(record));
        }

        let article_count = batch.len();

        // Analyzed whenever there is real text, with or without URLs.
        let analyzed = !message.text.trim().is_empty();
        if analyzed {
            let analysis = self
                .classifier
                .classify(&message.text, &message.sender, message.sent_at)
                .await;
            batch.push(Publication::MessageAnalysis(analysis));
        }

        let articles: Vec<ArticleRecord> = batch
            .iter()
            .filter_map(|record| match record {
                Publication::Article(a) => Some(a.clone()),
                Publication::MessageAnalysis(_) => None,
            })
            .collect();

        // All-or-nothing for this message's records; on failure the
        // checkpoint stays put and the message is retried on restart.
        let store_len_before = self.publications.len();
        self.publications.append_batch(batch)?;

        if article_count > 0 {
            tracing::info!(
                "Saved {} record(s), store now holds {}",
                article_count + usize::from(analyzed),
                self.publications.len()
            );
        }

        self.write_documents(&articles, store_len_before);

        self.checkpoints.set(&message.chat_key, message.sent_at)?;

        Ok(Outcome::Processed {
            articles: article_count,
            analyzed,
        })
    }

    /// Formatted documents are written only after the batch is durable, and
    /// a failed write never fails the message.
    fn write_documents(&self, articles: &[ArticleRecord], store_len_before: usize) {
        let Some(dir) = &self.documents_dir else {
            return;
        };
        for (i, record) in articles.iter().enumerate() {
            let filename = export::document_filename(store_len_before + i + 1, record.extracted_at);
            let path = dir.join(filename);
            match export::write_document(record, &path) {
                Ok(()) => tracing::info!("Document created: {:?}", path),
                Err(e) => tracing::warn!("Could not write document {:?}: {}", path, e),
            }
        }
    }
}
