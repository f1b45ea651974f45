use crate::connector::ChatConnector;
use crate::error::Result;
use crate::pipeline::IngestionCoordinator;

/// One-time historical scan run at startup to catch up on messages missed
/// while offline.
pub struct BackfillScanner {
    limit: usize,
}

impl BackfillScanner {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Walks chat history newest-first, keeps everything strictly newer than
    /// the checkpoint, and replays it in chronological order through the
    /// coordinator.
    ///
    /// The checkpoint is snapshotted once at scan start: re-reading it per
    /// message would skip newer messages interleaved with older ones while
    /// the scan itself advances it. Chronological replay keeps checkpoint
    /// advancement monotonic, so an interrupted scan resumes from the last
    /// fully processed message.
    pub async fn scan<C: ChatConnector>(
        &self,
        coordinator: &mut IngestionCoordinator,
        connector: &C,
        chat_key: &str,
    ) -> Result<usize> {
        let cutoff = coordinator.checkpoint(chat_key);
        tracing::info!(
            "Scanning up to {} messages in {} (last check: {})",
            self.limit,
            chat_key,
            cutoff
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_else(|| "never".to_string())
        );

        let history = connector.history(chat_key, self.limit).await?;

        let mut pending: Vec<_> = history
            .into_iter()
            .filter(|msg| match cutoff {
                Some(last) => msg.sent_at > last,
                None => true,
            })
            .collect();
        pending.reverse(); // newest-first to chronological

        tracing::info!("Processing {} new message(s)", pending.len());

        let mut processed = 0usize;
        for message in &pending {
            match coordinator.process(message).await {
                Ok(_) => processed += 1,
                Err(e) => {
                    // One bad message never halts the scan.
                    tracing::error!(
                        "Failed to process message from {} at {}: {}",
                        message.sender,
                        message.sent_at,
                        e
                    );
                }
            }
        }

        // Mark that a check happened even when nothing qualified.
        coordinator.touch_checkpoint_if_absent(chat_key)?;

        Ok(processed)
    }
}
