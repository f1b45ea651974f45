use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::ai::EnrichmentClient;
use crate::models::{Importance, MessageAnalysisRecord, Sentiment};

const MAX_FALLBACK_SUMMARY: usize = 100;

/// Produces one [`MessageAnalysisRecord`] per message.
///
/// Classification never aborts message processing: with no enrichment client,
/// or when the service fails or replies with garbage, the deterministic
/// fallback is used instead.
pub struct MessageClassifier {
    enrichment: Option<Arc<EnrichmentClient>>,
}

impl MessageClassifier {
    pub fn new(enrichment: Option<Arc<EnrichmentClient>>) -> Self {
        Self { enrichment }
    }

    pub async fn classify(
        &self,
        text: &str,
        sender: &str,
        sent_at: DateTime<Utc>,
    ) -> MessageAnalysisRecord {
        if let Some(client) = &self.enrichment {
            if let Some(analysis) = client.analyze_message(text, sender).await {
                return MessageAnalysisRecord {
                    sender: sender.to_string(),
                    original_text: text.to_string(),
                    sent_at,
                    summary: analysis
                        .summary
                        .filter(|s| !s.trim().is_empty())
                        .unwrap_or_else(|| fallback_summary(text)),
                    sentiment: Sentiment::parse(analysis.sentiment.as_deref().unwrap_or("")),
                    topics: analysis.topics,
                    importance: Importance::parse(analysis.importance.as_deref().unwrap_or("")),
                    message_type: analysis
                        .message_type
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| "other".to_string()),
                    enrichment_provider: Some(client.provider_name().to_string()),
                };
            }
        }

        Self::fallback(text, sender, sent_at)
    }

    fn fallback(text: &str, sender: &str, sent_at: DateTime<Utc>) -> MessageAnalysisRecord {
        MessageAnalysisRecord {
            sender: sender.to_string(),
            original_text: text.to_string(),
            sent_at,
            summary: fallback_summary(text),
            sentiment: Sentiment::Neutral,
            topics: Vec::new(),
            importance: Importance::Medium,
            message_type: "other".to_string(),
            enrichment_provider: None,
        }
    }
}

fn fallback_summary(text: &str) -> String {
    if text.chars().count() > MAX_FALLBACK_SUMMARY {
        let cut: String = text.chars().take(MAX_FALLBACK_SUMMARY).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
