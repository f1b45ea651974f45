use chrono::{DateTime, Utc};

/// A single message as delivered by the chat connector.
///
/// Both the live subscription and the backfill scanner normalize into this
/// shape at the connector boundary; the pipeline never sees connector-specific
/// types. Messages are consumed and discarded, never persisted verbatim.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub chat_key: String,
    pub sender: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}
