mod message;
mod record;

pub use message::RawMessage;
pub use record::{
    ArticleRecord, Enrichment, ExtractionOutcome, Importance, MessageAnalysisRecord, Publication,
    Sentiment,
};
