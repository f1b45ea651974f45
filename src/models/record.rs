use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the article metadata was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Ok,
    FetchError,
    ParseError,
}

/// Optional LLM-provided enhancement attached to an article record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrichment {
    pub provider: String,
    pub category: String,
    pub key_points: Vec<String>,
    pub confidence: String,
    pub article_type: String,
}

/// One resolved URL, successful or not. A fetch failure still produces a
/// placeholder record so the URL is never lost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub url: String,
    pub title: String,
    pub summary: String,
    pub author: String,
    pub image: String,
    pub sender: String,
    pub extracted_at: DateTime<Utc>,
    pub extraction_outcome: ExtractionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Enrichment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
    Mixed,
}

impl Sentiment {
    /// Lenient parse for LLM output; anything unrecognized is neutral.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            "mixed" => Sentiment::Mixed,
            _ => Sentiment::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    #[default]
    Medium,
    Low,
}

impl Importance {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => Importance::High,
            "low" => Importance::Low,
            _ => Importance::Medium,
        }
    }
}

/// Analysis of one message's text, produced whether or not the message also
/// yielded article records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageAnalysisRecord {
    pub sender: String,
    pub original_text: String,
    pub sent_at: DateTime<Utc>,
    pub summary: String,
    pub sentiment: Sentiment,
    pub topics: Vec<String>,
    pub importance: Importance,
    pub message_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment_provider: Option<String>,
}

/// An entry in the publication store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Publication {
    Article(ArticleRecord),
    MessageAnalysis(MessageAnalysisRecord),
}

impl Publication {
    /// URL key for dedup; only article records carry one.
    pub fn url(&self) -> Option<&str> {
        match self {
            Publication::Article(a) => Some(&a.url),
            Publication::MessageAnalysis(_) => None,
        }
    }
}
