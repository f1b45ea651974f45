use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::ArticleRecord;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_MODEL: &str = "gpt-4o-mini";
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_MODEL: &str = "claude-3-haiku-20240307";

/// Raw HTML sent for article enhancement is capped to respect request-size
/// limits.
const HTML_BUDGET: usize = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provider {
    OpenAi,
    Anthropic,
}

impl Provider {
    fn name(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
        }
    }
}

// OpenAI chat completions

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    content: String,
}

// Anthropic messages

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    text: Option<String>,
}

/// Structured reply for article enhancement.
#[derive(Debug, Deserialize)]
pub struct ArticleEnhancement {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub confidence: Option<String>,
    #[serde(default)]
    pub article_type: Option<String>,
}

/// Structured reply for message analysis.
#[derive(Debug, Deserialize)]
pub struct MessageAnalysis {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub importance: Option<String>,
    #[serde(default)]
    pub message_type: Option<String>,
}

/// Client for the generative-text enrichment service.
///
/// Construction fails (returns `None`) when no usable credential exists, and
/// every caller falls back to deterministic extraction — enrichment is an
/// enhancer, never a requirement.
pub struct EnrichmentClient {
    client: Client,
    provider: Provider,
    api_key: String,
}

fn usable(key: &Option<String>) -> Option<&str> {
    key.as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty() && !k.starts_with("YOUR_"))
}

impl EnrichmentClient {
    /// Picks a provider from the available credentials. An explicit
    /// preference wins when its key is present; `"auto"` tries Anthropic
    /// first, then OpenAI.
    pub fn from_keys(
        openai_key: Option<String>,
        anthropic_key: Option<String>,
        preference: &str,
    ) -> Option<Self> {
        let openai = usable(&openai_key).map(str::to_string);
        let anthropic = usable(&anthropic_key).map(str::to_string);

        let (provider, api_key) = match preference {
            "openai" => (Provider::OpenAi, openai?),
            "anthropic" => (Provider::Anthropic, anthropic?),
            _ => {
                if let Some(key) = anthropic {
                    (Provider::Anthropic, key)
                } else if let Some(key) = openai {
                    (Provider::OpenAi, key)
                } else {
                    return None;
                }
            }
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Some(Self {
            client,
            provider,
            api_key,
        })
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    async fn call(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        match self.provider {
            Provider::OpenAi => self.call_openai(system_prompt, user_prompt).await,
            Provider::Anthropic => self.call_anthropic(system_prompt, user_prompt).await,
        }
    }

    async fn call_openai(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = OpenAiRequest {
            model: OPENAI_MODEL.to_string(),
            messages: vec![
                OpenAiMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                OpenAiMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            max_tokens: 1000,
            temperature: 0.3,
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::LlmApi(format!("OpenAI API error: {}", error_text)));
        }

        let parsed: OpenAiResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| AppError::LlmApi("Empty OpenAI response".to_string()))
    }

    async fn call_anthropic(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = AnthropicRequest {
            model: ANTHROPIC_MODEL.to_string(),
            max_tokens: 1000,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: user_prompt.to_string(),
            }],
            system: (!system_prompt.is_empty()).then(|| system_prompt.to_string()),
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::LlmApi(format!(
                "Anthropic API error: {}",
                error_text
            )));
        }

        let parsed: AnthropicResponse = response.json().await?;
        let text = parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");
        Ok(text.trim().to_string())
    }

    /// Asks the model to improve on cascade-extracted article fields.
    /// Returns `None` on any service or parse failure; the cascade result
    /// stands in that case.
    pub async fn enhance_article(
        &self,
        url: &str,
        raw_html: &str,
        basic: &ArticleRecord,
    ) -> Option<ArticleEnhancement> {
        let html_content = truncate_chars(raw_html, HTML_BUDGET);

        let system_prompt = "You are a professional article analyzer. Extract key information \
from web articles with high accuracy.\n\nYour task is to analyze HTML content and provide \
structured information about the article. Focus on accuracy and relevance. If information is \
not clear, indicate uncertainty.";

        let user_prompt = format!(
            r#"Analyze this article from {url}

HTML Content:
{html_content}

Current extracted data:
- Title: {title}
- Summary: {summary}
- Author: {author}

Please provide improved extraction in this exact JSON format:
{{
    "title": "Clear, descriptive article title (max 150 chars)",
    "summary": "Concise 2-3 sentence summary of main points (max 300 chars)",
    "author": "Author name or 'Unknown' if not found",
    "category": "Article category (news, tech, politics, etc.)",
    "key_points": ["Key point 1", "Key point 2", "Key point 3"],
    "confidence": "high/medium/low based on content clarity",
    "article_type": "news/opinion/analysis/blog/other"
}}

Only return the JSON, no other text."#,
            url = url,
            html_content = html_content,
            title = basic.title,
            summary = basic.summary,
            author = basic.author,
        );

        match self.call(system_prompt, &user_prompt).await {
            Ok(reply) => match serde_json::from_str(strip_json_fence(&reply)) {
                Ok(enhancement) => Some(enhancement),
                Err(e) => {
                    tracing::warn!("Enrichment reply was not valid JSON: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Article enrichment failed for {}: {}", url, e);
                None
            }
        }
    }

    /// Asks the model for a structured analysis of a message. Returns `None`
    /// on any failure; the classifier then uses its deterministic fallback.
    pub async fn analyze_message(&self, text: &str, sender: &str) -> Option<MessageAnalysis> {
        let system_prompt = "You are a message analyzer that provides concise analysis of text \
messages. Provide objective analysis focusing on content, sentiment, and key topics.";

        let user_prompt = format!(
            r#"Analyze this message from {sender}:

Message: "{text}"

Provide analysis in this exact JSON format:
{{
    "summary": "One sentence summary of the message (max 100 chars)",
    "sentiment": "positive/negative/neutral/mixed",
    "topics": ["topic1", "topic2", "topic3"],
    "importance": "high/medium/low",
    "message_type": "question/announcement/discussion/link_share/other"
}}

Only return the JSON, no other text."#,
            sender = sender,
            text = text,
        );

        match self.call(system_prompt, &user_prompt).await {
            Ok(reply) => match serde_json::from_str(strip_json_fence(&reply)) {
                Ok(analysis) => Some(analysis),
                Err(e) => {
                    tracing::warn!("Message analysis reply was not valid JSON: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Message analysis failed: {}", e);
                None
            }
        }
    }
}

/// Models sometimes wrap the requested JSON in a markdown code fence.
fn strip_json_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open.strip_suffix("```").unwrap_or(without_open).trim()
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
