use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::ai::EnrichmentClient;
use crate::error::Result;
use crate::models::{ArticleRecord, Enrichment, ExtractionOutcome};

const USER_AGENT_STRING: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

const MAX_TITLE_LEN: usize = 200;
const MAX_SUMMARY_LEN: usize = 500;

// Distinguish legitimate absence on a parsed page from extraction failure.
const NO_TITLE: &str = "No title available";
const NO_SUMMARY: &str = "No summary available";
const UNKNOWN_AUTHOR: &str = "Unknown Author";
const NO_IMAGE: &str = "unavailable";

const FAILED_TITLE: &str = "Could not extract title";
const FAILED_SUMMARY: &str = "Could not extract summary";

struct CascadeFields {
    title: Option<String>,
    summary: Option<String>,
    author: Option<String>,
    image: Option<String>,
}

/// Resolves one URL into an [`ArticleRecord`].
///
/// Never fails outward: a fetch or parse problem yields a placeholder record
/// with `extraction_outcome = fetch_error`, because a partial record is
/// strictly better than losing the URL.
pub struct ArticleResolver {
    client: Client,
    enrichment: Option<Arc<EnrichmentClient>>,
}

impl ArticleResolver {
    pub fn new(enrichment: Option<Arc<EnrichmentClient>>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, enrichment }
    }

    pub async fn resolve(&self, url: &str, sender: &str) -> ArticleRecord {
        let response = match self.fetch(url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", url, e);
                return Self::failure_record(url, sender, ExtractionOutcome::FetchError);
            }
        };
        let html = match response.text().await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Could not decode body of {}: {}", url, e);
                return Self::failure_record(url, sender, ExtractionOutcome::ParseError);
            }
        };

        // Parsing is confined here so the DOM is dropped before any await.
        let fields = extract_fields(&html, url);

        let mut record = ArticleRecord {
            url: url.to_string(),
            title: truncate(&fields.title.unwrap_or_else(|| NO_TITLE.to_string()), MAX_TITLE_LEN),
            summary: truncate(
                &fields.summary.unwrap_or_else(|| NO_SUMMARY.to_string()),
                MAX_SUMMARY_LEN,
            ),
            author: fields.author.unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            image: fields.image.unwrap_or_else(|| NO_IMAGE.to_string()),
            sender: sender.to_string(),
            extracted_at: Utc::now(),
            extraction_outcome: ExtractionOutcome::Ok,
            enrichment: None,
        };

        if let Some(client) = &self.enrichment {
            if let Some(enhanced) = client.enhance_article(url, &html, &record).await {
                if let Some(title) = enhanced.title.filter(|t| !t.trim().is_empty()) {
                    record.title = truncate(&title, MAX_TITLE_LEN);
                }
                if let Some(summary) = enhanced.summary.filter(|s| !s.trim().is_empty()) {
                    record.summary = truncate(&summary, MAX_SUMMARY_LEN);
                }
                if let Some(author) = enhanced.author.filter(|a| !a.trim().is_empty()) {
                    record.author = author;
                }
                record.enrichment = Some(Enrichment {
                    provider: client.provider_name().to_string(),
                    category: enhanced.category.unwrap_or_else(|| "Unknown".to_string()),
                    key_points: enhanced.key_points,
                    confidence: enhanced.confidence.unwrap_or_else(|| "medium".to_string()),
                    article_type: enhanced.article_type.unwrap_or_else(|| "unknown".to_string()),
                });
            }
        }

        record
    }

    async fn fetch(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, USER_AGENT_STRING)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("HTTP {}", response.status()).into());
        }

        Ok(response)
    }

    fn failure_record(url: &str, sender: &str, outcome: ExtractionOutcome) -> ArticleRecord {
        ArticleRecord {
            url: url.to_string(),
            title: FAILED_TITLE.to_string(),
            summary: FAILED_SUMMARY.to_string(),
            author: UNKNOWN_AUTHOR.to_string(),
            image: NO_IMAGE.to_string(),
            sender: sender.to_string(),
            extracted_at: Utc::now(),
            extraction_outcome: outcome,
            enrichment: None,
        }
    }
}

fn select(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel).next().and_then(|el| {
        let value = if el.value().name() == "meta" {
            el.value().attr("content").map(str::to_string)
        } else {
            Some(el.text().collect::<String>())
        };
        value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    })
}

/// Priority cascade per field, stopping at the first non-empty match.
fn extract_fields(html: &str, page_url: &str) -> CascadeFields {
    let doc = Html::parse_document(html);

    let title = select(&doc, r#"meta[property="og:title"]"#)
        .or_else(|| select(&doc, r#"meta[name="title"]"#))
        .or_else(|| select(&doc, "title"));

    let summary = select(&doc, r#"meta[property="og:description"]"#)
        .or_else(|| select(&doc, r#"meta[name="description"]"#));

    let author = select(&doc, r#"meta[name="author"]"#)
        .or_else(|| select(&doc, r#"meta[property="article:author"]"#));

    let image = select(&doc, r#"meta[property="og:image"]"#)
        .or_else(|| select(&doc, r#"meta[name="twitter:image"]"#))
        .map(|src| absolutize(&src, page_url));

    CascadeFields {
        title,
        summary,
        author,
        image,
    }
}

/// Resolves protocol-relative and path-relative image URLs against the page.
fn absolutize(src: &str, page_url: &str) -> String {
    if src.starts_with("http://") || src.starts_with("https://") {
        return src.to_string();
    }
    if let Some(rest) = src.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    if let Ok(base) = url::Url::parse(page_url) {
        if let Ok(resolved) = base.join(src) {
            return resolved.to_string();
        }
    }
    src.to_string()
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
