use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::ArticleRecord;

/// Filename for the nth article document, stamped with the extraction time.
pub fn document_filename(sequence: usize, at: DateTime<Utc>) -> String {
    format!("article_{}_{}.txt", sequence, at.format("%Y%m%d_%H%M%S"))
}

/// Writes one formatted document for an article record.
///
/// The caller treats a failure here as log-and-continue: the JSON record is
/// already persisted by the time a document is written.
pub fn write_document(record: &ArticleRecord, path: &Path) -> Result<()> {
    let mut doc = String::new();

    doc.push_str(&record.title);
    doc.push('\n');
    doc.push_str(&"=".repeat(record.title.chars().count().min(80)));
    doc.push_str("\n\n");

    doc.push_str(&format!("Author:    {}\n", record.author));
    doc.push_str(&format!("Shared by: {}\n", record.sender));
    doc.push_str(&format!(
        "Extracted: {}\n",
        record.extracted_at.format("%Y-%m-%d %H:%M:%S %Z")
    ));
    doc.push_str(&format!("Source:    {}\n", record.url));
    if record.image != "unavailable" {
        doc.push_str(&format!("Image:     {}\n", record.image));
    }
    doc.push('\n');

    doc.push_str("Summary\n-------\n");
    doc.push_str(&record.summary);
    doc.push('\n');

    if let Some(enrichment) = &record.enrichment {
        doc.push_str(&format!(
            "\nAI Analysis ({}, confidence: {})\n",
            enrichment.provider, enrichment.confidence
        ));
        doc.push_str(&format!(
            "Category: {} | Type: {}\n",
            enrichment.category, enrichment.article_type
        ));
        for point in &enrichment.key_points {
            doc.push_str(&format!("  - {}\n", point));
        }
    }

    std::fs::write(path, doc)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Enrichment, ExtractionOutcome};
    use chrono::TimeZone;

    #[test]
    fn filename_includes_sequence_and_timestamp() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(document_filename(7, at), "article_7_20250314_092653.txt");
    }

    #[test]
    fn document_contains_all_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("article.txt");

        let record = ArticleRecord {
            url: "https://example.com/a".to_string(),
            title: "A Headline".to_string(),
            summary: "What happened.".to_string(),
            author: "Jane Doe".to_string(),
            image: "unavailable".to_string(),
            sender: "Alice".to_string(),
            extracted_at: Utc::now(),
            extraction_outcome: ExtractionOutcome::Ok,
            enrichment: Some(Enrichment {
                provider: "openai".to_string(),
                category: "tech".to_string(),
                key_points: vec!["First point".to_string()],
                confidence: "high".to_string(),
                article_type: "news".to_string(),
            }),
        };

        write_document(&record, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("A Headline"));
        assert!(content.contains("Jane Doe"));
        assert!(content.contains("https://example.com/a"));
        assert!(content.contains("First point"));
        assert!(!content.contains("Image:"));
    }
}
