use std::collections::BTreeMap;

use crate::models::{ExtractionOutcome, Publication};

/// Prints a summary of the publication store to stdout (`--report` mode).
pub fn print_report(records: &[Publication]) {
    if records.is_empty() {
        println!("No publications in database yet. Run the agent first.");
        return;
    }

    let mut articles = 0usize;
    let mut analyses = 0usize;
    let mut failed = 0usize;
    let mut enriched = 0usize;
    let mut by_sender: BTreeMap<&str, usize> = BTreeMap::new();

    for record in records {
        match record {
            Publication::Article(a) => {
                articles += 1;
                if a.extraction_outcome != ExtractionOutcome::Ok {
                    failed += 1;
                }
                if a.enrichment.is_some() {
                    enriched += 1;
                }
                *by_sender.entry(a.sender.as_str()).or_default() += 1;
            }
            Publication::MessageAnalysis(m) => {
                analyses += 1;
                *by_sender.entry(m.sender.as_str()).or_default() += 1;
            }
        }
    }

    println!("Publications: {} total", records.len());
    println!(
        "  {} articles ({} failed extraction, {} AI-enriched)",
        articles, failed, enriched
    );
    println!("  {} message analyses", analyses);

    let mut senders: Vec<_> = by_sender.into_iter().collect();
    senders.sort_by(|a, b| b.1.cmp(&a.1));
    println!("\nTop senders:");
    for (sender, count) in senders.iter().take(5) {
        println!("  {:<20} {}", sender, count);
    }

    println!("\nMost recent:");
    for record in records.iter().rev().take(5) {
        match record {
            Publication::Article(a) => {
                println!("  [article]  {} - {}", a.title, a.url);
            }
            Publication::MessageAnalysis(m) => {
                println!("  [analysis] {} - {}", m.sender, m.summary);
            }
        }
    }
}
