mod client;

pub use client::{ArticleEnhancement, EnrichmentClient, MessageAnalysis};
