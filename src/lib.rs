//! Chat-monitoring news agent: watches a chat stream for shared links,
//! extracts and optionally AI-enriches the articles behind them, analyzes
//! message text, and persists everything as structured publications.

pub mod ai;
pub mod config;
pub mod connector;
pub mod error;
pub mod export;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod store;
