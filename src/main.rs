use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use newswatch::ai::EnrichmentClient;
use newswatch::config::Config;
use newswatch::connector::{ChatConnector, ChatTarget, TelegramConnector};
use newswatch::error::{AppError, Result};
use newswatch::export;
use newswatch::pipeline::{BackfillScanner, IngestionCoordinator};
use newswatch::services::{ArticleResolver, MessageClassifier};
use newswatch::store::{CheckpointStore, PublicationStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let config = Config::load()?;
    config.ensure_directories()?;

    let mut coordinator = build_coordinator(&config);

    // One-shot modes
    if args.iter().any(|a| a == "--report") {
        export::print_report(coordinator.publications().records());
        return Ok(());
    }
    if let Some(pos) = args.iter().position(|a| a == "--reset") {
        match args.get(pos + 1) {
            Some(chat) => {
                let removed = coordinator.reset_checkpoint(chat)?;
                println!(
                    "{}",
                    if removed {
                        format!("Checkpoint reset for chat {}", chat)
                    } else {
                        format!("No checkpoint found for chat {}", chat)
                    }
                );
            }
            None => {
                coordinator.reset_all_checkpoints()?;
                println!("All checkpoints reset");
            }
        }
        return Ok(());
    }
    let backfill_only = args.iter().any(|a| a == "--backfill");

    let target: ChatTarget = config.chat_id.parse()?;
    let token = config
        .telegram_bot_token
        .as_deref()
        .ok_or_else(|| AppError::Config("telegram_bot_token is not configured".to_string()))?;

    let mut connector = TelegramConnector::new(token);
    let chat_key = connector.resolve_chat(&target).await?;

    print_banner(&config, &coordinator, &chat_key);

    let scanner = BackfillScanner::new(config.history_limit);
    let processed = scanner.scan(&mut coordinator, &connector, &chat_key).await?;
    tracing::info!("Backfill finished, {} message(s) processed", processed);

    if backfill_only {
        return Ok(());
    }

    tracing::info!("Listening for new messages (Ctrl+C to stop)");
    run_live(&mut coordinator, &mut connector).await
}

fn build_coordinator(config: &Config) -> IngestionCoordinator {
    let enrichment = EnrichmentClient::from_keys(
        config.openai_api_key.clone(),
        config.anthropic_api_key.clone(),
        &config.llm_provider,
    )
    .map(Arc::new);

    match &enrichment {
        Some(client) => tracing::info!("Using {} for enrichment", client.provider_name()),
        None => tracing::info!("No enrichment provider available, using basic extraction only"),
    }

    let checkpoints = CheckpointStore::open(&PathBuf::from(&config.data_dir));
    let publications = PublicationStore::open(&PathBuf::from(&config.publications_dir));
    let resolver = ArticleResolver::new(enrichment.clone());
    let classifier = MessageClassifier::new(enrichment);
    let documents_dir = config
        .write_documents
        .then(|| PathBuf::from(&config.publications_dir));

    IngestionCoordinator::new(checkpoints, publications, resolver, classifier, documents_dir)
}

fn print_banner(config: &Config, coordinator: &IngestionCoordinator, chat_key: &str) {
    tracing::info!("Monitoring chat: {}", chat_key);
    tracing::info!("Publications stored: {}", coordinator.publications().len());

    let summary = coordinator.checkpoint_summary();
    if summary.is_empty() {
        tracing::info!("No previous checks recorded");
    } else {
        for (chat, last_check) in summary {
            let chat_display = if chat == "me" {
                "Saved Messages".to_string()
            } else {
                format!("Chat {}", chat)
            };
            tracing::info!("Last check for {}: {}", chat_display, last_check);
        }
    }

    if config.write_documents {
        tracing::info!("Article documents will be written to {}", config.publications_dir);
    }
}

/// Steady-state loop. The Ctrl+C check sits between messages, so an
/// in-flight message always finishes its batch and checkpoint update before
/// shutdown, and one bad message never stops the stream.
async fn run_live<C: ChatConnector>(
    coordinator: &mut IngestionCoordinator,
    connector: &mut C,
) -> Result<()> {
    loop {
        let message = tokio::select! {
            result = connector.next_message() => match result {
                Ok(Some(message)) => message,
                Ok(None) => {
                    tracing::info!("Message stream ended");
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!("Connector error: {}", e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopped by user");
                return Ok(());
            }
        };

        tracing::info!(
            "New message from {} at {}",
            message.sender,
            message.sent_at
        );
        if let Err(e) = coordinator.process(&message).await {
            tracing::error!(
                "Failed to process message from {} at {}: {}",
                message.sender,
                message.sent_at,
                e
            );
        }
    }
}
