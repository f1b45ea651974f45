use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::{ChatConnector, ChatTarget};
use crate::error::{AppError, Result};
use crate::models::RawMessage;

const API_BASE: &str = "https://api.telegram.org";
const POLL_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
    first_name: Option<String>,
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct Message {
    date: i64,
    text: Option<String>,
    chat: Chat,
    from: Option<User>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

/// Which incoming chats the connector forwards to the pipeline.
enum Monitored {
    /// Private chats, reported under the "me" chat key.
    SavedMessages,
    Chat(i64),
}

/// Chat connector backed by the Telegram Bot API, using `getUpdates` long
/// polling for live messages.
///
/// The Bot API exposes no history paging, so `history` is always empty here;
/// backfill over real history needs a user-API connector behind the same
/// trait.
pub struct TelegramConnector {
    client: Client,
    base_url: String,
    monitored: Option<Monitored>,
    offset: i64,
    pending: VecDeque<RawMessage>,
}

impl TelegramConnector {
    pub fn new(bot_token: &str) -> Self {
        // The request timeout must outlast the long-poll window.
        let client = Client::builder()
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: format!("{}/bot{}", API_BASE, bot_token),
            monitored: None,
            offset: 0,
            pending: VecDeque::new(),
        }
    }

    async fn api_call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .json(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::TelegramApi(format!(
                "{} failed: {}",
                method, error_text
            )));
        }

        let parsed: ApiResponse<T> = response.json().await?;
        if !parsed.ok {
            return Err(AppError::TelegramApi(format!(
                "{} failed: {}",
                method,
                parsed.description.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        parsed
            .result
            .ok_or_else(|| AppError::TelegramApi(format!("{} returned no result", method)))
    }

    fn accepts(&self, message: &Message) -> bool {
        match &self.monitored {
            Some(Monitored::SavedMessages) => message.chat.kind == "private",
            Some(Monitored::Chat(id)) => message.chat.id == *id,
            None => false,
        }
    }

    fn chat_key(&self, message: &Message) -> String {
        match &self.monitored {
            Some(Monitored::SavedMessages) => "me".to_string(),
            _ => message.chat.id.to_string(),
        }
    }

    fn to_raw(&self, message: Message) -> RawMessage {
        let sender = message
            .from
            .as_ref()
            .and_then(|u| u.first_name.clone().or_else(|| u.username.clone()))
            .unwrap_or_else(|| "Unknown".to_string());
        let sent_at = DateTime::<Utc>::from_timestamp(message.date, 0).unwrap_or_else(Utc::now);

        RawMessage {
            chat_key: self.chat_key(&message),
            sender,
            text: message.text.clone().unwrap_or_default(),
            sent_at,
        }
    }

    async fn poll_updates(&mut self) -> Result<()> {
        let params = serde_json::json!({
            "offset": self.offset,
            "timeout": POLL_TIMEOUT_SECS,
            "allowed_updates": ["message"],
        });

        let updates: Vec<Update> = self.api_call("getUpdates", &params).await?;

        for update in updates {
            self.offset = self.offset.max(update.update_id + 1);
            let Some(message) = update.message else {
                continue;
            };
            if !self.accepts(&message) {
                tracing::debug!("Ignoring message from unmonitored chat {}", message.chat.id);
                continue;
            }
            let raw = self.to_raw(message);
            self.pending.push_back(raw);
        }

        Ok(())
    }
}

#[async_trait]
impl ChatConnector for TelegramConnector {
    async fn resolve_chat(&mut self, target: &ChatTarget) -> Result<String> {
        match target {
            ChatTarget::SavedMessages => {
                // Validates the token; private chats are forwarded as "me".
                let me: User = self.api_call("getMe", &serde_json::json!({})).await?;
                tracing::info!(
                    "Connected as {} (id {})",
                    me.first_name.or(me.username).unwrap_or_default(),
                    me.id
                );
                self.monitored = Some(Monitored::SavedMessages);
                Ok("me".to_string())
            }
            ChatTarget::Id(id) => {
                let chat: Chat = self
                    .api_call("getChat", &serde_json::json!({ "chat_id": id }))
                    .await?;
                tracing::info!("Monitoring chat {} ({})", chat.id, chat.kind);
                self.monitored = Some(Monitored::Chat(chat.id));
                Ok(chat.id.to_string())
            }
        }
    }

    async fn history(&self, chat_key: &str, _limit: usize) -> Result<Vec<RawMessage>> {
        tracing::warn!(
            "The Bot API cannot page history for chat {}; backfill will only see live messages",
            chat_key
        );
        Ok(Vec::new())
    }

    async fn next_message(&mut self) -> Result<Option<RawMessage>> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Ok(Some(message));
            }
            self.poll_updates().await?;
        }
    }
}
