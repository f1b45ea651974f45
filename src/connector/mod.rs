mod telegram;

pub use telegram::TelegramConnector;

use std::str::FromStr;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::RawMessage;

/// Which chat the agent monitors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatTarget {
    /// The current user's private log ("me").
    SavedMessages,
    /// A specific chat by numeric id.
    Id(i64),
}

impl FromStr for ChatTarget {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("me") {
            return Ok(ChatTarget::SavedMessages);
        }
        trimmed
            .parse::<i64>()
            .map(ChatTarget::Id)
            .map_err(|_| AppError::Config(format!("Invalid chat id: {:?}", s)))
    }
}

/// Boundary to the chat platform. Everything the pipeline consumes arrives
/// through this trait, already normalized into [`RawMessage`].
#[async_trait]
pub trait ChatConnector {
    /// Resolves the configured target into the chat key used for checkpoint
    /// scoping. Failure here is fatal at startup.
    async fn resolve_chat(&mut self, target: &ChatTarget) -> Result<String>;

    /// Pages chat history, newest first, up to `limit` messages.
    async fn history(&self, chat_key: &str, limit: usize) -> Result<Vec<RawMessage>>;

    /// Waits for the next live message. `None` means the stream has ended.
    async fn next_message(&mut self) -> Result<Option<RawMessage>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_me_and_numeric_ids() {
        assert_eq!("me".parse::<ChatTarget>().unwrap(), ChatTarget::SavedMessages);
        assert_eq!("ME".parse::<ChatTarget>().unwrap(), ChatTarget::SavedMessages);
        assert_eq!(
            "-1004871136090".parse::<ChatTarget>().unwrap(),
            ChatTarget::Id(-1004871136090)
        );
    }

    #[test]
    fn rejects_garbage_targets() {
        assert!("my-group".parse::<ChatTarget>().is_err());
        assert!("".parse::<ChatTarget>().is_err());
    }
}
