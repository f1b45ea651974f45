use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Numeric chat id, or "me" for the current user's Saved Messages.
    #[serde(default = "default_chat_id")]
    pub chat_id: String,

    pub telegram_bot_token: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,

    /// "openai", "anthropic", or "auto".
    #[serde(default = "default_llm_provider")]
    pub llm_provider: String,

    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_publications_dir")]
    pub publications_dir: String,

    /// How many history messages a backfill scan may page through.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Emit one formatted document per article record.
    #[serde(default = "default_write_documents")]
    pub write_documents: bool,

    /// Optional KEY=VALUE credentials file overriding the values above.
    pub credentials_file: Option<String>,
}

fn default_chat_id() -> String {
    "me".to_string()
}

fn default_llm_provider() -> String {
    "auto".to_string()
}

fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("newswatch")
}

fn default_data_dir() -> String {
    app_data_dir().join("data").to_string_lossy().to_string()
}

fn default_publications_dir() -> String {
    app_data_dir()
        .join("publications")
        .to_string_lossy()
        .to_string()
}

fn default_history_limit() -> usize {
    200
}

fn default_write_documents() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chat_id: default_chat_id(),
            telegram_bot_token: None,
            openai_api_key: None,
            anthropic_api_key: None,
            llm_provider: default_llm_provider(),
            data_dir: default_data_dir(),
            publications_dir: default_publications_dir(),
            history_limit: default_history_limit(),
            write_documents: default_write_documents(),
            credentials_file: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        if let Some(path) = config.credentials_file.clone() {
            config.apply_credentials_file(Path::new(&path));
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("newswatch")
            .join("config.toml")
    }

    /// Overlays credentials from a plain KEY=VALUE file, for setups that
    /// keep secrets out of the TOML.
    fn apply_credentials_file(&mut self, path: &Path) {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Could not read credentials file {:?}: {}", path, e);
                return;
            }
        };
        self.apply_credentials(&content);
    }

    fn apply_credentials(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() || value.starts_with("YOUR_") {
                continue;
            }
            match key.trim() {
                "TELEGRAM_BOT_TOKEN" => self.telegram_bot_token = Some(value.to_string()),
                "TELEGRAM_CHAT_ID" => self.chat_id = value.to_string(),
                "OPENAI_API_KEY" => self.openai_api_key = Some(value.to_string()),
                "ANTHROPIC_API_KEY" => self.anthropic_api_key = Some(value.to_string()),
                "LLM_PROVIDER" => self.llm_provider = value.to_string(),
                other => tracing::debug!("Ignoring unknown credentials key {}", other),
            }
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.publications_dir)?;
        Ok(())
    }
}
