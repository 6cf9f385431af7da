mod defaults;


use serde::{de, Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::error::BotError;
use crate::snowflake::Snowflake;
use defaults::*;

/// Environment variable consulted when `discord.token` is empty.
pub const TOKEN_ENV: &str = "DISCORD_BOT_TOKEN";

/// Top-level twobot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub purge: PurgeConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Global command prefix, used when a guild has none.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Bot owner. Allowed to run moderation commands everywhere.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub owner_id: Option<Snowflake>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            prefix: default_prefix(),
            owner_id: None,
        }
    }
}

/// Discord REST settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// How many times a rate-limited request is retried before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: default_api_base(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Purge limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeConfig {
    /// Largest count a single purge may request.
    #[serde(default = "default_max_count")]
    pub max_count: usize,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            max_count: default_max_count(),
        }
    }
}

/// Settings store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Server settings file, relative to `bot.data_dir` unless absolute.
    #[serde(default = "default_servers_path")]
    pub servers_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            servers_path: default_servers_path(),
        }
    }
}

impl Config {
    /// Resolved path of the server settings file.
    pub fn servers_file(&self) -> PathBuf {
        let path = Path::new(&self.store.servers_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&shellexpand(&self.bot.data_dir)).join(path)
        }
    }

    /// Directory for log files.
    pub fn log_dir(&self) -> PathBuf {
        Path::new(&shellexpand(&self.bot.data_dir)).join("logs")
    }
}

/// Treat `owner_id = ""` as unset.
fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Snowflake>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Id(Snowflake),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Id(id)) => Ok(Some(id)),
        Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Raw::Text(text)) => Err(de::Error::custom(format!("invalid owner_id {text:?}"))),
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist. An empty Discord token
/// is filled from `DISCORD_BOT_TOKEN`.
pub fn load(path: &str) -> Result<Config, BotError> {
    let path = Path::new(path);
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BotError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        parse(&content)?
    } else {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        Config::default()
    };

    if config.discord.token.is_empty() {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            config.discord.token = token;
        }
    }

    Ok(config)
}

/// Parse configuration from TOML text.
pub fn parse(content: &str) -> Result<Config, BotError> {
    toml::from_str(content).map_err(|e| BotError::Config(format!("failed to parse config: {}", e)))
}
