//! Discord REST transport.
//!
//! Implements [`MessageApi`](twobot_core::traits::MessageApi) over the
//! channel message endpoints and retries rate-limited calls.
//! Docs: <https://discord.com/developers/docs/resources/message>

mod rest;
mod types;


use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use std::time::Duration;
use twobot_core::{config::DiscordConfig, error::BotError};

/// Discord requires bot user agents in this form.
const BOT_USER_AGENT: &str = concat!(
    "DiscordBot (https://github.com/twobot/twobot, ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Discord REST client authenticated as a bot.
pub struct DiscordClient {
    client: reqwest::Client,
    api_base: String,
    max_retries: u32,
    /// First backoff step when a 429 carries no `retry_after`.
    backoff_base: Duration,
}

impl DiscordClient {
    /// Create a client from config. Fails on an empty or malformed token.
    pub fn new(config: &DiscordConfig) -> Result<Self, BotError> {
        if config.token.trim().is_empty() {
            return Err(BotError::Config("discord.token is empty".into()));
        }
        let mut auth = HeaderValue::from_str(&format!("Bot {}", config.token.trim()))
            .map_err(|e| BotError::Config(format!("invalid discord token: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(USER_AGENT, HeaderValue::from_static(BOT_USER_AGENT));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BotError::Platform(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            backoff_base: Duration::from_secs(1),
        })
    }

    /// Override the first backoff step.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }
}
