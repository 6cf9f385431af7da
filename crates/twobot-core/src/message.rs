use crate::snowflake::Snowflake;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message as seen by the purge engine.
///
/// Fetched fresh for every purge and never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    /// Platform-specific user ID of the author.
    pub author_id: Snowflake,
    /// Author's display name (username).
    pub author_name: String,
    /// Message text content.
    #[serde(default)]
    pub content: String,
    /// Whether the message pings `@everyone`.
    #[serde(default)]
    pub mentions_everyone: bool,
}

impl Message {
    /// Creation time, decoded from the id.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.id.created_at()
    }
}
