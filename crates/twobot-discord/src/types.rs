//! Discord REST payloads.

use serde::{Deserialize, Serialize};
use twobot_core::{message::Message, snowflake::Snowflake};

#[derive(Debug, Deserialize)]
pub(crate) struct DcMessage {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    pub author: DcUser,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub mention_everyone: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DcUser {
    pub id: Snowflake,
    pub username: String,
}

impl From<DcMessage> for Message {
    fn from(dc: DcMessage) -> Self {
        Self {
            id: dc.id,
            channel_id: dc.channel_id,
            author_id: dc.author.id,
            author_name: dc.author.username,
            content: dc.content,
            mentions_everyone: dc.mention_everyone,
        }
    }
}

/// Body of a `429` response.
#[derive(Debug, Deserialize)]
pub(crate) struct DcRateLimit {
    /// Seconds to wait, fractional.
    pub retry_after: f64,
    #[serde(default)]
    pub global: bool,
}

/// Body of other error responses.
#[derive(Debug, Deserialize)]
pub(crate) struct DcError {
    #[serde(default)]
    pub code: u64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct DcBulkDelete<'a> {
    pub messages: &'a [Snowflake],
}

#[derive(Debug, Serialize)]
pub(crate) struct DcCreateMessage<'a> {
    pub content: &'a str,
}

/// The part of a created message we keep.
#[derive(Debug, Deserialize)]
pub(crate) struct DcCreated {
    pub id: Snowflake,
}
