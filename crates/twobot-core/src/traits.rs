use crate::{
    error::BotError,
    message::Message,
    server::ServerSettings,
    snowflake::Snowflake,
};
use async_trait::async_trait;

/// Most messages the platform returns per history page.
pub const MAX_PAGE_SIZE: usize = 100;

/// Most messages the platform accepts per bulk delete.
pub const MAX_BULK_DELETE: usize = 100;

/// Message history API.
///
/// The chat platform (or an in-memory stand-in) implements this trait so the
/// purge engine can page through a channel and delete from it.
#[async_trait]
pub trait MessageApi: Send + Sync {
    /// Fetch up to `limit` (at most [`MAX_PAGE_SIZE`]) messages, newest first.
    ///
    /// With `before` set, only messages strictly older than that id are
    /// returned. An empty page means the history is exhausted.
    async fn get_messages(
        &self,
        channel_id: Snowflake,
        limit: usize,
        before: Option<Snowflake>,
    ) -> Result<Vec<Message>, BotError>;

    /// Delete up to [`MAX_BULK_DELETE`] messages in one call.
    ///
    /// The platform rejects the whole call when any id is 14 days old or
    /// older. Ids that no longer exist must not fail the call.
    async fn bulk_delete(&self, channel_id: Snowflake, ids: &[Snowflake]) -> Result<(), BotError>;
}

/// Per-guild settings repository.
///
/// Replaces process-wide server maps: callers get and set settings through
/// this seam and decide when to flush them to durable storage.
#[async_trait]
pub trait ServerRepository: Send + Sync {
    /// Settings for a guild, if it has any.
    async fn get(&self, guild_id: Snowflake) -> Result<Option<ServerSettings>, BotError>;

    /// Insert or replace the settings for a guild.
    async fn set(&self, guild_id: Snowflake, settings: ServerSettings) -> Result<(), BotError>;

    /// Runtime override of the configured global prefix, if one was set.
    async fn global_prefix(&self) -> Result<Option<String>, BotError>;

    /// Replace the global prefix override.
    async fn set_global_prefix(&self, prefix: String) -> Result<(), BotError>;

    /// Write all settings to durable storage.
    async fn persist(&self) -> Result<(), BotError>;
}
