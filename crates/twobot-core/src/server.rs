use crate::snowflake::Snowflake;
use serde::{Deserialize, Serialize};

/// Settings kept for one guild.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Guild-specific command prefix. Empty = use the global prefix.
    #[serde(default, rename = "server_prefix")]
    pub prefix: String,
    /// Guild owner, always allowed to run moderation commands.
    #[serde(default)]
    pub owner_id: Option<Snowflake>,
    /// Extra users allowed to purge.
    #[serde(default)]
    pub moderators: Vec<Snowflake>,
    /// Channel that receives moderation logs.
    #[serde(default)]
    pub log_channel: Option<Snowflake>,
    /// Whether the bot was removed from the guild.
    #[serde(default)]
    pub kicked: bool,
}

impl ServerSettings {
    /// Whether `user` may run moderation commands in this guild.
    pub fn is_moderator(&self, user: Snowflake) -> bool {
        self.owner_id == Some(user) || self.moderators.contains(&user)
    }
}
