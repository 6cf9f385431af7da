//! Chat commands: prefix resolution, permission checks and dispatch.

mod args;
mod locks;
mod prefix;
mod purge;


pub use args::{parse_mention, parse_purge_args, PurgeArgs};
pub use locks::ChannelLocks;
pub use prefix::{command_prefixes, parse_prefix_value, strip_command_prefix};
pub use purge::{render, CONFIRMATION_TTL};

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use twobot_core::{
    config::Config,
    server::ServerSettings,
    snowflake::Snowflake,
    traits::{MessageApi, ServerRepository},
};
use twobot_purge::PurgeEngine;

/// Shared services a command runs against.
pub struct CommandContext<'a> {
    pub repo: &'a dyn ServerRepository,
    /// Used for housekeeping deletes outside a purge, like the command line itself.
    pub messages: &'a dyn MessageApi,
    pub engine: &'a PurgeEngine,
    pub locks: &'a ChannelLocks,
    pub config: &'a Config,
    pub cancel: &'a CancellationToken,
}

/// One chat line addressed to the bot.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub guild_id: Snowflake,
    pub channel_id: Snowflake,
    pub invoker: Snowflake,
    /// Id of the chat message carrying the command, when it exists.
    pub message_id: Option<Snowflake>,
    pub text: &'a str,
}

/// Text sent back for a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Delete the posted reply after this long.
    pub expires_after: Option<Duration>,
}

impl Reply {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            expires_after: None,
        }
    }

    /// A reply that cleans itself up after `ttl`.
    pub fn transient(text: impl Into<String>, ttl: Duration) -> Self {
        Self {
            text: text.into(),
            expires_after: Some(ttl),
        }
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// Known bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Purge,
    SetPrefix,
    GlobalPrefix,
    Help,
}

impl Command {
    /// Parse the command word of a prefix-stripped line. Case-insensitive.
    pub fn parse(body: &str) -> Option<Self> {
        let first = body.split_whitespace().next()?;
        match first.to_ascii_lowercase().as_str() {
            "purge" => Some(Self::Purge),
            "setprefix" | "prefix" => Some(Self::SetPrefix),
            "globalprefix" => Some(Self::GlobalPrefix),
            "help" => Some(Self::Help),
            _ => None,
        }
    }
}

/// Text after the command word, with its original spacing.
fn arguments(body: &str) -> &str {
    let body = body.trim_start();
    body.split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .unwrap_or("")
}

/// Whether `user` may purge in a guild: the bot owner, the guild owner or a moderator.
pub fn can_moderate(config: &Config, settings: &ServerSettings, user: Snowflake) -> bool {
    config.bot.owner_id == Some(user) || settings.is_moderator(user)
}

/// Whether `user` may change a guild's prefix: the bot owner or the guild owner.
pub fn can_configure(config: &Config, settings: &ServerSettings, user: Snowflake) -> bool {
    config.bot.owner_id == Some(user) || settings.owner_id == Some(user)
}

/// Whether `user` may change the global prefix: the bot owner only.
pub fn is_bot_owner(config: &Config, user: Snowflake) -> bool {
    config.bot.owner_id == Some(user)
}

/// The global prefix in effect: the stored override, else the configured one.
pub async fn effective_global_prefix(repo: &dyn ServerRepository, config: &Config) -> String {
    match repo.global_prefix().await {
        Ok(Some(prefix)) => prefix,
        Ok(None) => config.bot.prefix.clone(),
        Err(e) => {
            warn!("failed to load global prefix, using configured one: {e}");
            config.bot.prefix.clone()
        }
    }
}

/// Route a chat line to its command.
///
/// Returns `None` when the line carries no recognised prefix and command, or
/// the bot has been removed from the guild.
pub async fn dispatch(ctx: &CommandContext<'_>, inv: Invocation<'_>) -> Option<Reply> {
    let settings = match ctx.repo.get(inv.guild_id).await {
        Ok(settings) => settings.unwrap_or_default(),
        Err(e) => {
            warn!("failed to load settings for guild {}: {e}", inv.guild_id);
            return Some(Reply::new(format!("Error: {e}")));
        }
    };
    if settings.kicked {
        debug!("ignoring command in kicked guild {}", inv.guild_id);
        return None;
    }

    let global = effective_global_prefix(ctx.repo, ctx.config).await;
    let body = strip_command_prefix(inv.text, &settings.prefix, &global)?;
    let cmd = Command::parse(body)?;
    Some(handle(cmd, ctx, inv, arguments(body), settings, &global).await)
}

/// Run a parsed command and return its reply.
pub async fn handle(
    cmd: Command,
    ctx: &CommandContext<'_>,
    inv: Invocation<'_>,
    args: &str,
    settings: ServerSettings,
    global: &str,
) -> Reply {
    match cmd {
        Command::Purge => purge::handle_purge(ctx, inv, args, &settings).await,
        Command::SetPrefix => prefix::handle_set_prefix(ctx, inv, args, settings, global)
            .await
            .into(),
        Command::GlobalPrefix => prefix::handle_global_prefix(ctx, inv, args, global)
            .await
            .into(),
        Command::Help => handle_help(&settings, global).into(),
    }
}

fn handle_help(settings: &ServerSettings, global: &str) -> String {
    let prefix = command_prefixes(&settings.prefix, global)
        .first()
        .copied()
        .unwrap_or_default()
        .to_string();
    format!(
        "Commands:\n\
         {prefix}purge <count> - delete the last <count> messages\n\
         {prefix}purge <count> @user - delete the last <count> messages by a user (up to 14 days old)\n\
         {prefix}purge <count> <expression> - delete messages matching an expression, \
         e.g. glob('*necroforger*', username) || glob('*owo*', content)\n\
         {prefix}setPrefix <prefix> [| true] - change this server's prefix, `true` adds a trailing space\n\
         {prefix}globalPrefix <prefix> [| true] - change the default prefix (bot owner only)\n\
         {prefix}help - this message"
    )
}
