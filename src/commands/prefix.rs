//! Command prefixes: resolution per guild and the `setPrefix` and
//! `globalPrefix` commands.

use super::{can_configure, is_bot_owner, CommandContext, Invocation};
use tracing::{info, warn};
use twobot_core::server::ServerSettings;

/// Prefixes that trigger commands, in the order they are tried.
///
/// A non-empty guild prefix comes first. The global prefix is always accepted
/// too, unless it is empty. With both empty no prefix is accepted, so the
/// bot never treats plain chat as a command.
pub fn command_prefixes<'a>(guild: &'a str, global: &'a str) -> Vec<&'a str> {
    let mut prefixes = Vec::with_capacity(2);
    if !guild.is_empty() {
        prefixes.push(guild);
    }
    if !global.is_empty() && global != guild {
        prefixes.push(global);
    }
    prefixes
}

/// Strip the first matching prefix from `text`.
pub fn strip_command_prefix<'a>(text: &'a str, guild: &str, global: &str) -> Option<&'a str> {
    command_prefixes(guild, global)
        .into_iter()
        .find_map(|prefix| text.strip_prefix(prefix))
}

/// Parse a `setPrefix` argument: `<prefix>` or `<prefix> | <true|false>`.
///
/// `true` appends a trailing space, so `! | true` yields `"! "`. Returns
/// `None` for an empty prefix or more than one `|`.
pub fn parse_prefix_value(arg: &str) -> Option<String> {
    let parts: Vec<&str> = arg.split('|').map(str::trim).collect();
    let (prefix, spaced) = match parts.as_slice() {
        [prefix] => (*prefix, false),
        [prefix, flag] => (*prefix, flag.eq_ignore_ascii_case("true")),
        _ => return None,
    };
    if prefix.is_empty() {
        return None;
    }
    Some(if spaced {
        format!("{prefix} ")
    } else {
        prefix.to_string()
    })
}

pub(super) async fn handle_set_prefix(
    ctx: &CommandContext<'_>,
    inv: Invocation<'_>,
    args: &str,
    mut settings: ServerSettings,
    global: &str,
) -> String {
    if args.is_empty() {
        let current = command_prefixes(&settings.prefix, global)
            .first()
            .map(|p| format!("`{p}`"))
            .unwrap_or_else(|| "not set".to_string());
        return format!("Current prefix: {current}");
    }

    if !can_configure(ctx.config, &settings, inv.invoker) {
        return "Sorry, only the owner can do this".to_string();
    }

    let Some(prefix) = parse_prefix_value(args) else {
        return "No prefix given :/".to_string();
    };
    let trailing = if prefix.ends_with(' ') {
        "with"
    } else {
        "without"
    };

    settings.prefix = prefix;
    let shown = settings.prefix.clone();
    if let Err(e) = ctx.repo.set(inv.guild_id, settings).await {
        warn!("failed to store prefix for guild {}: {e}", inv.guild_id);
        return "There was a problem changing the prefix :( Try again please~".to_string();
    }
    if let Err(e) = ctx.repo.persist().await {
        warn!("failed to persist server settings: {e}");
        return "There was a problem changing the prefix :( Try again please~".to_string();
    }

    info!(
        "prefix for guild {} set to {shown:?} by {}",
        inv.guild_id, inv.invoker
    );
    format!("Prefix changed to `{shown}` {trailing} a trailing space")
}

/// Show the global prefix, or replace it when the bot owner gives one.
pub(super) async fn handle_global_prefix(
    ctx: &CommandContext<'_>,
    inv: Invocation<'_>,
    args: &str,
    global: &str,
) -> String {
    if args.is_empty() {
        return if global.is_empty() {
            "Global prefix: not set".to_string()
        } else {
            format!("Global prefix: `{global}`")
        };
    }

    if !is_bot_owner(ctx.config, inv.invoker) {
        return "Sorry, only the owner can do this".to_string();
    }

    let Some(prefix) = parse_prefix_value(args) else {
        return "No prefix given :/".to_string();
    };
    let trailing = if prefix.ends_with(' ') {
        "with"
    } else {
        "without"
    };

    let shown = prefix.clone();
    if let Err(e) = ctx.repo.set_global_prefix(prefix).await {
        warn!("failed to store global prefix: {e}");
        return "There was a problem changing the prefix :( Try again please~".to_string();
    }
    if let Err(e) = ctx.repo.persist().await {
        warn!("failed to persist global prefix: {e}");
        return "There was a problem changing the prefix :( Try again please~".to_string();
    }

    info!("global prefix set to {shown:?} by {}", inv.invoker);
    format!(":ok_hand: | All done! Global prefix changed to `{shown}` {trailing} a trailing space")
}
