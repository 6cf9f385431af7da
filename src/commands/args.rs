//! `purge` argument parsing.

use twobot_core::snowflake::Snowflake;
use twobot_purge::{PurgeError, PurgeMode};

/// Parsed `purge <count> [expression | @user]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeArgs {
    pub count: usize,
    pub mode: PurgeMode,
}

/// Parse the text after `purge`.
///
/// No expression means every message is eligible. A single argument shaped
/// like a user mention (`<@id>` or `<@!id>`) selects an author purge; anything
/// else is a predicate expression, kept verbatim.
pub fn parse_purge_args(args: &str, max_count: usize) -> Result<PurgeArgs, PurgeError> {
    let args = args.trim();
    if args.is_empty() {
        return Err(PurgeError::Input(
            "Gotta specify a number of messages to delete~".into(),
        ));
    }

    let (count_arg, rest) = args
        .split_once(char::is_whitespace)
        .map(|(count, rest)| (count, rest.trim()))
        .unwrap_or((args, ""));

    let count: usize = count_arg.parse().map_err(|_| {
        PurgeError::Input(format!(
            "How do I delete {} messages? Please only give numbers!",
            defuse_mentions(count_arg)
        ))
    })?;
    if count == 0 {
        return Err(PurgeError::Input(
            "Purge count must be at least 1".into(),
        ));
    }
    if count > max_count {
        return Err(PurgeError::Input(format!(
            "I can only purge up to {max_count} messages at a time"
        )));
    }

    let mode = if rest.is_empty() {
        PurgeMode::All
    } else if !rest.contains(char::is_whitespace) && rest.starts_with("<@") {
        let user = parse_mention(rest)
            .ok_or_else(|| PurgeError::Input("Couldn't find that user :(".into()))?;
        PurgeMode::Author(user)
    } else {
        PurgeMode::Predicate(rest.to_string())
    };

    Ok(PurgeArgs { count, mode })
}

/// `<@123>` or `<@!123>` to the user id.
pub fn parse_mention(arg: &str) -> Option<Snowflake> {
    let inner = arg.strip_prefix("<@")?.strip_suffix('>')?;
    let digits = inner.strip_prefix('!').unwrap_or(inner);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Break `@` so echoed input cannot ping anyone.
fn defuse_mentions(text: &str) -> String {
    text.replace('@', "@\u{200b}")
}
