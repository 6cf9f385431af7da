//! The `purge` command.

use super::{can_moderate, parse_purge_args, CommandContext, Invocation, Reply};
use std::time::Duration;
use tracing::{debug, info, warn};
use twobot_core::server::ServerSettings;
use twobot_purge::{PurgeError, PurgeRequest, PurgeResult, StopReason};

/// How long a successful purge's confirmation stays in the channel.
pub const CONFIRMATION_TTL: Duration = Duration::from_secs(5);

pub(super) async fn handle_purge(
    ctx: &CommandContext<'_>,
    inv: Invocation<'_>,
    args: &str,
    settings: &ServerSettings,
) -> Reply {
    if !can_moderate(ctx.config, settings, inv.invoker) {
        info!(
            "refused purge by {} in guild {}: not a moderator",
            inv.invoker, inv.guild_id
        );
        return Reply::new("Sorry, you need to be a moderator to purge messages");
    }

    let outcome = run(ctx, inv, args).await;
    let succeeded = outcome.is_ok();
    let text = render(outcome);
    if succeeded {
        Reply::transient(text, CONFIRMATION_TTL)
    } else {
        Reply::new(text)
    }
}

async fn run(
    ctx: &CommandContext<'_>,
    inv: Invocation<'_>,
    args: &str,
) -> Result<PurgeResult, PurgeError> {
    let parsed = parse_purge_args(args, ctx.config.purge.max_count)?;
    let request = PurgeRequest::new(inv.channel_id, parsed.count, parsed.mode, inv.invoker)?;

    // The command message goes first so it never counts toward the request.
    if let Some(id) = inv.message_id {
        if let Err(e) = ctx.messages.bulk_delete(inv.channel_id, &[id]).await {
            warn!("failed to delete purge command {id} in {}: {e}", inv.channel_id);
        }
    }

    if ctx.locks.is_locked(inv.channel_id).await {
        debug!("purge in {} waiting for the running one", inv.channel_id);
    }
    let _guard = ctx.locks.lock(inv.channel_id).await;
    ctx.engine.purge(&request, ctx.cancel).await
}

/// Reply text for a finished purge.
pub fn render(outcome: Result<PurgeResult, PurgeError>) -> String {
    match outcome {
        Ok(result) => {
            let noun = if result.deleted == 1 {
                "message"
            } else {
                "messages"
            };
            match result.stop {
                StopReason::RequestSatisfied => {
                    format!("Deleted {} {noun} :ok_hand:", result.deleted)
                }
                StopReason::ExhaustedChannel => format!(
                    "Deleted {} {noun}, there was nothing older to delete",
                    result.deleted
                ),
                StopReason::AgeLimitReached => format!(
                    "Deleted {} {noun}, the rest are older than 14 days and can't be bulk deleted",
                    result.deleted
                ),
            }
        }
        Err(PurgeError::Input(message)) => message,
        Err(e @ PurgeError::Compile(_)) => {
            format!("Something went wrong with constructing your expression: {e}")
        }
        Err(e) => match e.deleted() {
            0 => format!("Error purging messages: {e}"),
            n => format!("Error purging messages: {e} ({n} already deleted)"),
        },
    }
}
