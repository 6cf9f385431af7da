mod commands;

use clap::{Parser, Subcommand};
use commands::{ChannelLocks, CommandContext, Invocation};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use twobot_core::{
    config::{self, Config},
    snowflake::Snowflake,
    traits::{MessageApi, ServerRepository},
};
use twobot_discord::DiscordClient;
use twobot_purge::{PurgeEngine, PurgeMode, PurgeRequest};
use twobot_store::ServerStore;

#[derive(Parser)]
#[command(name = "twobot", version, about = "twobot: Discord moderation bot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Purge messages from a channel as the operator (no permission check).
    Purge {
        /// Channel to purge.
        #[arg(long)]
        channel: Snowflake,
        /// Only delete messages by this user.
        #[arg(long)]
        author: Option<Snowflake>,
        /// How many messages to delete.
        count: usize,
        /// Optional predicate expression.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        expr: Vec<String>,
    },
    /// Run one chat line through the command handler, as if sent in a guild.
    Exec {
        #[arg(long)]
        guild: Snowflake,
        #[arg(long)]
        channel: Snowflake,
        /// User the line is attributed to.
        #[arg(long)]
        invoker: Snowflake,
        /// Id of the chat message carrying the line; a purge deletes it first.
        #[arg(long)]
        message: Option<Snowflake>,
        /// Also post the reply to the channel.
        #[arg(long)]
        reply: bool,
        /// The message text, including its prefix.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Show or set a guild's command prefix, or the global one.
    Prefix {
        #[arg(long, conflicts_with = "global", required_unless_present = "global")]
        guild: Option<Snowflake>,
        /// Act on the global prefix instead of a guild's.
        #[arg(long)]
        global: bool,
        /// New prefix, optionally `<prefix> | true` for a trailing space.
        #[arg(trailing_var_arg = true)]
        value: Vec<String>,
    },
    /// Check configuration health.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;
    let _log_guard = init_tracing(&cfg)?;

    match cli.command {
        Commands::Purge {
            channel,
            author,
            count,
            expr,
        } => {
            let mode = match (author, expr.is_empty()) {
                (Some(_), false) => {
                    anyhow::bail!("--author and an expression cannot be combined")
                }
                (Some(user), true) => PurgeMode::Author(user),
                (None, true) => PurgeMode::All,
                (None, false) => PurgeMode::Predicate(expr.join(" ")),
            };
            if count > cfg.purge.max_count {
                anyhow::bail!(
                    "count {count} exceeds purge.max_count ({})",
                    cfg.purge.max_count
                );
            }

            let client = DiscordClient::new(&cfg.discord)?;
            let engine = PurgeEngine::new(Arc::new(client));
            let invoker = cfg.bot.owner_id.unwrap_or_default();
            let request = PurgeRequest::new(channel, count, mode, invoker)?;
            let cancel = cancel_on_ctrl_c();

            println!(
                "{}",
                commands::render(engine.purge(&request, &cancel).await)
            );
        }
        Commands::Exec {
            guild,
            channel,
            invoker,
            message,
            reply,
            text,
        } => {
            let text = text.join(" ");
            if text.is_empty() {
                anyhow::bail!("no message provided. Usage: twobot exec --guild G --channel C --invoker U <text>");
            }

            let client = Arc::new(DiscordClient::new(&cfg.discord)?);
            let store = ServerStore::open(cfg.servers_file()).await?;
            let engine = PurgeEngine::new(client.clone());
            let locks = ChannelLocks::new();
            let cancel = cancel_on_ctrl_c();
            let ctx = CommandContext {
                repo: &store,
                messages: client.as_ref(),
                engine: &engine,
                locks: &locks,
                config: &cfg,
                cancel: &cancel,
            };

            let inv = Invocation {
                guild_id: guild,
                channel_id: channel,
                invoker,
                message_id: message,
                text: &text,
            };
            match commands::dispatch(&ctx, inv).await {
                Some(answer) => {
                    println!("{}", answer.text);
                    if reply {
                        let sent = client.send_message(channel, &answer.text).await?;
                        if let Some(ttl) = answer.expires_after {
                            tokio::time::sleep(ttl).await;
                            client.bulk_delete(channel, &[sent]).await?;
                        }
                    }
                }
                None => println!("(not a command for this guild)"),
            }
        }
        Commands::Prefix {
            guild: None, value, ..
        } => {
            let store = ServerStore::open(cfg.servers_file()).await?;
            let global = commands::effective_global_prefix(&store, &cfg).await;

            if value.is_empty() {
                println!("Global prefix: {global:?}");
            } else {
                let Some(prefix) = commands::parse_prefix_value(&value.join(" ")) else {
                    anyhow::bail!("invalid prefix. Usage: twobot prefix --global <prefix> [| true]");
                };
                store.set_global_prefix(prefix.clone()).await?;
                store.persist().await?;
                info!("global prefix set to {prefix:?} from the command line");
                println!("Global prefix set to {prefix:?}");
            }
        }
        Commands::Prefix {
            guild: Some(guild),
            value,
            ..
        } => {
            let store = ServerStore::open(cfg.servers_file()).await?;
            let global = commands::effective_global_prefix(&store, &cfg).await;
            let mut settings = store.get(guild).await?.unwrap_or_default();

            if value.is_empty() {
                let shown = commands::command_prefixes(&settings.prefix, &global)
                    .into_iter()
                    .map(|p| format!("{p:?}"))
                    .collect::<Vec<_>>();
                if shown.is_empty() {
                    println!("No prefix configured for guild {guild}");
                } else {
                    println!("Prefixes for guild {guild}: {}", shown.join(", "));
                }
            } else {
                let Some(prefix) = commands::parse_prefix_value(&value.join(" ")) else {
                    anyhow::bail!("invalid prefix. Usage: twobot prefix --guild G <prefix> [| true]");
                };
                settings.prefix = prefix;
                let shown = settings.prefix.clone();
                store.set(guild, settings).await?;
                store.persist().await?;
                info!("prefix for guild {guild} set to {shown:?} from the command line");
                println!("Prefix for guild {guild} set to {shown:?}");
            }
        }
        Commands::Status => {
            println!("twobot - Status Check\n");
            println!("Config: {}", cli.config);
            println!(
                "  discord token: {}",
                if cfg.discord.token.trim().is_empty() {
                    "missing"
                } else {
                    "configured"
                }
            );
            println!("  api base: {}", cfg.discord.api_base);
            println!(
                "  bot owner: {}",
                cfg.bot
                    .owner_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "not set".to_string())
            );
            println!("  configured prefix: {:?}", cfg.bot.prefix);
            println!("  max purge count: {}", cfg.purge.max_count);

            let servers = cfg.servers_file();
            match ServerStore::open(&servers).await {
                Ok(store) => {
                    println!(
                        "  global prefix: {:?}",
                        commands::effective_global_prefix(&store, &cfg).await
                    );
                    println!(
                        "  server store: {} ({} guild(s))",
                        servers.display(),
                        store.len().await
                    );
                }
                Err(e) => println!("  server store: {} (error: {e})", servers.display()),
            }
            println!("  logs: {}", cfg.log_dir().display());
        }
    }

    Ok(())
}

/// Console plus daily-rolling file logging. Keep the guard alive to flush.
fn init_tracing(cfg: &Config) -> anyhow::Result<WorkerGuard> {
    let log_dir = cfg.log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let appender = tracing_appender::rolling::daily(&log_dir, "twobot.log");
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.bot.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    Ok(guard)
}

/// Token cancelled on Ctrl-C, so a long purge stops between pages.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            token.cancel();
        }
    });
    cancel
}
