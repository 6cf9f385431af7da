use crate::predicate::{CompileError, EvalError};
use thiserror::Error;
use twobot_core::{error::BotError, snowflake::Snowflake};

/// Why a purge failed.
///
/// Every variant raised after the first network call carries `deleted`, the
/// number of messages already removed. Nothing is rolled back.
#[derive(Debug, Error)]
pub enum PurgeError {
    /// Bad count or arguments; nothing was fetched.
    #[error("{0}")]
    Input(String),

    /// Malformed predicate; nothing was fetched.
    #[error("invalid expression: {0}")]
    Compile(#[from] CompileError),

    #[error("failed to fetch messages: {source}")]
    Fetch { deleted: usize, source: BotError },

    #[error("error evaluating expression on message {message_id}: {source}")]
    Eval {
        message_id: Snowflake,
        deleted: usize,
        source: EvalError,
    },

    #[error("failed to delete messages after removing {deleted}: {source}")]
    Delete { deleted: usize, source: BotError },

    #[error("purge cancelled after deleting {deleted} message(s)")]
    Cancelled { deleted: usize },
}

impl PurgeError {
    /// Messages removed before the failure.
    pub fn deleted(&self) -> usize {
        match self {
            Self::Input(_) | Self::Compile(_) => 0,
            Self::Fetch { deleted, .. }
            | Self::Eval { deleted, .. }
            | Self::Delete { deleted, .. }
            | Self::Cancelled { deleted } => *deleted,
        }
    }

    /// Add deletions committed by earlier steps of the same purge.
    pub(crate) fn after(mut self, prior: usize) -> Self {
        match &mut self {
            Self::Input(_) | Self::Compile(_) => {}
            Self::Fetch { deleted, .. }
            | Self::Eval { deleted, .. }
            | Self::Delete { deleted, .. }
            | Self::Cancelled { deleted } => *deleted += prior,
        }
        self
    }
}
