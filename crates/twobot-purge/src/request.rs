use crate::error::PurgeError;
use std::fmt;
use std::num::NonZeroUsize;
use twobot_core::snowflake::Snowflake;

/// Which messages a purge may delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeMode {
    /// Every message is eligible.
    All,
    /// Messages for which the expression evaluates to `true`.
    Predicate(String),
    /// Messages written by one author, younger than the bulk-delete window.
    Author(Snowflake),
}

/// A request to delete up to `count` messages from a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeRequest {
    pub channel_id: Snowflake,
    pub count: NonZeroUsize,
    pub mode: PurgeMode,
    /// Who asked. Permission checks happen before the request is built.
    pub invoker: Snowflake,
}

impl PurgeRequest {
    /// Build a request, rejecting a zero count.
    pub fn new(
        channel_id: Snowflake,
        count: usize,
        mode: PurgeMode,
        invoker: Snowflake,
    ) -> Result<Self, PurgeError> {
        let count = NonZeroUsize::new(count)
            .ok_or_else(|| PurgeError::Input("purge count must be at least 1".to_string()))?;
        Ok(Self {
            channel_id,
            count,
            mode,
            invoker,
        })
    }
}

/// Why a successful purge stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The channel ran out of history.
    ExhaustedChannel,
    /// The next candidate was too old to bulk delete.
    AgeLimitReached,
    /// The requested number of messages was found.
    RequestSatisfied,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExhaustedChannel => "exhausted-channel",
            Self::AgeLimitReached => "age-limit-reached",
            Self::RequestSatisfied => "request-satisfied",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeResult {
    pub deleted: usize,
    pub stop: StopReason,
}
