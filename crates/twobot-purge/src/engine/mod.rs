//! Purge orchestration.
//!
//! Split by strategy:
//! - `matching`: unconditional and predicate purges (scan first, delete once)
//! - `author`: single-author purges with the bulk-delete age cutoff

mod author;
mod matching;

#[cfg(test)]
mod tests;

use crate::clock::{Clock, SystemClock};
use crate::error::PurgeError;
use crate::predicate::Predicate;
use crate::request::{PurgeMode, PurgeRequest, PurgeResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use twobot_core::traits::MessageApi;

/// Runs purges against a message API.
///
/// Holds no per-purge state; concurrent purges of the same channel must be
/// serialized by the caller.
#[derive(Clone)]
pub struct PurgeEngine {
    api: Arc<dyn MessageApi>,
    clock: Arc<dyn Clock>,
}

impl PurgeEngine {
    pub fn new(api: Arc<dyn MessageApi>) -> Self {
        Self {
            api,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for message age checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run one purge to completion, a hard error, or cancellation.
    ///
    /// A predicate is compiled before the first request, so a malformed
    /// expression never touches the channel.
    pub async fn purge(
        &self,
        request: &PurgeRequest,
        cancel: &CancellationToken,
    ) -> Result<PurgeResult, PurgeError> {
        info!(
            "purge of up to {} message(s) in {} requested by {} ({:?})",
            request.count, request.channel_id, request.invoker, request.mode
        );

        let outcome = match &request.mode {
            PurgeMode::All => {
                self.purge_matching(request, &Predicate::always(), cancel)
                    .await
            }
            PurgeMode::Predicate(source) => {
                let predicate = Predicate::compile(source)?;
                self.purge_matching(request, &predicate, cancel).await
            }
            PurgeMode::Author(author) => self.purge_author(request, *author, cancel).await,
        };

        match &outcome {
            Ok(result) => info!(
                "purge in {} finished: {} deleted ({})",
                request.channel_id, result.deleted, result.stop
            ),
            Err(e) => warn!(
                "purge in {} failed after {} deleted: {e}",
                request.channel_id,
                e.deleted()
            ),
        }
        outcome
    }
}
