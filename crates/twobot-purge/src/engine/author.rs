use super::PurgeEngine;
use crate::deleter::BulkDeleter;
use crate::error::PurgeError;
use crate::fetcher::Fetcher;
use crate::request::{PurgeRequest, PurgeResult, StopReason};
use crate::state::AuthorScanState;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use twobot_core::snowflake::Snowflake;

impl PurgeEngine {
    /// Delete up to `count` messages by `author`, newest first.
    ///
    /// Sub-batches of 100 are deleted as soon as they fill, so a later
    /// failure keeps them deleted. The scan stops at the author's first
    /// message that is 14 days old or older.
    pub(super) async fn purge_author(
        &self,
        request: &PurgeRequest,
        author: Snowflake,
        cancel: &CancellationToken,
    ) -> Result<PurgeResult, PurgeError> {
        let fetcher = Fetcher::new(self.api.as_ref());
        let deleter = BulkDeleter::new(self.api.as_ref());
        let mut state = AuthorScanState::new(author, request.count);

        let stop = loop {
            if state.is_satisfied() {
                break StopReason::RequestSatisfied;
            }
            if cancel.is_cancelled() {
                return Err(PurgeError::Cancelled {
                    deleted: state.deleted,
                });
            }

            let page = fetcher
                .fetch(request.channel_id, state.page_size(), state.cursor)
                .await
                .map_err(|source| PurgeError::Fetch {
                    deleted: state.deleted,
                    source,
                })?;
            if page.is_empty() {
                break StopReason::ExhaustedChannel;
            }

            state.apply_page(&page, self.clock.now());
            debug!(
                "scanned {} in {}: {} pending for {author}, {} still needed",
                page.len(),
                request.channel_id,
                state.batch.len(),
                state.remaining
            );

            if let Some(batch) = state.take_full_batch() {
                let prior = state.deleted;
                state.deleted += deleter
                    .delete(request.channel_id, &batch, cancel)
                    .await
                    .map_err(|e| e.after(prior))?;
            }

            if state.age_limited {
                info!(
                    "purge in {} reached messages older than 14 days",
                    request.channel_id
                );
                break StopReason::AgeLimitReached;
            }
        };

        let rest = state.take_rest();
        let prior = state.deleted;
        state.deleted += deleter
            .delete(request.channel_id, &rest, cancel)
            .await
            .map_err(|e| e.after(prior))?;

        Ok(PurgeResult {
            deleted: state.deleted,
            stop,
        })
    }
}
