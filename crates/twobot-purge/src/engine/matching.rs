use super::PurgeEngine;
use crate::deleter::BulkDeleter;
use crate::error::PurgeError;
use crate::fetcher::Fetcher;
use crate::predicate::Predicate;
use crate::request::{PurgeRequest, PurgeResult, StopReason};
use crate::state::ScanState;
use tokio_util::sync::CancellationToken;
use tracing::debug;

impl PurgeEngine {
    /// Scan until `count` matches are found or history runs out, then delete
    /// every match in one chunked pass.
    ///
    /// Pages are sized to the remaining quota, so a permissive predicate
    /// finishes in few large requests and a strict one in more small ones.
    pub(super) async fn purge_matching(
        &self,
        request: &PurgeRequest,
        predicate: &Predicate,
        cancel: &CancellationToken,
    ) -> Result<PurgeResult, PurgeError> {
        let fetcher = Fetcher::new(self.api.as_ref());
        let mut state = ScanState::new(request.count);

        let stop = loop {
            if state.is_satisfied() {
                break StopReason::RequestSatisfied;
            }
            if cancel.is_cancelled() {
                return Err(PurgeError::Cancelled { deleted: 0 });
            }

            let page = fetcher
                .fetch(request.channel_id, state.page_size(), state.cursor)
                .await
                .map_err(|source| PurgeError::Fetch { deleted: 0, source })?;
            if page.is_empty() {
                break StopReason::ExhaustedChannel;
            }

            state.apply_page(&page, predicate)?;
            debug!(
                "scanned {} in {}: {} matched, {} still needed",
                page.len(),
                request.channel_id,
                state.matched.len(),
                state.remaining
            );
        };

        let deleted = BulkDeleter::new(self.api.as_ref())
            .delete(request.channel_id, &state.matched, cancel)
            .await?;

        Ok(PurgeResult { deleted, stop })
    }
}
