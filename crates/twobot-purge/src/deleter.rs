//! Chunked bulk deletion.

use crate::error::PurgeError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use twobot_core::{
    snowflake::Snowflake,
    traits::{MessageApi, MAX_BULK_DELETE},
};

/// Deletes id sets in platform-sized chunks.
pub struct BulkDeleter<'a> {
    api: &'a dyn MessageApi,
}

impl<'a> BulkDeleter<'a> {
    pub fn new(api: &'a dyn MessageApi) -> Self {
        Self { api }
    }

    /// Delete `ids` in order, at most 100 per call.
    ///
    /// Returns how many were deleted. The first failing chunk stops the run;
    /// the error carries the count removed by the chunks before it. Every id
    /// must be younger than 14 days or the platform rejects its chunk.
    pub async fn delete(
        &self,
        channel_id: Snowflake,
        ids: &[Snowflake],
        cancel: &CancellationToken,
    ) -> Result<usize, PurgeError> {
        let mut deleted = 0;
        for chunk in ids.chunks(MAX_BULK_DELETE) {
            if cancel.is_cancelled() {
                return Err(PurgeError::Cancelled { deleted });
            }
            if let Err(source) = self.api.bulk_delete(channel_id, chunk).await {
                warn!(
                    "bulk delete of {} message(s) in {channel_id} failed after {deleted}: {source}",
                    chunk.len()
                );
                return Err(PurgeError::Delete { deleted, source });
            }
            deleted += chunk.len();
            debug!("deleted chunk of {} in {channel_id}", chunk.len());
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::collections::HashSet;
    use twobot_core::memory::MemoryHistory;

    fn fresh_ids(n: i64) -> Vec<Snowflake> {
        let now = Utc::now();
        (0..n)
            .map(|i| Snowflake::from_datetime(now - Duration::seconds(i)))
            .collect()
    }

    #[tokio::test]
    async fn test_250_ids_become_three_disjoint_chunks() {
        let history = MemoryHistory::new(Utc::now());
        let ids = fresh_ids(250);
        let deleted = BulkDeleter::new(&history)
            .delete(Snowflake(1), &ids, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(deleted, 250);

        let batches = history.delete_batches();
        let sizes: Vec<_> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);

        let union: HashSet<_> = batches.iter().flatten().copied().collect();
        assert_eq!(union.len(), 250, "chunks are disjoint");
        assert_eq!(union, ids.into_iter().collect::<HashSet<_>>());
    }

    #[tokio::test]
    async fn test_failure_reports_prior_chunks_and_stops() {
        let history = MemoryHistory::new(Utc::now());
        history.fail_delete_on(2);
        let err = BulkDeleter::new(&history)
            .delete(Snowflake(1), &fresh_ids(250), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PurgeError::Delete { deleted: 100, .. }));
        assert_eq!(history.delete_batches().len(), 2, "third chunk never sent");
    }

    #[tokio::test]
    async fn test_empty_set_makes_no_calls() {
        let history = MemoryHistory::new(Utc::now());
        let deleted = BulkDeleter::new(&history)
            .delete(Snowflake(1), &[], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(deleted, 0);
        assert!(history.calls().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_twice_is_safe() {
        let history = MemoryHistory::new(Utc::now());
        let ids = fresh_ids(5);
        let deleter = BulkDeleter::new(&history);
        let cancel = CancellationToken::new();
        assert_eq!(deleter.delete(Snowflake(1), &ids, &cancel).await.unwrap(), 5);
        assert_eq!(deleter.delete(Snowflake(1), &ids, &cancel).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_chunk() {
        let history = MemoryHistory::new(Utc::now());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = BulkDeleter::new(&history)
            .delete(Snowflake(1), &fresh_ids(3), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PurgeError::Cancelled { deleted: 0 }));
        assert!(history.calls().is_empty());
    }
}
