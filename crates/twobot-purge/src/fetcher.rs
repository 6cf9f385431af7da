//! Backward pagination over a channel's history.

use tracing::debug;
use twobot_core::{
    error::BotError,
    message::Message,
    snowflake::Snowflake,
    traits::{MessageApi, MAX_PAGE_SIZE},
};

/// Fetches history pages, newest first.
pub struct Fetcher<'a> {
    api: &'a dyn MessageApi,
}

impl<'a> Fetcher<'a> {
    pub fn new(api: &'a dyn MessageApi) -> Self {
        Self { api }
    }

    /// Fetch up to `page_size` messages strictly older than `cursor`.
    ///
    /// The size is clamped to `1..=100`. An empty page means the channel is
    /// exhausted.
    pub async fn fetch(
        &self,
        channel_id: Snowflake,
        page_size: usize,
        cursor: Option<Snowflake>,
    ) -> Result<Vec<Message>, BotError> {
        let limit = page_size.clamp(1, MAX_PAGE_SIZE);
        let mut page = self.api.get_messages(channel_id, limit, cursor).await?;
        // Callers rely on newest-first order regardless of transport.
        page.sort_unstable_by(|a, b| b.id.cmp(&a.id));
        debug!(
            "fetched {} message(s) from {channel_id} (limit {limit}, before {:?})",
            page.len(),
            cursor.map(|c| c.0)
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use twobot_core::memory::{ApiCall, MemoryHistory};

    fn seeded(n: i64) -> MemoryHistory {
        let now = Utc::now();
        let history = MemoryHistory::new(now);
        history.extend((0..n).map(|i| Message {
            id: Snowflake::from_datetime(now - Duration::seconds(i)),
            channel_id: Snowflake(5),
            author_id: Snowflake(1),
            author_name: "a".into(),
            content: String::new(),
            mentions_everyone: false,
        }));
        history
    }

    #[tokio::test]
    async fn test_fetch_clamps_page_size() {
        let history = seeded(150);
        let fetcher = Fetcher::new(&history);
        assert_eq!(fetcher.fetch(Snowflake(5), 500, None).await.unwrap().len(), 100);
        assert_eq!(fetcher.fetch(Snowflake(5), 0, None).await.unwrap().len(), 1);
        assert_eq!(history.fetch_limits(), vec![100, 1]);
    }

    #[tokio::test]
    async fn test_fetch_passes_cursor_and_orders_newest_first() {
        let history = seeded(10);
        let fetcher = Fetcher::new(&history);
        let first = fetcher.fetch(Snowflake(5), 4, None).await.unwrap();
        let cursor = first.last().map(|m| m.id);
        let second = fetcher.fetch(Snowflake(5), 4, cursor).await.unwrap();

        assert!(second.windows(2).all(|w| w[0].id > w[1].id));
        assert!(second[0].id < first[3].id);
        assert_eq!(
            history.calls()[1],
            ApiCall::GetMessages {
                channel_id: Snowflake(5),
                limit: 4,
                before: cursor,
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_empty_channel() {
        let history = seeded(0);
        let page = Fetcher::new(&history)
            .fetch(Snowflake(5), 10, None)
            .await
            .unwrap();
        assert!(page.is_empty());
    }
}
