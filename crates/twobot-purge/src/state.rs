//! Request-scoped scan state.
//!
//! The purge loops keep their cursor, quota and accumulated ids in these
//! records and feed them one page at a time. Applying a page is synchronous
//! and network-free, so the loop logic is testable on its own.

use crate::error::PurgeError;
use crate::predicate::Predicate;
use chrono::{DateTime, Utc};
use std::num::NonZeroUsize;
use twobot_core::{
    message::Message,
    snowflake::{bulk_delete_max_age, Snowflake},
    traits::{MAX_BULK_DELETE, MAX_PAGE_SIZE},
};

/// Oldest id in a page: the cursor for the next request.
fn oldest(page: &[Message]) -> Option<Snowflake> {
    page.iter().map(|m| m.id).min()
}

/// State of a predicate (or unconditional) purge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanState {
    /// Matches still needed.
    pub remaining: usize,
    pub cursor: Option<Snowflake>,
    /// Matching ids, in scan order.
    pub matched: Vec<Snowflake>,
}

impl ScanState {
    pub fn new(count: NonZeroUsize) -> Self {
        Self {
            remaining: count.get(),
            cursor: None,
            matched: Vec::new(),
        }
    }

    /// Size of the next page: the remaining quota, capped at the platform limit.
    pub fn page_size(&self) -> usize {
        self.remaining.min(MAX_PAGE_SIZE)
    }

    pub fn is_satisfied(&self) -> bool {
        self.remaining == 0
    }

    /// Advance the cursor past `page` and collect its matches.
    ///
    /// Stops early once the quota is met. A predicate failure aborts with the
    /// offending message id; nothing has been deleted at that point.
    pub fn apply_page(&mut self, page: &[Message], predicate: &Predicate) -> Result<(), PurgeError> {
        if let Some(cursor) = oldest(page) {
            self.cursor = Some(cursor);
        }
        for msg in page {
            if self.remaining == 0 {
                break;
            }
            let keep = predicate
                .evaluate(msg)
                .map_err(|source| PurgeError::Eval {
                    message_id: msg.id,
                    deleted: 0,
                    source,
                })?;
            if keep {
                self.matched.push(msg.id);
                self.remaining -= 1;
            }
        }
        Ok(())
    }
}

/// State of a single-author purge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorScanState {
    pub author: Snowflake,
    pub remaining: usize,
    pub cursor: Option<Snowflake>,
    /// Accepted ids not yet deleted.
    pub batch: Vec<Snowflake>,
    /// Ids removed by sub-batches flushed so far.
    pub deleted: usize,
    /// A candidate at or past the bulk-delete age was reached.
    pub age_limited: bool,
}

impl AuthorScanState {
    pub fn new(author: Snowflake, count: NonZeroUsize) -> Self {
        Self {
            author,
            remaining: count.get(),
            cursor: None,
            batch: Vec::new(),
            deleted: 0,
            age_limited: false,
        }
    }

    /// Always a full page; the author's messages may be sparse.
    pub fn page_size(&self) -> usize {
        MAX_PAGE_SIZE
    }

    pub fn is_satisfied(&self) -> bool {
        self.remaining == 0
    }

    /// Advance the cursor past `page` and accept the author's messages.
    ///
    /// Scanning stops at the first candidate whose age at `now` is 14 days or
    /// more; everything after it is older still.
    pub fn apply_page(&mut self, page: &[Message], now: DateTime<Utc>) {
        if let Some(cursor) = oldest(page) {
            self.cursor = Some(cursor);
        }
        for msg in page {
            if self.remaining == 0 {
                break;
            }
            if msg.author_id != self.author {
                continue;
            }
            if msg.id.age_at(now) >= bulk_delete_max_age() {
                self.age_limited = true;
                break;
            }
            self.batch.push(msg.id);
            self.remaining -= 1;
        }
    }

    /// Split off a full sub-batch, if one has accumulated.
    pub fn take_full_batch(&mut self) -> Option<Vec<Snowflake>> {
        if self.batch.len() < MAX_BULK_DELETE {
            return None;
        }
        let rest = self.batch.split_off(MAX_BULK_DELETE);
        Some(std::mem::replace(&mut self.batch, rest))
    }

    /// Take whatever is left for the final flush.
    pub fn take_rest(&mut self) -> Vec<Snowflake> {
        std::mem::take(&mut self.batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const CHANNEL: Snowflake = Snowflake(10);
    const ALICE: Snowflake = Snowflake(1);
    const BOB: Snowflake = Snowflake(2);

    fn msg(author: Snowflake, at: DateTime<Utc>, offset: i64) -> Message {
        Message {
            id: Snowflake(Snowflake::from_datetime(at).0 + offset as u64),
            channel_id: CHANNEL,
            author_id: author,
            author_name: format!("user{}", author.0),
            content: String::new(),
            mentions_everyone: false,
        }
    }

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_page_size_tracks_remaining() {
        let mut state = ScanState::new(nz(250));
        assert_eq!(state.page_size(), 100);
        state.remaining = 42;
        assert_eq!(state.page_size(), 42);
    }

    #[test]
    fn test_author_pages_are_always_full() {
        let state = AuthorScanState::new(ALICE, nz(1));
        assert_eq!(state.page_size(), 100);
    }

    #[test]
    fn test_apply_page_counts_matches_only() {
        let now = Utc::now();
        let page: Vec<_> = (0..10)
            .map(|i| msg(if i % 2 == 0 { ALICE } else { BOB }, now, 10 - i))
            .collect();
        let predicate = Predicate::compile("userid == '1'").unwrap();

        let mut state = ScanState::new(nz(20));
        state.apply_page(&page, &predicate).unwrap();

        assert_eq!(state.matched.len(), 5);
        assert_eq!(state.remaining, 15);
        assert_eq!(state.cursor, Some(page[9].id));
    }

    #[test]
    fn test_apply_page_never_exceeds_quota() {
        let now = Utc::now();
        let page: Vec<_> = (0..10).map(|i| msg(ALICE, now, 10 - i)).collect();
        let mut state = ScanState::new(nz(3));
        state.apply_page(&page, &Predicate::always()).unwrap();
        assert_eq!(state.matched, vec![page[0].id, page[1].id, page[2].id]);
        assert!(state.is_satisfied());
    }

    #[test]
    fn test_apply_page_reports_failing_message() {
        let now = Utc::now();
        let page = vec![msg(ALICE, now, 0)];
        let predicate = Predicate::compile("content").unwrap();
        let mut state = ScanState::new(nz(5));
        let err = state.apply_page(&page, &predicate).unwrap_err();
        assert!(matches!(err, PurgeError::Eval { message_id, deleted: 0, .. } if message_id == page[0].id));
    }

    #[test]
    fn test_author_state_stops_at_age_limit() {
        let now = Utc::now();
        let page = vec![
            msg(ALICE, now - Duration::days(1), 0),
            msg(BOB, now - Duration::days(15), 2),
            msg(ALICE, now - Duration::days(13), 0),
            msg(ALICE, now - Duration::days(15), 0),
            msg(ALICE, now - Duration::days(16), 0),
        ];
        let mut state = AuthorScanState::new(ALICE, nz(100));
        state.apply_page(&page, now);

        // Bob's old message is not a candidate, so it does not trip the gate.
        assert_eq!(state.batch, vec![page[0].id, page[2].id]);
        assert!(state.age_limited);
        assert_eq!(state.remaining, 98);
    }

    #[test]
    fn test_author_state_age_boundary() {
        let now = Utc::now();
        let boundary = now - Duration::days(14);
        let page = vec![
            msg(ALICE, boundary + Duration::seconds(1), 0),
            msg(ALICE, boundary, 0),
        ];
        let mut state = AuthorScanState::new(ALICE, nz(10));
        state.apply_page(&page, now);
        assert_eq!(state.batch, vec![page[0].id]);
        assert!(state.age_limited);
    }

    #[test]
    fn test_take_full_batch_splits_at_limit() {
        let mut state = AuthorScanState::new(ALICE, nz(500));
        state.batch = (0..130).map(Snowflake).collect();
        let full = state.take_full_batch().unwrap();
        assert_eq!(full.len(), 100);
        assert_eq!(full[0], Snowflake(0));
        assert_eq!(state.batch.len(), 30);
        assert!(state.take_full_batch().is_none());
        assert_eq!(state.take_rest().len(), 30);
        assert!(state.batch.is_empty());
    }
}
