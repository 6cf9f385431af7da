use super::*;
use crate::clock::FixedClock;
use crate::request::StopReason;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use twobot_core::error::BotError;
use twobot_core::memory::MemoryHistory;
use twobot_core::message::Message;
use twobot_core::snowflake::Snowflake;
use twobot_core::traits::MessageApi;

const CHANNEL: Snowflake = Snowflake(312_292_616_089_894_924);
const INVOKER: Snowflake = Snowflake(149_612_775_587_446_784);
const AUTHOR_X: Snowflake = Snowflake(1001);
const OTHER: Snowflake = Snowflake(2002);

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap()
}

fn message(author: Snowflake, name: &str, age: Duration) -> Message {
    Message {
        // Low bits keep same-instant messages from different authors distinct.
        id: Snowflake(Snowflake::from_datetime(now() - age).0 + author.0 % 4096),
        channel_id: CHANNEL,
        author_id: author,
        author_name: name.to_string(),
        content: format!("hello from {name}"),
        mentions_everyone: false,
    }
}

/// `n` messages by `author`, one minute apart, newest one minute old.
fn recent(author: Snowflake, name: &str, n: i64) -> Vec<Message> {
    (1..=n)
        .map(|i| message(author, name, Duration::minutes(i)))
        .collect()
}

fn history(messages: Vec<Message>) -> Arc<MemoryHistory> {
    let history = Arc::new(MemoryHistory::new(now()));
    history.extend(messages);
    history
}

fn engine(history: &Arc<MemoryHistory>) -> PurgeEngine {
    PurgeEngine::new(history.clone()).with_clock(Arc::new(FixedClock(now())))
}

fn request(count: usize, mode: PurgeMode) -> PurgeRequest {
    PurgeRequest::new(CHANNEL, count, mode, INVOKER).unwrap()
}

fn batch_sizes(history: &MemoryHistory) -> Vec<usize> {
    history.delete_batches().iter().map(Vec::len).collect()
}

#[tokio::test]
async fn test_scenario_a_predicate_until_exhausted() {
    let history = history(recent(OTHER, "xxfooxx", 30));
    let req = request(
        50,
        PurgeMode::Predicate("glob('*foo*', username)".to_string()),
    );

    let result = engine(&history)
        .purge(&req, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.deleted, 30);
    assert_eq!(result.stop, StopReason::ExhaustedChannel);
    assert_eq!(batch_sizes(&history), vec![30]);
    assert_eq!(history.fetch_limits(), vec![50, 20]);
    assert!(history.remaining(CHANNEL).is_empty());
}

#[tokio::test]
async fn test_predicate_skips_non_matching_messages() {
    let mut messages = recent(OTHER, "plain", 60);
    for (i, msg) in messages.iter_mut().enumerate() {
        if i % 2 == 0 {
            msg.author_name = "foodie".to_string();
        }
    }
    let history = history(messages);
    let req = request(
        50,
        PurgeMode::Predicate("glob('*foo*', username)".to_string()),
    );

    let result = engine(&history)
        .purge(&req, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.deleted, 30);
    assert_eq!(result.stop, StopReason::ExhaustedChannel);
    assert_eq!(history.remaining(CHANNEL).len(), 30);
}

#[tokio::test]
async fn test_scenario_b_author_purge_stops_at_age_limit() {
    let mut messages = recent(AUTHOR_X, "x", 39);
    messages.extend(recent(OTHER, "other", 20));
    messages.push(message(AUTHOR_X, "x", Duration::days(15)));
    messages.push(message(AUTHOR_X, "x", Duration::days(16)));
    let history = history(messages);

    let result = engine(&history)
        .purge(
            &request(1000, PurgeMode::Author(AUTHOR_X)),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.deleted, 39);
    assert_eq!(result.stop, StopReason::AgeLimitReached);
    assert_eq!(batch_sizes(&history), vec![39]);
    // Other authors and the two old messages survive.
    assert_eq!(history.remaining(CHANNEL).len(), 22);
}

#[tokio::test]
async fn test_scenario_c_unconditional_150() {
    let history = history(recent(OTHER, "anyone", 150));

    let result = engine(&history)
        .purge(&request(150, PurgeMode::All), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.deleted, 150);
    assert_eq!(result.stop, StopReason::RequestSatisfied);
    assert_eq!(history.fetch_limits(), vec![100, 50]);
    assert_eq!(batch_sizes(&history), vec![100, 50]);
}

#[tokio::test]
async fn test_never_deletes_more_than_requested() {
    let history = history(recent(OTHER, "anyone", 300));
    let newest: Vec<_> = history.remaining(CHANNEL).into_iter().take(120).collect();

    let result = engine(&history)
        .purge(&request(120, PurgeMode::All), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.deleted, 120);
    let left = history.remaining(CHANNEL);
    assert_eq!(left.len(), 180);
    assert!(newest.iter().all(|id| !left.contains(id)));
}

#[tokio::test]
async fn test_always_true_predicate_matches_unconditional() {
    let a = history(recent(OTHER, "anyone", 130));
    let b = history(recent(OTHER, "anyone", 130));
    let cancel = CancellationToken::new();

    let all = engine(&a)
        .purge(&request(110, PurgeMode::All), &cancel)
        .await
        .unwrap();
    let pred = engine(&b)
        .purge(&request(110, PurgeMode::Predicate("true".into())), &cancel)
        .await
        .unwrap();

    assert_eq!(all, pred);
    assert_eq!(a.calls(), b.calls());
}

#[tokio::test]
async fn test_malformed_predicate_makes_no_calls() {
    let history = history(recent(OTHER, "anyone", 10));
    let err = engine(&history)
        .purge(
            &request(10, PurgeMode::Predicate("glob('*a*', username".into())),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PurgeError::Compile(_)));
    assert!(history.calls().is_empty());
}

#[tokio::test]
async fn test_fetch_error_deletes_nothing_in_predicate_mode() {
    let history = history(recent(OTHER, "anyone", 250));
    history.fail_fetch_on(2);

    let err = engine(&history)
        .purge(&request(250, PurgeMode::All), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PurgeError::Fetch { deleted: 0, .. }));
    assert!(history.delete_batches().is_empty());
    assert_eq!(history.remaining(CHANNEL).len(), 250);
}

#[tokio::test]
async fn test_eval_error_aborts_before_deleting() {
    let history = history(recent(OTHER, "anyone", 10));
    let err = engine(&history)
        .purge(
            &request(5, PurgeMode::Predicate("content".into())),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PurgeError::Eval { deleted: 0, .. }));
    assert_eq!(history.fetch_limits(), vec![5]);
    assert!(history.delete_batches().is_empty());
}

#[tokio::test]
async fn test_old_matches_fail_their_chunk() {
    let mut messages = recent(OTHER, "anyone", 100);
    messages.extend(
        (0..50).map(|i| message(OTHER, "anyone", Duration::days(20) + Duration::minutes(i))),
    );
    let history = history(messages);

    let err = engine(&history)
        .purge(&request(150, PurgeMode::All), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PurgeError::Delete { deleted: 100, .. }));
    assert_eq!(history.remaining(CHANNEL).len(), 50);
}

#[tokio::test]
async fn test_author_purge_flushes_full_sub_batches() {
    let history = history(recent(AUTHOR_X, "x", 250));

    let result = engine(&history)
        .purge(
            &request(1000, PurgeMode::Author(AUTHOR_X)),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.deleted, 250);
    assert_eq!(result.stop, StopReason::ExhaustedChannel);
    assert_eq!(batch_sizes(&history), vec![100, 100, 50]);
}

#[tokio::test]
async fn test_author_purge_keeps_committed_batches_on_fetch_error() {
    let history = history(recent(AUTHOR_X, "x", 250));
    history.fail_fetch_on(3);

    let err = engine(&history)
        .purge(
            &request(250, PurgeMode::Author(AUTHOR_X)),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PurgeError::Fetch { deleted: 200, .. }));
    assert_eq!(history.remaining(CHANNEL).len(), 50);
}

#[tokio::test]
async fn test_author_purge_keeps_committed_batches_on_delete_error() {
    let history = history(recent(AUTHOR_X, "x", 250));
    history.fail_delete_on(2);

    let err = engine(&history)
        .purge(
            &request(250, PurgeMode::Author(AUTHOR_X)),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PurgeError::Delete { deleted: 100, .. }));
    assert_eq!(err.deleted(), 100);
    assert_eq!(history.remaining(CHANNEL).len(), 150);
}

/// History that cancels the purge while serving its `n`th page.
struct CancelOnFetch {
    inner: Arc<MemoryHistory>,
    cancel: CancellationToken,
    on_fetch: usize,
    fetches: AtomicUsize,
}

#[async_trait]
impl MessageApi for CancelOnFetch {
    async fn get_messages(
        &self,
        channel_id: Snowflake,
        limit: usize,
        before: Option<Snowflake>,
    ) -> Result<Vec<Message>, BotError> {
        if self.fetches.fetch_add(1, Ordering::SeqCst) + 1 == self.on_fetch {
            self.cancel.cancel();
        }
        self.inner.get_messages(channel_id, limit, before).await
    }

    async fn bulk_delete(&self, channel_id: Snowflake, ids: &[Snowflake]) -> Result<(), BotError> {
        self.inner.bulk_delete(channel_id, ids).await
    }
}

#[tokio::test]
async fn test_author_purge_cancelled_between_pages() {
    let history = history(recent(AUTHOR_X, "x", 250));
    let cancel = CancellationToken::new();
    let api = Arc::new(CancelOnFetch {
        inner: history.clone(),
        cancel: cancel.clone(),
        on_fetch: 2,
        fetches: AtomicUsize::new(0),
    });
    let engine = PurgeEngine::new(api).with_clock(Arc::new(FixedClock(now())));

    let err = engine
        .purge(&request(250, PurgeMode::Author(AUTHOR_X)), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, PurgeError::Cancelled { deleted: 100 }));
    assert_eq!(batch_sizes(&history), vec![100]);
    assert_eq!(history.remaining(CHANNEL).len(), 150);
}

#[tokio::test]
async fn test_author_purge_fetches_full_pages_for_sparse_author() {
    let mut messages = recent(OTHER, "other", 300);
    messages.push(message(AUTHOR_X, "x", Duration::minutes(301)));
    let history = history(messages);

    let result = engine(&history)
        .purge(
            &request(1, PurgeMode::Author(AUTHOR_X)),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.deleted, 1);
    assert_eq!(result.stop, StopReason::RequestSatisfied);
    assert_eq!(history.fetch_limits(), vec![100, 100, 100, 100]);
    assert_eq!(batch_sizes(&history), vec![1]);
}

#[tokio::test]
async fn test_author_purge_satisfied_exactly() {
    let mut messages = recent(AUTHOR_X, "x", 30);
    messages.extend(recent(OTHER, "other", 30));
    let history = history(messages);

    let result = engine(&history)
        .purge(
            &request(10, PurgeMode::Author(AUTHOR_X)),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.deleted, 10);
    assert_eq!(result.stop, StopReason::RequestSatisfied);
}

#[tokio::test]
async fn test_author_age_boundary() {
    let history = history(vec![
        message(AUTHOR_X, "x", Duration::days(14) - Duration::seconds(1)),
        message(AUTHOR_X, "x", Duration::days(14)),
    ]);

    let result = engine(&history)
        .purge(
            &request(5, PurgeMode::Author(AUTHOR_X)),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.deleted, 1);
    assert_eq!(result.stop, StopReason::AgeLimitReached);
    assert_eq!(history.remaining(CHANNEL).len(), 1);
}

#[tokio::test]
async fn test_cancelled_purge_makes_no_calls() {
    let history = history(recent(OTHER, "anyone", 10));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = engine(&history)
        .purge(&request(10, PurgeMode::All), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, PurgeError::Cancelled { deleted: 0 }));
    assert!(history.calls().is_empty());
}

#[tokio::test]
async fn test_empty_channel_is_exhausted_not_an_error() {
    let history = history(Vec::new());
    let result = engine(&history)
        .purge(&request(10, PurgeMode::All), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.deleted, 0);
    assert_eq!(result.stop, StopReason::ExhaustedChannel);
    assert!(history.delete_batches().is_empty());
}

#[test]
fn test_zero_count_is_input_error() {
    let err = PurgeRequest::new(CHANNEL, 0, PurgeMode::All, INVOKER).unwrap_err();
    assert!(matches!(err, PurgeError::Input(_)));
}
