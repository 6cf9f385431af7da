//! In-memory message history.
//!
//! Implements [`MessageApi`] over a map of channels, enforcing the same
//! structural limits as the real platform (page size, bulk-delete size, the
//! 14-day bulk window) and recording every call. Used by tests and offline
//! tooling that must not touch a live channel.

use crate::{
    error::BotError,
    message::Message,
    snowflake::Snowflake,
    traits::{MessageApi, MAX_BULK_DELETE, MAX_PAGE_SIZE},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// One recorded API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    GetMessages {
        channel_id: Snowflake,
        limit: usize,
        before: Option<Snowflake>,
    },
    BulkDelete {
        channel_id: Snowflake,
        ids: Vec<Snowflake>,
    },
}

#[derive(Default)]
struct Inner {
    channels: HashMap<Snowflake, BTreeMap<Snowflake, Message>>,
    calls: Vec<ApiCall>,
    fetches: usize,
    deletes: usize,
    fail_fetch_on: Option<usize>,
    fail_delete_on: Option<usize>,
}

/// Channel histories held in memory.
pub struct MemoryHistory {
    inner: Mutex<Inner>,
    now: DateTime<Utc>,
}

impl MemoryHistory {
    /// Create an empty history whose bulk-delete window is measured from `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            now,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a message to its channel.
    pub fn insert(&self, message: Message) {
        self.lock()
            .channels
            .entry(message.channel_id)
            .or_default()
            .insert(message.id, message);
    }

    /// Add many messages.
    pub fn extend(&self, messages: impl IntoIterator<Item = Message>) {
        for message in messages {
            self.insert(message);
        }
    }

    /// Ids still present in a channel, newest first.
    pub fn remaining(&self, channel_id: Snowflake) -> Vec<Snowflake> {
        self.lock()
            .channels
            .get(&channel_id)
            .map(|history| history.keys().rev().copied().collect())
            .unwrap_or_default()
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    /// Page sizes requested so far.
    pub fn fetch_limits(&self) -> Vec<usize> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ApiCall::GetMessages { limit, .. } => Some(*limit),
                ApiCall::BulkDelete { .. } => None,
            })
            .collect()
    }

    /// Id sets submitted for deletion so far, including rejected ones.
    pub fn delete_batches(&self) -> Vec<Vec<Snowflake>> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ApiCall::BulkDelete { ids, .. } => Some(ids.clone()),
                ApiCall::GetMessages { .. } => None,
            })
            .collect()
    }

    /// Make the `nth` (1-based) history fetch fail.
    pub fn fail_fetch_on(&self, nth: usize) {
        self.lock().fail_fetch_on = Some(nth);
    }

    /// Make the `nth` (1-based) bulk delete fail.
    pub fn fail_delete_on(&self, nth: usize) {
        self.lock().fail_delete_on = Some(nth);
    }
}

#[async_trait]
impl MessageApi for MemoryHistory {
    async fn get_messages(
        &self,
        channel_id: Snowflake,
        limit: usize,
        before: Option<Snowflake>,
    ) -> Result<Vec<Message>, BotError> {
        let mut inner = self.lock();
        inner.calls.push(ApiCall::GetMessages {
            channel_id,
            limit,
            before,
        });
        inner.fetches += 1;

        if inner.fail_fetch_on == Some(inner.fetches) {
            return Err(BotError::Platform("injected fetch failure".into()));
        }
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(BotError::Rejected {
                status: 400,
                message: format!("limit must be between 1 and {MAX_PAGE_SIZE}, got {limit}"),
            });
        }

        let Some(history) = inner.channels.get(&channel_id) else {
            return Ok(Vec::new());
        };
        let page = match before {
            Some(cursor) => history
                .range(..cursor)
                .rev()
                .take(limit)
                .map(|(_, m)| m.clone())
                .collect(),
            None => history.values().rev().take(limit).cloned().collect(),
        };
        Ok(page)
    }

    async fn bulk_delete(&self, channel_id: Snowflake, ids: &[Snowflake]) -> Result<(), BotError> {
        let mut inner = self.lock();
        inner.calls.push(ApiCall::BulkDelete {
            channel_id,
            ids: ids.to_vec(),
        });
        inner.deletes += 1;

        if inner.fail_delete_on == Some(inner.deletes) {
            return Err(BotError::Platform("injected delete failure".into()));
        }
        if ids.len() > MAX_BULK_DELETE {
            return Err(BotError::Rejected {
                status: 400,
                message: format!("at most {MAX_BULK_DELETE} messages per bulk delete"),
            });
        }
        if let Some(old) = ids.iter().find(|id| !id.is_bulk_deletable_at(self.now)) {
            return Err(BotError::Rejected {
                status: 400,
                message: format!("message {old} is older than 2 weeks"),
            });
        }

        if let Some(history) = inner.channels.get_mut(&channel_id) {
            for id in ids {
                history.remove(id);
            }
        }
        Ok(())
    }
}
