//! Per-channel purge serialization.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use twobot_core::snowflake::Snowflake;

/// One lock per channel, so two purges never page the same history at once.
#[derive(Clone, Default)]
pub struct ChannelLocks {
    inner: Arc<Mutex<HashMap<Snowflake, Arc<Mutex<()>>>>>,
}

impl ChannelLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the channel's lock. Held until the guard drops.
    ///
    /// Entries nobody holds or waits on are dropped first, so the map only
    /// tracks channels with a purge in flight.
    pub async fn lock(&self, channel_id: Snowflake) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            // Handles are only cloned under the map lock, so a count of one
            // means no guard or waiter exists.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(channel_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    pub(crate) async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether a purge currently holds the channel.
    pub async fn is_locked(&self, channel_id: Snowflake) -> bool {
        let map = self.inner.lock().await;
        map.get(&channel_id)
            .is_some_and(|lock| lock.try_lock().is_err())
    }
}
