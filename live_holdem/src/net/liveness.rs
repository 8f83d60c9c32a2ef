//! Connection liveness bookkeeping.
//!
//! Heartbeat timestamps live in their own store, locked independently of
//! any table, so heartbeat traffic never contends with game state.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{RwLock, watch};

use crate::game::entities::PlayerId;

/// Last-heartbeat timestamps keyed by player.
#[derive(Clone, Debug, Default)]
pub struct LivenessRegistry {
    beats: Arc<RwLock<HashMap<PlayerId, Instant>>>,
}

impl LivenessRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the record for a freshly connected player.
    pub async fn register(&self, player_id: &str) {
        self.beats
            .write()
            .await
            .insert(player_id.to_string(), Instant::now());
    }

    /// Records a heartbeat (or pong) from `player_id` now. Only refreshes
    /// an existing record, so a frame read after disconnect cleanup
    /// can't bring one back. Returns whether a record was refreshed.
    pub async fn touch(&self, player_id: &str) -> bool {
        match self.beats.write().await.get_mut(player_id) {
            Some(seen) => {
                *seen = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Last heartbeat time, if the player still has a record.
    pub async fn last_seen(&self, player_id: &str) -> Option<Instant> {
        self.beats.read().await.get(player_id).copied()
    }

    /// Whether the player has been silent for longer than `timeout`. A
    /// player without a record has already been dropped and counts as
    /// expired.
    pub async fn is_expired(&self, player_id: &str, timeout: Duration) -> bool {
        self.last_seen(player_id)
            .await
            .is_none_or(|seen| seen.elapsed() > timeout)
    }

    pub async fn remove(&self, player_id: &str) {
        self.beats.write().await.remove(player_id);
    }

    pub async fn len(&self) -> usize {
        self.beats.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.beats.read().await.is_empty()
    }
}

/// One-shot stop signal shared by a connection's reader, its writer, and
/// the table that pushes to it. Triggering is idempotent: only the first
/// call flips the signal.
#[derive(Clone, Debug)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fires the signal. Returns `true` only for the call that fired it.
    pub fn trigger(&self) -> bool {
        self.tx.send_if_modified(|stopped| {
            if *stopped {
                false
            } else {
                *stopped = true;
                true
            }
        })
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the signal has fired (immediately if it already has).
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel can't close under us.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_remove() {
        let registry = LivenessRegistry::new();
        registry.register("p1").await;
        assert_eq!(registry.len().await, 1);
        assert!(registry.touch("p1").await);
        assert!(!registry.is_expired("p1", Duration::from_secs(60)).await);

        registry.remove("p1").await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_touch_after_remove_keeps_record_gone() {
        let registry = LivenessRegistry::new();
        registry.register("p1").await;
        registry.remove("p1").await;

        // A pong or heartbeat still buffered when the writer cleaned up.
        assert!(!registry.touch("p1").await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_player_reads_as_expired() {
        let registry = LivenessRegistry::new();
        assert_eq!(registry.last_seen("ghost").await, None);
        assert!(registry.is_expired("ghost", Duration::from_secs(60)).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_expiry() {
        let registry = LivenessRegistry::new();
        registry.register("p1").await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(registry.is_expired("p1", Duration::from_millis(10)).await);

        registry.touch("p1").await;
        assert!(!registry.is_expired("p1", Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_stop_signal_fires_once() {
        let stop = StopSignal::new();
        let clone = stop.clone();
        assert!(!stop.is_triggered());

        assert!(clone.trigger());
        assert!(!stop.trigger());
        assert!(stop.is_triggered());

        // Already fired, so this resolves immediately.
        tokio::time::timeout(Duration::from_millis(100), stop.triggered())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stop_signal_wakes_waiter() {
        let stop = StopSignal::new();
        let waiter = {
            let stop = stop.clone();
            tokio::spawn(async move { stop.triggered().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        stop.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
