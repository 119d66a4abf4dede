//! Keyed fixed-window counters

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Counter state after recording a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    /// Hits recorded in the current window, including this one
    pub count: u64,
    /// Time until the current window expires
    pub reset_in: Duration,
}

#[derive(Debug, Error)]
pub enum CounterStoreError {
    #[error("invalid counter store url: {0}")]
    InvalidUrl(#[source] redis::RedisError),
    #[error("counter store unavailable: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Backing store for rate-limit counters
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Record one hit for `key`. A new window of length `window` starts on
    /// the first hit after the previous one expired.
    async fn hit(&self, key: &str, window: Duration) -> Result<WindowState, CounterStoreError>;

    /// Drop expired windows, returning how many were removed
    async fn purge_expired(&self) -> usize;
}

#[derive(Debug)]
struct Window {
    started: Instant,
    length: Duration,
    count: u64,
}

impl Window {
    fn expires_at(&self) -> Instant {
        self.started + self.length
    }
}

/// Process-local counter store, used when no external store is configured
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    windows: Mutex<HashMap<String, Window>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn hit_at(&self, key: &str, length: Duration, now: Instant) -> WindowState {
        let mut windows = self.windows.lock().await;
        let window = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            length,
            count: 0,
        });

        if now >= window.expires_at() {
            window.started = now;
            window.length = length;
            window.count = 0;
        }
        window.count += 1;

        WindowState {
            count: window.count,
            reset_in: window.expires_at().saturating_duration_since(now),
        }
    }

    async fn purge_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, window| now < window.expires_at());
        before - windows.len()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn hit(&self, key: &str, window: Duration) -> Result<WindowState, CounterStoreError> {
        Ok(self.hit_at(key, window, Instant::now()).await)
    }

    async fn purge_expired(&self) -> usize {
        self.purge_at(Instant::now()).await
    }
}
