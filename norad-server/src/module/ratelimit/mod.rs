//! Per-route rate limiting
//!
//! Requests are counted per client identity and route in fixed windows.
//! Counters live behind the `CounterStore` trait: in Redis when a store URL
//! is configured, otherwise in process memory.

mod store;
pub use store::{CounterStore, CounterStoreError, MemoryCounterStore, WindowState};

mod redis_store;
pub use redis_store::RedisCounterStore;

mod limiter;
pub use limiter::{RateLimitPolicy, RateLimiter, Verdict, client_identity, enforce};

use std::sync::Arc;
use std::time::Duration;

use crate::config::RateLimitConfig;

/// Pick the counter store for `config`: Redis when `store_url` is set.
pub fn counter_store(config: &RateLimitConfig) -> Result<Arc<dyn CounterStore>, CounterStoreError> {
    match config.store_url.as_deref() {
        Some(url) => {
            let store = RedisCounterStore::new(url)?;
            tracing::info!("Rate-limit counters kept in Redis");
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("Rate-limit counters kept in process memory");
            Ok(Arc::new(MemoryCounterStore::new()))
        }
    }
}

/// Periodically drop expired windows so idle clients do not accumulate
pub fn start_purge_task(store: Arc<dyn CounterStore>, interval: Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let purged = store.purge_expired().await;
            if purged > 0 {
                tracing::debug!("Purged {} expired rate-limit windows", purged);
            }
        }
    });
}
