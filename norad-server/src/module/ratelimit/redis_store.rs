//! Redis-backed counters, shared by every server process using the same store

use async_trait::async_trait;
use redis::Script;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::store::{CounterStore, CounterStoreError, WindowState};

const KEY_PREFIX: &str = "norad:ratelimit:";

// INCR, start the expiry on the first hit, report the remaining TTL.
// A key that somehow lost its expiry gets a fresh one.
const HIT_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end
return {count, ttl}
"#;

/// Counter store in Redis. Connects on first use and reconnects on its own.
pub struct RedisCounterStore {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
    script: Script,
}

impl RedisCounterStore {
    /// Parse `url`; no connection is made until the first hit.
    pub fn new(url: &str) -> Result<Self, CounterStoreError> {
        let client = redis::Client::open(url).map_err(CounterStoreError::InvalidUrl)?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
            script: Script::new(HIT_SCRIPT),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CounterStoreError> {
        let connection = self
            .connection
            .get_or_try_init(|| self.client.get_connection_manager())
            .await?;
        Ok(connection.clone())
    }
}

fn store_key(key: &str) -> String {
    format!("{}{}", KEY_PREFIX, key)
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn hit(&self, key: &str, window: Duration) -> Result<WindowState, CounterStoreError> {
        let mut connection = self.connection().await?;
        let window_ms = window.as_millis().max(1) as u64;

        let (count, ttl_ms): (u64, i64) = self
            .script
            .key(store_key(key))
            .arg(window_ms)
            .invoke_async(&mut connection)
            .await?;

        Ok(WindowState {
            count,
            reset_in: Duration::from_millis(ttl_ms.max(0) as u64),
        })
    }

    /// Redis expires windows itself
    async fn purge_expired(&self) -> usize {
        0
    }
}
