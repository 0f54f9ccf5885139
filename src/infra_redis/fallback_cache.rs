use crate::domain_port::{CacheHealth, CacheStore};
use dashmap::DashMap;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::{Instant, timeout};
use tracing::{debug, info, warn};

struct FallbackEntry {
    value: String,
    expires_at: Instant,
}

impl FallbackEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Key-value cache backed by Redis with a bounded in-process fallback.
///
/// Two states: remote-active and fallback-active. Any connect error,
/// timeout, or command error flips to fallback; the next successful
/// liveness probe (issued by `health()`) flips back. Writes are mirrored
/// into the fallback map even while the remote is active, so a freshly
/// degraded process still serves recent entries.
///
/// Entries written in fallback mode are process-local and do not survive a
/// restart; cross-process consumers must treat fallback mode as degraded.
pub struct RedisFallbackCache {
    client: Option<redis::Client>,
    prefix: String,
    op_timeout: Duration,
    capacity: usize,
    fallback: DashMap<String, FallbackEntry>,
    fallback_active: AtomicBool,
}

impl RedisFallbackCache {
    pub fn new(
        client: redis::Client,
        prefix: impl Into<String>,
        op_timeout: Duration,
        capacity: usize,
    ) -> Self {
        Self {
            client: Some(client),
            prefix: prefix.into(),
            op_timeout,
            capacity,
            fallback: DashMap::new(),
            fallback_active: AtomicBool::new(false),
        }
    }

    /// Cache with no remote at all; permanently serves from the in-process
    /// store. Used when no Redis connection is configured and in tests.
    pub fn disconnected(capacity: usize) -> Self {
        Self {
            client: None,
            prefix: "cache".to_string(),
            op_timeout: Duration::from_millis(100),
            capacity,
            fallback: DashMap::new(),
            fallback_active: AtomicBool::new(true),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    fn enter_fallback(&self, context: &str, error: impl std::fmt::Display) {
        if !self.fallback_active.swap(true, Ordering::SeqCst) {
            warn!(%context, %error, "remote cache unreachable, serving from in-process fallback");
        }
    }

    fn exit_fallback(&self) {
        if self.fallback_active.swap(false, Ordering::SeqCst) {
            info!("remote cache reachable again, leaving fallback mode");
        }
    }

    /// Connection for the remote tier, or None while in fallback mode or
    /// when the remote cannot be reached within the op timeout.
    async fn remote(&self, context: &str) -> Option<MultiplexedConnection> {
        if self.fallback_active.load(Ordering::SeqCst) {
            return None;
        }
        let client = self.client.as_ref()?;
        match timeout(self.op_timeout, client.get_multiplexed_async_connection()).await {
            Ok(Ok(conn)) => Some(conn),
            Ok(Err(e)) => {
                self.enter_fallback(context, e);
                None
            }
            Err(elapsed) => {
                self.enter_fallback(context, elapsed);
                None
            }
        }
    }

    fn fallback_get(&self, key: &str) -> Option<String> {
        match self.fallback.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
            Some(_) => {
                drop(self.fallback.remove(key));
                None
            }
            None => None,
        }
    }

    fn fallback_set(&self, key: String, value: String, ttl_secs: u64) {
        if self.fallback.len() >= self.capacity && !self.fallback.contains_key(&key) {
            self.fallback.retain(|_, entry| !entry.is_expired());
            if self.fallback.len() >= self.capacity {
                // Still full after purging: drop an arbitrary entry to stay
                // bounded rather than grow without limit.
                if let Some(victim) = self.fallback.iter().next().map(|e| e.key().clone()) {
                    self.fallback.remove(&victim);
                }
            }
        }
        self.fallback.insert(
            key,
            FallbackEntry {
                value,
                expires_at: Instant::now() + Duration::from_secs(ttl_secs),
            },
        );
    }
}

#[async_trait::async_trait]
impl CacheStore for RedisFallbackCache {
    async fn get(&self, key: &str) -> Option<String> {
        let key = self.key(key);

        if let Some(mut conn) = self.remote("get").await {
            match timeout(self.op_timeout, conn.get::<_, Option<String>>(&key)).await {
                Ok(Ok(value)) => return value,
                Ok(Err(e)) => self.enter_fallback("get", e),
                Err(elapsed) => self.enter_fallback("get", elapsed),
            }
        }

        self.fallback_get(&key)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) {
        let key = self.key(key);

        // Mirror first: the entry must land somewhere even if the remote
        // write fails mid-flight.
        self.fallback_set(key.clone(), value.to_string(), ttl_secs);

        if let Some(mut conn) = self.remote("set").await {
            match timeout(
                self.op_timeout,
                conn.set_ex::<_, _, ()>(&key, value, ttl_secs),
            )
            .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => self.enter_fallback("set", e),
                Err(elapsed) => self.enter_fallback("set", elapsed),
            }
        }
    }

    async fn del(&self, key: &str) {
        let key = self.key(key);

        self.fallback.remove(&key);

        if let Some(mut conn) = self.remote("del").await {
            match timeout(self.op_timeout, conn.del::<_, ()>(&key)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => self.enter_fallback("del", e),
                Err(elapsed) => self.enter_fallback("del", elapsed),
            }
        }
    }

    async fn health(&self) -> CacheHealth {
        let remote_reachable = match self.client.as_ref() {
            Some(client) => {
                // The probe ignores the current state on purpose: it is the
                // one path that can bring the remote tier back.
                let probe = async {
                    let mut conn = client.get_multiplexed_async_connection().await?;
                    redis::cmd("PING").query_async::<String>(&mut conn).await
                };
                match timeout(self.op_timeout, probe).await {
                    Ok(Ok(_pong)) => {
                        self.exit_fallback();
                        true
                    }
                    Ok(Err(e)) => {
                        self.enter_fallback("health", e);
                        false
                    }
                    Err(elapsed) => {
                        self.enter_fallback("health", elapsed);
                        false
                    }
                }
            }
            None => {
                debug!("no remote cache configured");
                false
            }
        };

        CacheHealth {
            remote_reachable,
            fallback_active: self.fallback_active.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fallback_serves_the_same_contract() {
        let cache = RedisFallbackCache::disconnected(1024);

        cache.set("k", "v", 60).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));

        cache.set("k", "v2", 60).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v2"));

        cache.del("k").await;
        assert_eq!(cache.get("k").await, None);
        // Deleting a missing key is not an error.
        cache.del("k").await;

        let health = cache.health().await;
        assert!(!health.remote_reachable);
        assert!(health.fallback_active);
    }

    #[tokio::test]
    async fn unreachable_remote_degrades_instead_of_erroring() {
        // Nothing listens on this port; every remote call fails fast.
        let client = redis::Client::open("redis://127.0.0.1:1/").unwrap();
        let cache =
            RedisFallbackCache::new(client, "test", Duration::from_millis(100), 1024);

        cache.set("k", "v", 60).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));

        let health = cache.health().await;
        assert!(!health.remote_reachable);
        assert!(health.fallback_active);
    }

    #[tokio::test]
    async fn fallback_entries_expire() {
        let cache = RedisFallbackCache::disconnected(1024);

        cache.set("gone", "v", 0).await;
        assert_eq!(cache.get("gone").await, None);

        cache.set("kept", "v", 60).await;
        assert_eq!(cache.get("kept").await.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn fallback_store_stays_bounded() {
        let cache = RedisFallbackCache::disconnected(4);

        for i in 0..20 {
            cache.set(&format!("k{}", i), "v", 60).await;
        }
        assert!(cache.fallback.len() <= 4);
    }
}
