use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheHealth {
    pub remote_reachable: bool,
    pub fallback_active: bool,
}

/// Process-wide key-value cache. The signatures are infallible on purpose:
/// the cache is a latency optimization, so every failure inside an
/// implementation degrades to a miss or to the fallback store instead of
/// surfacing. No caller may treat a miss as an authoritative "does not
/// exist".
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    async fn set(&self, key: &str, value: &str, ttl_secs: u64);

    /// Idempotent; deleting a missing key is not an error.
    async fn del(&self, key: &str);

    /// Probes the remote store and reports which tier currently serves
    /// reads. A successful probe switches back to the remote tier.
    async fn health(&self) -> CacheHealth;
}
