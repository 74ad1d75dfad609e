//! Read-through cache abstraction used by the upstream providers.

use async_trait::async_trait;
use std::time::Duration;

/// A keyed cache whose entries may carry an expiry.
///
/// Entries put with `ttl = None` never expire. Expired entries are
/// never returned from `get`.
#[async_trait]
pub trait Cache<K, V>: Send + Sync {
    async fn get(&self, key: &K) -> Option<V>;
    async fn put(&self, key: K, value: V, ttl: Option<Duration>);
}
