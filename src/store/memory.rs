use crate::core::cache::Cache;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

/// In-memory TTL cache. Cloning shares the underlying slots.
pub struct MemoryCache<K, V> {
    inner: Arc<Mutex<HashMap<K, Entry<V>>>>,
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let slots = self.inner.lock().await;
        slots.values().filter(|e| !e.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<K, V> Clone for MemoryCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync + Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        let mut slots = self.inner.lock().await;
        let expired = match slots.get(key) {
            Some(entry) if entry.is_expired(Instant::now()) => true,
            Some(entry) => {
                debug!("Cache HIT for key: {:?}", key);
                return Some(entry.value.clone());
            }
            None => false,
        };
        if expired {
            debug!("Cache entry expired for key: {:?}", key);
            slots.remove(key);
        } else {
            debug!("Cache MISS for key: {:?}", key);
        }
        None
    }

    async fn put(&self, key: K, value: V, ttl: Option<Duration>) {
        let expires_at = ttl.map(|duration| Instant::now() + duration);
        let mut slots = self.inner.lock().await;
        debug!("Cache PUT for key: {:?}", key);
        slots.insert(key, Entry { value, expires_at });
    }
}
