use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::db::conversations::FilterOptions;

/// Concurrent map whose entries expire after a fixed TTL.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: DashMap<K, (Instant, V)>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.entries.get(key)?;
        let (stored_at, value) = entry.value();
        if stored_at.elapsed() < self.ttl {
            return Some(value.clone());
        }
        drop(entry);
        self.entries.remove(key);
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, (Instant::now(), value));
    }

    /// Cached value for `key`, loading and storing it on a miss.
    /// Concurrent misses may both load; the last one wins.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = load().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The application's shared caches.
pub struct Caches {
    /// External UUID -> e-mail, for labelling sellers.
    pub emails: TtlCache<(), Arc<HashMap<String, String>>>,
    /// Conversation filter options per tenant (`None` for all tenants).
    pub filter_options: TtlCache<Option<String>, FilterOptions>,
}

impl Caches {
    pub fn new(ttl: Duration) -> Self {
        Self {
            emails: TtlCache::new(ttl),
            filter_options: TtlCache::new(ttl),
        }
    }

    pub fn clear(&self) {
        self.emails.clear();
        self.filter_options.clear();
        tracing::info!("Caches cleared");
    }
}
