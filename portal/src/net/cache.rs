//! Keyed response cache for read endpoints.
//!
//! Entries are keyed by resource name plus the query parameters of the read.
//! Mutations invalidate every entry of a resource at once, so a list fetched
//! with any page/search combination is refetched after a create or update.

#[cfg(test)]
#[path = "cache_test.rs"]
mod cache_test;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

/// Cache key: resource name first, then the read's parameters in order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub resource: String,
    pub params: Vec<(String, String)>,
}

impl QueryKey {
    #[must_use]
    pub fn new(resource: &str) -> Self {
        Self { resource: resource.to_owned(), params: Vec::new() }
    }

    #[must_use]
    pub fn with_params(resource: &str, params: &[(String, String)]) -> Self {
        Self { resource: resource.to_owned(), params: params.to_vec() }
    }
}

struct Entry {
    value: Value,
    stored_at: Instant,
}

/// Clone-shared cache; clones see the same entries.
#[derive(Clone)]
pub struct QueryCache {
    entries: Arc<Mutex<HashMap<QueryKey, Entry>>>,
    ttl: Duration,
}

impl QueryCache {
    /// A zero TTL disables caching: every read goes to the network.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { entries: Arc::new(Mutex::new(HashMap::new())), ttl }
    }

    #[must_use]
    pub fn get(&self, key: &QueryKey) -> Option<Value> {
        if self.ttl.is_zero() {
            return None;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let fresh = entries.get(key).is_some_and(|entry| entry.stored_at.elapsed() < self.ttl);
        if !fresh {
            entries.remove(key);
            return None;
        }
        debug!(resource = %key.resource, "query cache hit");
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store a read. Expired entries of any resource are pruned first.
    pub fn put(&self, key: QueryKey, value: Value) {
        if self.ttl.is_zero() {
            return;
        }
        let ttl = self.ttl;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        entries.insert(key, Entry { value, stored_at: Instant::now() });
    }

    /// Drop every entry for `resource`. Returns how many were removed.
    pub fn invalidate(&self, resource: &str) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|key, _| key.resource != resource);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(resource, removed, "query cache invalidated");
        }
        removed
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
