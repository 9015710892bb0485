use crate::domain::types::ResourceListing;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Time-bounded cache of resource listings, keyed by scope (a server name or
/// the all-servers sentinel). Entries expire lazily on read; there is no
/// background eviction to cancel.
pub struct ResourceCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

struct CacheEntry {
    stored_at: Instant,
    resources: Vec<ResourceListing>,
}

impl ResourceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, scope: &str) -> Option<Vec<ResourceListing>> {
        let mut entries = self.entries.lock().expect("resource cache lock");
        match entries.get(scope) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.resources.clone()),
            Some(_) => {
                entries.remove(scope);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, scope: impl Into<String>, resources: Vec<ResourceListing>) {
        let mut entries = self.entries.lock().expect("resource cache lock");
        entries.insert(
            scope.into(),
            CacheEntry {
                stored_at: Instant::now(),
                resources,
            },
        );
    }

    /// Number of live (possibly stale) scopes currently held.
    pub fn scopes(&self) -> usize {
        self.entries.lock().expect("resource cache lock").len()
    }
}
