use chrono::{DateTime, Utc};
use std::collections::HashMap;

// A single caller's position in its current window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitEntry {
    // Submissions accepted in the current window
    pub count: u32,
    // When the current window opened
    pub window_start: DateTime<Utc>,
}

// Storage for rate-limit entries, keyed by caller identifier.
// The limiter holds the policy, the store only keeps the entries.
pub trait RateLimitStore: Send + Sync {
    fn get(&self, identifier: &str) -> Option<RateLimitEntry>;

    // Returns false, storing nothing, when `identifier` is new and the store is full
    fn insert(&mut self, identifier: &str, entry: RateLimitEntry) -> bool;

    // Drop every entry whose window opened before `cutoff`, returns how many were dropped
    fn remove_expired(&mut self, cutoff: DateTime<Utc>) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Process-local store bounded to `max_entries` identifiers.
// Never evicts on its own: a full store refuses new identifiers until
// expired entries are removed.
pub struct InMemoryRateLimitStore {
    entries: HashMap<String, RateLimitEntry>,
    max_entries: usize,
}

impl InMemoryRateLimitStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries,
        }
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    fn get(&self, identifier: &str) -> Option<RateLimitEntry> {
        self.entries.get(identifier).copied()
    }

    fn insert(&mut self, identifier: &str, entry: RateLimitEntry) -> bool {
        if !self.entries.contains_key(identifier) && self.entries.len() >= self.max_entries {
            return false;
        }
        self.entries.insert(identifier.to_string(), entry);
        true
    }

    fn remove_expired(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.window_start >= cutoff);
        before - self.entries.len()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
