use chrono::Duration;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    config::{RateLimiterConfig, MAX_WINDOW_LENGTH},
    modules::{
        clock::Clock,
        rate_limit_store::{RateLimitEntry, RateLimitStore},
    },
};

// Store shared between the dispatcher and the sweeper
pub type SharedRateLimitStore = Arc<RwLock<Box<dyn RateLimitStore>>>;

pub fn shared_store<S: RateLimitStore + 'static>(store: S) -> SharedRateLimitStore {
    let boxed: Box<dyn RateLimitStore> = Box::new(store);
    Arc::new(RwLock::new(boxed))
}

// Fixed-window limiter: at most `max_submissions` per identifier per window.
// Bursts straddling a window boundary are let through.
#[derive(Clone)]
pub struct RateLimiter {

    // Entries for every identifier seen
    store: SharedRateLimitStore,

    // Time source, injected so windows can be tested
    clock: Arc<dyn Clock>,

    max_submissions: u32,

    window: Duration,
}

impl RateLimiter {
    pub fn new(store: SharedRateLimitStore, clock: Arc<dyn Clock>, config: &RateLimiterConfig) -> Self {
        Self {
            store,
            clock,
            max_submissions: config.max_submissions,
            // validate_config rejects longer windows, the clamp keeps the conversion in range
            window: Duration::seconds(config.window_length.min(MAX_WINDOW_LENGTH) as i64),
        }
    }

    // Returns true when the submission may proceed, and counts it.
    // The whole check-then-increment runs under the write lock.
    pub async fn check_and_consume(&self, identifier: &str) -> bool {
        let now = self.clock.now();

        let mut store = self.store.write().await;

        let entry = match store.get(identifier) {
            Some(entry) => entry,
            None => {
                let entry = RateLimitEntry { count: 1, window_start: now };
                if store.insert(identifier, entry) {
                    return true;
                }

                // Full: only closed windows may make room, open ones keep their count
                let removed = store.remove_expired(now - self.window);
                if store.insert(identifier, entry) {
                    log::debug!("Rate limit store full, dropped {} expired entries", removed);
                    return true;
                }

                log::warn!("Rate limit store full of open windows, refusing new caller {}", identifier);
                return false;
            }
        };

        // Window elapsed, start a new one
        if now - entry.window_start > self.window {
            store.insert(identifier, RateLimitEntry { count: 1, window_start: now });
            return true;
        }

        if entry.count >= self.max_submissions {
            return false;
        }

        store.insert(identifier, RateLimitEntry { count: entry.count + 1, ..entry });
        true
    }

    pub fn store(&self) -> SharedRateLimitStore {
        self.store.clone()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }
}
