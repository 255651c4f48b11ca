use tokio::time::{
    Duration,
    sleep,
};

use crate::{
    config,
    modules::rate_limiter::RateLimiter,
};

// Periodically removes rate-limit entries whose window has closed,
// so the store does not grow by one entry per caller forever
pub struct RateLimitSweeper {

    // Limiter whose store is swept
    limiter: RateLimiter,

    // Configuration for the sweep interval
    config: config::RateLimiterConfig,
}

impl RateLimitSweeper {

    pub fn new(limiter: RateLimiter, config: config::RateLimiterConfig) -> Self {
        Self {
            limiter,
            config,
        }
    }

    // Sweep loop, runs for the lifetime of the process
    pub async fn start_sweeping(&self) {
        log::info!("Rate limit sweeper started, interval {}s", self.config.sweep_interval);
        loop {
            sleep(Duration::from_secs(self.config.sweep_interval)).await;
            self.sweep().await;
        }
    }

    // One pass, returns the number of entries removed
    pub async fn sweep(&self) -> usize {
        let cutoff = self.limiter.clock().now() - self.limiter.window();

        let store = self.limiter.store();
        let (removed, remaining) = { // Acquire write lock
            let mut store = store.write().await;
            let removed = store.remove_expired(cutoff);
            (removed, store.len())
        }; // Release the write lock

        if removed > 0 {
            log::debug!("Swept {} expired rate limit entries, {} remaining", removed, remaining);
        }
        removed
    }
}
