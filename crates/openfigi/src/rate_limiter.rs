//! Fixed-window rate limiter for outbound oracle requests.
//!
//! The oracle publishes its ceiling as "N requests per minute", so the limiter
//! counts requests in the current window and, once the ceiling is reached,
//! suspends callers until the window rolls over. The counter and window start
//! are shared by every concurrent caller of one client and mutated under a
//! single lock; the wait itself happens outside the lock.

use std::sync::{Mutex, MutexGuard};

use log::{debug, warn};
use tokio::time::{Duration, Instant};

use crate::config::RateLimitConfig;

#[derive(Debug)]
struct Window {
    /// When the current window opened.
    started_at: Instant,
    /// Requests dispatched in the current window.
    count: u32,
}

impl Window {
    /// Roll the window over if it has expired.
    fn roll(&mut self, now: Instant, length: Duration) {
        if now.duration_since(self.started_at) >= length {
            self.started_at = now;
            self.count = 0;
        }
    }

    fn time_until_reset(&self, now: Instant, length: Duration) -> Duration {
        (self.started_at + length).saturating_duration_since(now)
    }
}

/// Shared request counter guarding one oracle endpoint.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window_length: Duration,
    window: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            // A zero ceiling would block forever.
            max_requests: config.max_requests.max(1),
            window_length: config.window,
            window: Mutex::new(Window {
                started_at: Instant::now(),
                count: 0,
            }),
        }
    }

    /// Lock the window, recovering from poison if necessary.
    fn lock_window(&self) -> MutexGuard<'_, Window> {
        self.window.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Reserve one request slot, waiting for the window to reset if needed.
    pub async fn acquire(&self) {
        loop {
            let wait_time = {
                let mut window = self.lock_window();
                let now = Instant::now();
                window.roll(now, self.window_length);

                if window.count < self.max_requests {
                    window.count += 1;
                    debug!(
                        "Rate limiter: slot {}/{} in current window",
                        window.count, self.max_requests
                    );
                    return;
                }

                window.time_until_reset(now, self.window_length)
            };

            warn!(
                "Rate limit of {} requests reached, waiting {:.1}s",
                self.max_requests,
                wait_time.as_secs_f64()
            );
            tokio::time::sleep(wait_time).await;
        }
    }

    /// Reserve a slot without waiting. Returns false when the window is full.
    #[cfg(test)]
    fn try_acquire(&self) -> bool {
        let mut window = self.lock_window();
        window.roll(Instant::now(), self.window_length);
        if window.count < self.max_requests {
            window.count += 1;
            true
        } else {
            false
        }
    }

    /// Slots left in the current window.
    #[cfg(test)]
    fn remaining(&self) -> u32 {
        let mut window = self.lock_window();
        window.roll(Instant::now(), self.window_length);
        self.max_requests - window.count
    }
}
