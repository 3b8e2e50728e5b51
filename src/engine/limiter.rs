// src/engine/limiter.rs

//! Sliding-window launch rate limiter.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

const WINDOW: Duration = Duration::from_secs(1);

/// Allows at most `floor(rate)` launches (at least one) in any rolling
/// one-second window.
///
/// The bucket lock is held across the wait, so concurrent launch paths check
/// and record one after another and cannot over-admit.
#[derive(Debug)]
pub struct RateLimiter {
    limit: Option<usize>,
    bucket: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// `None`, zero, or negative rates disable limiting.
    pub fn new(rate_per_sec: Option<f64>) -> Self {
        let limit = rate_per_sec
            .filter(|r| r.is_finite() && *r > 0.0)
            .map(|r| (r.floor() as usize).max(1));
        Self {
            limit,
            bucket: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a launch is permitted, then record it.
    pub async fn acquire(&self) {
        let Some(limit) = self.limit else {
            return;
        };

        let mut bucket = self.bucket.lock().await;
        loop {
            let now = Instant::now();
            while bucket
                .front()
                .is_some_and(|t| now.duration_since(*t) >= WINDOW)
            {
                bucket.pop_front();
            }

            if bucket.len() < limit {
                break;
            }

            let Some(&oldest) = bucket.front() else {
                break;
            };
            let wake = oldest + WINDOW;
            trace!(wait = ?wake.duration_since(now), "rate limit reached; waiting");
            tokio::time::sleep_until(wake).await;
        }

        bucket.push_back(Instant::now());
    }
}
