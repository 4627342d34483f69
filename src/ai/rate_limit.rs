use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{AppError, AppResult};

/// Default quota: 10 requests per rolling minute per service
pub const DEFAULT_MAX_REQUESTS: usize = 10;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window request counter, one independent window per service key
///
/// A pure counter over a rolling interval: no token-bucket smoothing.
/// Entries older than the window are dropped lazily on each check.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    windows: Mutex<HashMap<String, Vec<Instant>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Admits or rejects one request for the given service.
    ///
    /// On rejection the error carries how long until the oldest recorded
    /// request leaves the window, so the caller can decide to skip the AI
    /// path entirely rather than wait.
    pub fn check(&self, service_key: &str) -> AppResult<()> {
        let now = Instant::now();
        let mut windows = self.windows.lock().expect("rate limiter lock poisoned");
        let stamps = windows.entry(service_key.to_string()).or_default();

        stamps.retain(|stamp| now.duration_since(*stamp) < self.window);

        if stamps.len() >= self.max_requests {
            // stamps are in insertion order; the first is the oldest
            let oldest = stamps[0];
            let wait = self.window - now.duration_since(oldest);
            tracing::warn!(
                service = service_key,
                in_window = stamps.len(),
                wait_ms = wait.as_millis() as u64,
                "Rate limit hit"
            );
            return Err(AppError::RateLimited { wait });
        }

        stamps.push(now);
        Ok(())
    }
}
