use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Sliding-window limiter keyed by client address.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    requests: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Returns Ok(()) if allowed, Err with seconds until the next
    /// slot frees up if rate limited.
    pub async fn check(&self, client: &str) -> Result<(), u64> {
        let mut map = self.requests.lock().await;
        let now = Instant::now();
        let entry = map.entry(client.to_string()).or_default();

        // Evict expired entries
        while entry
            .front()
            .is_some_and(|t| now.duration_since(*t) > self.window)
        {
            entry.pop_front();
        }

        if entry.len() >= self.max_requests {
            let oldest = entry.front().expect("nonempty window");
            let retry_after = self
                .window
                .as_secs()
                .saturating_sub(now.duration_since(*oldest).as_secs());
            return Err(retry_after.max(1));
        }

        entry.push_back(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn limits_after_the_window_fills() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.check("a").await.is_ok());
        assert!(limiter.check("a").await.is_ok());
        assert!(limiter.check("a").await.is_err());
        // Separate clients have separate windows.
        assert!(limiter.check("b").await.is_ok());
    }
}
