use std::sync::Arc;
use std::time::Duration;

use crate::engine::Engine;

use super::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        let config = engine.config();
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_max_requests,
            Duration::from_millis(config.rate_limit_window_ms),
        ));
        AppState {
            engine: Arc::new(engine),
            rate_limiter,
        }
    }
}
