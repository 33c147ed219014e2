use std::sync::Arc;

use crate::cache::ResponseCache;
use crate::rate_limit::RateLimiter;
use crate::store::EntityStore;

// app's shared state
pub struct AppState {
    pub store: Arc<dyn EntityStore>,    // hosted backend (or in-memory stand-in)
    pub rate_limiter: Arc<RateLimiter>, // shared with the sweeper task
    pub cache: Arc<ResponseCache>,      // public read responses
}

impl AppState {
    pub fn new(
        store: Arc<dyn EntityStore>,
        rate_limiter: Arc<RateLimiter>,
        cache: Arc<ResponseCache>,
    ) -> Self {
        Self {
            store,
            rate_limiter,
            cache,
        }
    }
}
