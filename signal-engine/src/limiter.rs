//! A direct (non-keyed) rate limiter for the execution forwarder's outbound
//! RPC rate, grounded on the teacher's `tesser-broker::limiter::RateLimiter`
//! but trimmed to the single-quota case C6 needs — the forwarder has no
//! per-key identifier to shard on.

use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota};

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<DefaultDirectRateLimiter>,
}

impl RateLimiter {
    pub fn new(quota: Quota) -> Self {
        RateLimiter {
            inner: Arc::new(DefaultDirectRateLimiter::direct(quota)),
        }
    }

    pub async fn until_ready(&self) {
        self.inner.until_ready().await;
    }
}
