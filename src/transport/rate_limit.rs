//! Client-side request throttling
//!
//! A token bucket from the `governor` crate, shared by every request a
//! transport sends, so that concurrent logical requests together stay
//! under the configured rate.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Token bucket settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimit {
    /// Sustained requests per second
    pub per_second: u32,
    /// Requests allowed back to back before throttling starts
    #[serde(default = "default_burst")]
    pub burst: u32,
}

fn default_burst() -> u32 {
    1
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            per_second: 10,
            burst: default_burst(),
        }
    }
}

impl RateLimit {
    /// `per_second` requests per second with bursts of `burst`
    pub fn new(per_second: u32, burst: u32) -> Self {
        Self { per_second, burst }
    }

    fn quota(&self) -> Quota {
        // zero would stall forever; clamp to one
        let clamp = |n: u32| NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN);
        Quota::per_second(clamp(self.per_second)).allow_burst(clamp(self.burst))
    }
}

/// Cloneable handle to one token bucket
#[derive(Clone)]
pub struct Throttle {
    bucket: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl Throttle {
    /// A fresh, full bucket
    pub fn new(limit: &RateLimit) -> Self {
        Self {
            bucket: Arc::new(RateLimiter::direct(limit.quota())),
        }
    }

    /// Wait for a token
    pub async fn wait(&self) {
        self.bucket.until_ready().await;
    }

    /// Take a token if one is available right now
    pub fn try_take(&self) -> bool {
        self.bucket.check().is_ok()
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle").finish_non_exhaustive()
    }
}
