//! Transport module
//!
//! The transport issues exactly one API request per call and returns the
//! raw response document. Continuation, lookup and merging happen above it.
//!
//! # Implementations
//!
//! - [`HttpTransport`]: reqwest GET with retry, backoff, `maxlag` and throttling
//! - [`ReplayTransport`]: serves recorded responses in order

mod http;
mod rate_limit;
mod replay;

pub use http::{HttpTransport, HttpTransportConfig, HttpTransportConfigBuilder, RetryPolicy};
pub use rate_limit::{RateLimit, Throttle};
pub use replay::ReplayTransport;

use crate::error::Result;
use crate::types::{JsonValue, QueryParams};
use async_trait::async_trait;

/// Issues one request and returns the response document
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a single request with the given parameters
    async fn request(&self, params: &QueryParams) -> Result<JsonValue>;
}

#[cfg(test)]
mod tests;
