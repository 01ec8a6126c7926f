//! HTTP transport
//!
//! Sends each request as a GET to the API endpoint. Transient failures are
//! retried under a [`RetryPolicy`]: connection errors, timeouts, 429 and 5xx
//! statuses, and `maxlag` API errors, which the server raises while its
//! replicas lag behind and which carry a `Retry-After` header.

use super::rate_limit::{RateLimit, Throttle};
use super::Transport;
use crate::error::{Error, Result};
use crate::types::{BackoffType, JsonValue, QueryParams};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Used when a throttling response carries no usable `Retry-After`
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// How many times, and how long apart, failed requests are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial: Duration,
    /// Upper bound on any computed delay
    pub max: Duration,
    /// How the delay grows between retries
    pub backoff: BackoffType,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial: Duration::from_millis(100),
            max: Duration::from_secs(60),
            backoff: BackoffType::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`
    pub fn delay(&self, attempt: u32) -> Duration {
        let delay = match self.backoff {
            BackoffType::Constant => self.initial,
            BackoffType::Linear => self.initial.saturating_mul(attempt + 1),
            BackoffType::Exponential => self.initial.saturating_mul(2u32.saturating_pow(attempt)),
        };
        delay.min(self.max)
    }
}

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// API endpoint, e.g. `https://en.wikipedia.org/w/api.php`
    pub api_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retry behaviour for transient failures
    pub retry: RetryPolicy,
    /// Token bucket in front of every attempt (`None` disables it)
    pub rate_limit: Option<RateLimit>,
    /// Sent as the `maxlag` parameter on every request
    pub maxlag: Option<u32>,
    /// Extra headers for every request
    pub headers: HashMap<String, String>,
    /// `User-Agent` header, which Wikimedia sites require
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            rate_limit: Some(RateLimit::default()),
            maxlag: None,
            headers: HashMap::new(),
            user_agent: format!("{}/{}", crate::NAME, crate::VERSION),
        }
    }
}

impl HttpTransportConfig {
    /// Start building a configuration for `api_url`
    pub fn builder(api_url: impl Into<String>) -> HttpTransportConfigBuilder {
        HttpTransportConfigBuilder {
            config: HttpTransportConfig {
                api_url: api_url.into(),
                ..Default::default()
            },
        }
    }
}

/// Builder for [`HttpTransportConfig`]
#[derive(Debug)]
pub struct HttpTransportConfigBuilder {
    config: HttpTransportConfig,
}

impl HttpTransportConfigBuilder {
    /// Per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Retries after the first attempt
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.retry.max_retries = retries;
        self
    }

    /// Backoff shape and bounds
    pub fn backoff(mut self, backoff: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.retry.backoff = backoff;
        self.config.retry.initial = initial;
        self.config.retry.max = max;
        self
    }

    /// Throttle requests through a token bucket
    pub fn rate_limit(mut self, limit: RateLimit) -> Self {
        self.config.rate_limit = Some(limit);
        self
    }

    /// Send requests unthrottled
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Ask the server to refuse requests while replication lags by more
    /// than `seconds`
    pub fn maxlag(mut self, seconds: u32) -> Self {
        self.config.maxlag = Some(seconds);
        self
    }

    /// Add a header to every request
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(key.into(), value.into());
        self
    }

    /// Override the `User-Agent`
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Finish
    pub fn build(self) -> HttpTransportConfig {
        self.config
    }
}

/// What one attempt amounted to
enum Attempt {
    Done(JsonValue),
    /// Worth retrying; `wait` overrides the policy's backoff
    Retry { error: Error, wait: Option<Duration> },
    Fail(Error),
}

/// Transport that talks to a live API endpoint over HTTP
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    config: HttpTransportConfig,
    throttle: Option<Throttle>,
}

impl HttpTransport {
    /// Create a transport from its configuration
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.api_url)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;
        let throttle = config.rate_limit.as_ref().map(Throttle::new);

        Ok(Self {
            client,
            endpoint,
            config,
            throttle,
        })
    }

    /// The API endpoint
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The retry policy in effect
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.config.retry
    }

    /// Whether requests pass through a token bucket
    pub fn is_throttled(&self) -> bool {
        self.throttle.is_some()
    }

    async fn attempt(&self, params: &QueryParams) -> Attempt {
        if let Some(throttle) = &self.throttle {
            throttle.wait().await;
        }

        let mut request = self.client.get(self.endpoint.clone()).query(params);
        if let Some(lag) = self.config.maxlag {
            request = request.query(&[("maxlag", lag)]);
        }
        for (key, value) in &self.config.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Attempt::Retry {
                    error: Error::Timeout {
                        timeout_ms: self.config.timeout.as_millis() as u64,
                    },
                    wait: None,
                }
            }
            Err(e) if e.is_connect() => {
                return Attempt::Retry {
                    error: Error::Http(e),
                    wait: None,
                }
            }
            Err(e) => return Attempt::Fail(Error::Http(e)),
        };

        let status = response.status();
        let retry_after = retry_after(response.headers());

        if status == StatusCode::TOO_MANY_REQUESTS {
            let seconds = retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Attempt::Retry {
                error: Error::RateLimited {
                    retry_after_seconds: seconds,
                },
                wait: Some(Duration::from_secs(seconds)),
            };
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = Error::http_status(status.as_u16(), body);
            return if error.is_retryable() {
                Attempt::Retry { error, wait: None }
            } else {
                Attempt::Fail(error)
            };
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Attempt::Fail(Error::Http(e)),
        };
        let document: JsonValue = match serde_json::from_str(&body) {
            Ok(document) => document,
            Err(e) => {
                return Attempt::Fail(Error::malformed(format!(
                    "response body is not JSON: {e}"
                )))
            }
        };

        if error_code(&document) == Some("maxlag") {
            let seconds = retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Attempt::Retry {
                error: Error::RateLimited {
                    retry_after_seconds: seconds,
                },
                wait: Some(Duration::from_secs(seconds)),
            };
        }
        Attempt::Done(document)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, params: &QueryParams) -> Result<JsonValue> {
        let policy = self.config.retry;
        let mut attempt = 0;
        loop {
            match self.attempt(params).await {
                Attempt::Done(document) => {
                    debug!(endpoint = %self.endpoint, attempt, "Request succeeded");
                    return Ok(document);
                }
                Attempt::Fail(error) => return Err(error),
                Attempt::Retry { error, .. } if attempt >= policy.max_retries => {
                    return Err(error)
                }
                Attempt::Retry { error, wait } => {
                    let delay = wait.unwrap_or_else(|| policy.delay(attempt));
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = policy.max_retries,
                        ?delay,
                        "Retrying after: {error}"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint.as_str())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// `Retry-After` in whole seconds (the HTTP-date form is not used by the API)
fn retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

fn error_code(document: &JsonValue) -> Option<&str> {
    document
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(JsonValue::as_str)
}
