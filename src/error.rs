//! Error types for mw-aggregate
//!
//! One [`Error`] enum covers the crate. The first group is raised by the
//! aggregation engine itself and is never retryable; the transport group is
//! what [`Error::is_retryable`] reasons about.

use thiserror::Error;

/// The main error type for mw-aggregate
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Aggregation
    // ============================================================================
    /// Two partial entities disagree in a way the resolver rejects
    #[error("Cannot merge {path}: {base} vs. {incremental}")]
    MergeConflict {
        /// Dotted attribute path, e.g. `a.b.c`
        path: String,
        /// Description of the accumulated value
        base: String,
        /// Description of the incoming value
        incremental: String,
    },

    /// More consecutive empty responses than the request allows
    #[error("Too many consecutive empty responses ({consecutive}, limit {limit})")]
    TooManyEmptyResponses {
        /// Configured bound
        limit: u32,
        /// Consecutive empty responses seen
        consecutive: u32,
    },

    /// The continuation ended while an entity or batch was still open
    #[error("Continuation ended before aggregation completed: {message}")]
    ProtocolExhaustion {
        /// What was left open
        message: String,
    },

    /// The request would not let aggregation terminate correctly
    #[error("Invalid request shape: {message}")]
    InvalidRequestShape {
        /// Which rule the request broke
        message: String,
    },

    // ============================================================================
    // Response documents
    // ============================================================================
    /// The API answered with an `error` object
    #[error("API error {code}: {info}")]
    Api {
        /// Machine-readable code, e.g. `badtitle`
        code: String,
        /// Human-readable explanation
        info: String,
    },

    /// The document parsed but has an unusable structure
    #[error("Malformed response: {message}")]
    MalformedResponse {
        /// What was wrong
        message: String,
    },

    /// A body or recording is not JSON
    #[error("Invalid JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Configuration
    // ============================================================================
    /// Configuration is missing or inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong
        message: String,
    },

    /// A configuration value parsed but cannot work
    #[error("Invalid value for '{field}': {message}")]
    InvalidConfigValue {
        /// Dotted key, e.g. `http.timeout_secs`
        field: String,
        /// Why the value was rejected
        message: String,
    },

    /// The configuration file is not valid YAML for this schema
    #[error("Invalid configuration file: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// The endpoint is not a URL
    #[error("Invalid API endpoint: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Transport
    // ============================================================================
    /// The request could not be sent or its body not read
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// Status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// Throttled by HTTP 429 or a `maxlag` refusal
    #[error("Throttled by the server, retry after {retry_after_seconds}s")]
    RateLimited {
        /// Seconds the server asked us to wait
        retry_after_seconds: u64,
    },

    /// No response within the configured timeout
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout in effect
        timeout_ms: u64,
    },

    // ============================================================================
    // Files
    // ============================================================================
    /// Reading a file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration or replay file does not exist
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path as given
        path: String,
    },

    // ============================================================================
    // Other
    // ============================================================================
    /// An error prefixed with context
    #[error("{0}")]
    Other(String),

    /// Errors from user-supplied resolvers and comparators
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a merge conflict error
    pub fn merge_conflict(
        path: impl Into<String>,
        base: impl Into<String>,
        incremental: impl Into<String>,
    ) -> Self {
        Self::MergeConflict {
            path: path.into(),
            base: base.into(),
            incremental: incremental.into(),
        }
    }

    /// Create a protocol exhaustion error
    pub fn exhausted(message: impl Into<String>) -> Self {
        Self::ProtocolExhaustion {
            message: message.into(),
        }
    }

    /// Create an invalid request shape error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequestShape {
            message: message.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }

    /// Whether the aggregation engine raised this error
    pub fn is_aggregation_error(&self) -> bool {
        matches!(
            self,
            Error::MergeConflict { .. }
                | Error::TooManyEmptyResponses { .. }
                | Error::ProtocolExhaustion { .. }
                | Error::InvalidRequestShape { .. }
        )
    }
}

/// Result type alias for mw-aggregate
pub type Result<T> = std::result::Result<T, Error>;

/// Prefix an error with what was being attempted
pub trait ResultExt<T> {
    /// Prefix with the message `f` builds, only on error
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| Error::Other(format!("{}: {}", f(), e.into())))
    }
}
