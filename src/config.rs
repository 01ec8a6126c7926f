//! Configuration for aggregation
//!
//! [`QueryOptions`] is the immutable configuration threaded through every
//! logical request. Per-call [`OptionOverrides`] are merged over it at the
//! call boundary, so no request ever observes another's settings.
//!
//! [`AggregateConfig`] is the file form (YAML or JSON) used by the CLI.

use crate::error::{Error, Result};
use crate::guard::EmptyResponseGovernor;
use crate::locate::{Page, Revision};
use crate::merge::{ConflictResolver, KeepEarlierScalars, PreferLater, Strict};
use crate::order;
use crate::transport::{HttpTransportConfig, RateLimit};
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Orders the pages of one batch
pub type PageComparator = Arc<dyn Fn(&Page, &Page) -> Ordering + Send + Sync>;

/// Orders the revisions of one batch
pub type RevisionComparator = Arc<dyn Fn(&Revision, &Revision) -> Ordering + Send + Sync>;

// ============================================================================
// Query Options
// ============================================================================

/// Read-only options for one logical request
#[derive(Clone)]
pub struct QueryOptions {
    conflict_resolver: Arc<dyn ConflictResolver>,
    compare_pages: Option<PageComparator>,
    compare_revisions: Option<RevisionComparator>,
    max_empty_responses: Option<u32>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            conflict_resolver: Arc::new(KeepEarlierScalars),
            compare_pages: None,
            compare_revisions: None,
            max_empty_responses: None,
        }
    }
}

impl QueryOptions {
    /// Default options: keep-earlier conflict resolution, no sorting, no limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the conflict resolver
    #[must_use]
    pub fn with_conflict_resolver(mut self, resolver: impl ConflictResolver + 'static) -> Self {
        self.conflict_resolver = Arc::new(resolver);
        self
    }

    /// Sort each batch's pages with `compare`
    #[must_use]
    pub fn with_page_order(
        mut self,
        compare: impl Fn(&Page, &Page) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        self.compare_pages = Some(Arc::new(compare));
        self
    }

    /// Sort each batch's revisions with `compare`
    #[must_use]
    pub fn with_revision_order(
        mut self,
        compare: impl Fn(&Revision, &Revision) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        self.compare_revisions = Some(Arc::new(compare));
        self
    }

    /// Fail after more than `limit` consecutive empty responses
    #[must_use]
    pub fn with_max_empty_responses(mut self, limit: u32) -> Self {
        self.max_empty_responses = Some(limit);
        self
    }

    /// The conflict resolver
    pub fn conflict_resolver(&self) -> &dyn ConflictResolver {
        self.conflict_resolver.as_ref()
    }

    /// The page comparator, if pages are sorted
    pub fn compare_pages(&self) -> Option<&PageComparator> {
        self.compare_pages.as_ref()
    }

    /// The revision comparator, if revisions are sorted
    pub fn compare_revisions(&self) -> Option<&RevisionComparator> {
        self.compare_revisions.as_ref()
    }

    /// Consecutive empty response limit
    pub fn max_empty_responses(&self) -> Option<u32> {
        self.max_empty_responses
    }

    /// A fresh governor for one logical request
    pub fn governor(&self) -> EmptyResponseGovernor {
        EmptyResponseGovernor::new(self.max_empty_responses)
    }

    /// The effective options for one call
    #[must_use]
    pub fn merged(&self, overrides: &OptionOverrides) -> QueryOptions {
        let mut merged = self.clone();
        if let Some(resolver) = &overrides.conflict_resolver {
            merged.conflict_resolver = Arc::clone(resolver);
        }
        if let Some(compare) = &overrides.compare_pages {
            merged.compare_pages.clone_from(compare);
        }
        if let Some(compare) = &overrides.compare_revisions {
            merged.compare_revisions.clone_from(compare);
        }
        if let Some(limit) = overrides.max_empty_responses {
            merged.max_empty_responses = limit;
        }
        merged
    }
}

impl std::fmt::Debug for QueryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryOptions")
            .field("sorts_pages", &self.compare_pages.is_some())
            .field("sorts_revisions", &self.compare_revisions.is_some())
            .field("max_empty_responses", &self.max_empty_responses)
            .finish_non_exhaustive()
    }
}

/// Per-call changes to [`QueryOptions`]; unset fields inherit
#[derive(Clone, Default)]
pub struct OptionOverrides {
    conflict_resolver: Option<Arc<dyn ConflictResolver>>,
    compare_pages: Option<Option<PageComparator>>,
    compare_revisions: Option<Option<RevisionComparator>>,
    max_empty_responses: Option<Option<u32>>,
}

impl OptionOverrides {
    /// No overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different conflict resolver
    #[must_use]
    pub fn conflict_resolver(mut self, resolver: impl ConflictResolver + 'static) -> Self {
        self.conflict_resolver = Some(Arc::new(resolver));
        self
    }

    /// Sort pages with `compare`
    #[must_use]
    pub fn page_order(
        mut self,
        compare: impl Fn(&Page, &Page) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        self.compare_pages = Some(Some(Arc::new(compare)));
        self
    }

    /// Keep pages in first-occurrence order
    #[must_use]
    pub fn no_page_order(mut self) -> Self {
        self.compare_pages = Some(None);
        self
    }

    /// Sort revisions with `compare`
    #[must_use]
    pub fn revision_order(
        mut self,
        compare: impl Fn(&Revision, &Revision) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        self.compare_revisions = Some(Some(Arc::new(compare)));
        self
    }

    /// Keep revisions in encounter order
    #[must_use]
    pub fn no_revision_order(mut self) -> Self {
        self.compare_revisions = Some(None);
        self
    }

    /// Limit consecutive empty responses
    #[must_use]
    pub fn max_empty_responses(mut self, limit: u32) -> Self {
        self.max_empty_responses = Some(Some(limit));
        self
    }

    /// Lift any consecutive empty response limit
    #[must_use]
    pub fn unbounded_empty_responses(mut self) -> Self {
        self.max_empty_responses = Some(None);
        self
    }
}

// ============================================================================
// File Configuration
// ============================================================================

/// Complete configuration loaded from YAML or JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregateConfig {
    /// API endpoint
    #[serde(default)]
    pub api_url: Option<String>,

    /// User agent sent with every request
    #[serde(default)]
    pub user_agent: Option<String>,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpSettings,

    /// Aggregation settings
    #[serde(default)]
    pub aggregation: AggregationSettings,
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpSettings {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum retries of transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff strategy
    #[serde(default)]
    pub backoff: BackoffType,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Token bucket settings (`null` disables rate limiting)
    #[serde(default = "default_rate_limit")]
    pub rate_limit: Option<RateLimit>,

    /// `maxlag` parameter in seconds, sent on every request
    #[serde(default)]
    pub maxlag: Option<u32>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff: BackoffType::default(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            rate_limit: default_rate_limit(),
            maxlag: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

fn default_rate_limit() -> Option<RateLimit> {
    Some(RateLimit::default())
}

/// Aggregation settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregationSettings {
    /// Consecutive empty response limit (absent = unbounded)
    #[serde(default)]
    pub max_empty_responses: Option<u32>,

    /// How scalar conflicts are resolved
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,

    /// Ordering of each batch's pages
    #[serde(default)]
    pub page_order: PageOrder,

    /// Ordering of each batch's revisions
    #[serde(default)]
    pub revision_order: RevisionOrder,
}

/// Stock conflict resolution policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Keep the earlier of two strings or two numbers, fail otherwise
    #[default]
    KeepEarlier,
    /// Fail on every disagreement
    Strict,
    /// Keep the later of two strings or two numbers, fail otherwise
    PreferLater,
}

/// Stock page orderings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageOrder {
    /// First-occurrence order
    #[default]
    None,
    /// By title
    Title,
    /// By numeric page id
    PageId,
}

/// Stock revision orderings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionOrder {
    /// Encounter order
    #[default]
    None,
    /// By numeric revision id
    RevId,
    /// By timestamp, then revision id
    Timestamp,
}

impl AggregateConfig {
    /// Load configuration from a YAML or JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::config(format!(
                    "Failed to read config file '{}': {e}",
                    path.display()
                ))
            }
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML (JSON is accepted as a subset)
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but cannot work
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.api_url {
            url::Url::parse(url).map_err(|e| Error::invalid_value("api_url", e.to_string()))?;
        }
        if self.http.timeout_secs == 0 {
            return Err(Error::invalid_value("http.timeout_secs", "must be positive"));
        }
        if self.http.initial_backoff_ms > self.http.max_backoff_ms {
            return Err(Error::invalid_value(
                "http.initial_backoff_ms",
                "must not exceed http.max_backoff_ms",
            ));
        }
        Ok(())
    }

    /// Build the query options this configuration describes
    pub fn to_options(&self) -> QueryOptions {
        let settings = &self.aggregation;
        let mut options = match settings.conflict_policy {
            ConflictPolicy::KeepEarlier => QueryOptions::new(),
            ConflictPolicy::Strict => QueryOptions::new().with_conflict_resolver(Strict),
            ConflictPolicy::PreferLater => QueryOptions::new().with_conflict_resolver(PreferLater),
        };
        options = match settings.page_order {
            PageOrder::None => options,
            PageOrder::Title => options.with_page_order(order::pages_by_title),
            PageOrder::PageId => options.with_page_order(order::pages_by_id),
        };
        options = match settings.revision_order {
            RevisionOrder::None => options,
            RevisionOrder::RevId => options.with_revision_order(order::revisions_by_id),
            RevisionOrder::Timestamp => options.with_revision_order(order::revisions_by_timestamp),
        };
        if let Some(limit) = settings.max_empty_responses {
            options = options.with_max_empty_responses(limit);
        }
        options
    }

    /// Build the HTTP transport configuration, `api_url` overriding the file
    pub fn transport_config(&self, api_url: Option<&str>) -> Result<HttpTransportConfig> {
        let url = api_url
            .or(self.api_url.as_deref())
            .ok_or_else(|| Error::config("No API endpoint configured (use --api or api_url)"))?;

        let http = &self.http;
        let mut builder = HttpTransportConfig::builder(url)
            .timeout(Duration::from_secs(http.timeout_secs))
            .max_retries(http.max_retries)
            .backoff(
                http.backoff,
                Duration::from_millis(http.initial_backoff_ms),
                Duration::from_millis(http.max_backoff_ms),
            );
        builder = match &http.rate_limit {
            Some(limit) => builder.rate_limit(limit.clone()),
            None => builder.no_rate_limit(),
        };
        if let Some(lag) = http.maxlag {
            builder = builder.maxlag(lag);
        }
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent);
        }
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn page(value: serde_json::Value) -> Page {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_default_options() {
        let options = QueryOptions::default();
        assert!(options.compare_pages().is_none());
        assert!(options.compare_revisions().is_none());
        assert!(options.max_empty_responses().is_none());
        assert!(options.governor().limit().is_none());
    }

    #[test]
    fn test_overrides_set_and_clear() {
        let base = QueryOptions::new()
            .with_page_order(order::pages_by_title)
            .with_max_empty_responses(5);

        let merged = base.merged(&OptionOverrides::new().max_empty_responses(2));
        assert_eq!(merged.max_empty_responses(), Some(2));
        assert!(merged.compare_pages().is_some());

        let merged = base.merged(
            &OptionOverrides::new()
                .no_page_order()
                .unbounded_empty_responses(),
        );
        assert!(merged.compare_pages().is_none());
        assert!(merged.max_empty_responses().is_none());

        // the base is untouched
        assert_eq!(base.max_empty_responses(), Some(5));
        assert!(base.compare_pages().is_some());
    }

    #[test]
    fn test_override_page_order_is_used() {
        let merged = QueryOptions::new()
            .merged(&OptionOverrides::new().page_order(|a: &Page, b: &Page| b.title().cmp(&a.title())));
        let compare = merged.compare_pages().unwrap();
        let a = page(json!({"title": "A"}));
        let b = page(json!({"title": "B"}));
        assert_eq!(compare(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_config_from_yaml() {
        let config = AggregateConfig::from_yaml(
            r"
api_url: https://en.wikipedia.org/w/api.php
user_agent: test-agent/1.0
http:
  max_retries: 5
  rate_limit: null
  maxlag: 5
aggregation:
  max_empty_responses: 4
  conflict_policy: strict
  page_order: page_id
  revision_order: timestamp
",
        )
        .unwrap();

        assert_eq!(config.http.max_retries, 5);
        assert_eq!(config.http.timeout_secs, 30);
        assert!(config.http.rate_limit.is_none());
        assert_eq!(config.aggregation.conflict_policy, ConflictPolicy::Strict);

        let options = config.to_options();
        assert_eq!(options.max_empty_responses(), Some(4));
        assert!(options.compare_pages().is_some());
        assert!(options.compare_revisions().is_some());

        let transport = config.transport_config(None).unwrap();
        assert_eq!(transport.api_url, "https://en.wikipedia.org/w/api.php");
        assert_eq!(transport.user_agent, "test-agent/1.0");
        assert!(transport.rate_limit.is_none());
        assert_eq!(transport.maxlag, Some(5));
        assert_eq!(transport.retry.max_retries, 5);

        let transport = config
            .transport_config(Some("https://de.wikipedia.org/w/api.php"))
            .unwrap();
        assert_eq!(transport.api_url, "https://de.wikipedia.org/w/api.php");
    }

    #[test]
    fn test_config_defaults_and_json() {
        let config = AggregateConfig::from_yaml(r#"{"aggregation": {}}"#).unwrap();
        assert_eq!(config, AggregateConfig::default());
        assert!(config.http.rate_limit.is_some());
        assert!(config.transport_config(None).is_err());
    }

    #[test]
    fn test_config_rejects_unknown_and_invalid() {
        assert!(matches!(
            AggregateConfig::from_yaml("aggregation:\n  max_empties: 3\n"),
            Err(Error::YamlParse(_))
        ));
        assert!(matches!(
            AggregateConfig::from_yaml("api_url: not a url\n"),
            Err(Error::InvalidConfigValue { .. })
        ));
        assert!(matches!(
            AggregateConfig::from_yaml("http:\n  initial_backoff_ms: 10\n  max_backoff_ms: 1\n"),
            Err(Error::InvalidConfigValue { .. })
        ));
    }

    #[test]
    fn test_config_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "aggregation:\n  conflict_policy: prefer_later").unwrap();
        let config = AggregateConfig::load(file.path()).unwrap();
        assert_eq!(config.aggregation.conflict_policy, ConflictPolicy::PreferLater);

        assert!(matches!(
            AggregateConfig::load("/nonexistent/config.yaml"),
            Err(Error::FileNotFound { .. })
        ));
    }
}
