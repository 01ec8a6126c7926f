//! # mw-aggregate
//!
//! Incremental aggregation of continued MediaWiki query responses into
//! complete pages and revisions.
//!
//! ## Features
//!
//! - **Entity location**: titles resolved through normalization and
//!   redirect chains, decimal-exact page and revision ids
//! - **Deep merge**: partial entities merged across continued responses
//!   under a pluggable conflict policy
//! - **Governed continuation**: runs of empty responses bounded per request
//! - **Batch aggregation**: generator results merged and ordered per batch
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mw_aggregate::{HttpTransport, HttpTransportConfig, OptionOverrides, QueryClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = HttpTransportConfig::builder("https://en.wikipedia.org/w/api.php").build();
//!     let client = QueryClient::new(HttpTransport::new(config)?);
//!
//!     let mut params = mw_aggregate::QueryParams::new();
//!     params.insert("prop".into(), "links|categories".into());
//!     let page = client
//!         .full_page_by_title("Main Page", params, &OptionOverrides::new())
//!         .await?;
//!
//!     println!("{}", serde_json::to_string_pretty(&page)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          QueryClient                            │
//! │  full_page_by_title/id   full_revision_by_id   full_pages ...   │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────┬───────────────┴──────┬──────────────┬───────────┐
//! │ Continuation │      Engine          │   Locate     │   Merge   │
//! ├──────────────┼──────────────────────┼──────────────┼───────────┤
//! │ continue     │ EntityDriver         │ Titles       │ Deep merge│
//! │ tokens       │ RevisionSearch       │ Page ids     │ Conflict  │
//! │ Replay       │ BatchAggregator      │ Revisions    │ resolvers │
//! │              │ EmptyResponseGovernor│              │           │
//! └──────────────┴──────────────────────┴──────────────┴───────────┘
//!                                │
//!                     Transport (HTTP / replay)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
// Allow common clippy pedantic lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Response document ingestion
pub mod response;

/// Title resolution and entity lookup
pub mod locate;

/// Deep merge of partial entities
pub mod merge;

/// Consecutive empty response bound
pub mod guard;

/// Pull-based response sources
pub mod continuation;

/// Continuation drivers and batch aggregation
pub mod engine;

/// Request shape validation
pub mod request;

/// Transports with retry and rate limiting
pub mod transport;

/// Query options and configuration files
pub mod config;

/// Stock comparators
pub mod order;

/// Aggregating client
pub mod client;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use client::QueryClient;
pub use config::{AggregateConfig, OptionOverrides, QueryOptions};
pub use engine::{AggregateStats, DriverState, PageBatches, RevisionBatches, RevisionSearch};
pub use locate::{Page, Revision};
pub use merge::{Conflict, ConflictResolver, KeepEarlierScalars, PreferLater, Strict};
pub use request::{QueryRequest, QueryTarget};
pub use response::Response;
pub use transport::{HttpTransport, HttpTransportConfig, ReplayTransport, Transport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
