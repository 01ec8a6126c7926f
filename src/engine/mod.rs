//! Aggregation engine module
//!
//! Drives continued responses into complete entities.
//!
//! # Overview
//!
//! The engine module provides:
//! - [`EntityDriver`] - folds one page or revision across continuation
//!   until the batch completion signal ([`PageDriver`], [`RevisionDriver`])
//! - [`RevisionSearch`] - locates one revision and stops
//! - [`BatchAggregator`] - merges generator results per batch
//!   ([`PageBatches`], [`RevisionBatches`])
//!
//! Every driver owns its [`crate::guard::EmptyResponseGovernor`] and
//! accumulator; concurrently driven requests share nothing but read-only
//! [`crate::config::QueryOptions`].

mod batch;
mod single;
mod types;

pub use batch::{
    BatchAccumulator, BatchAggregator, PageBatch, PageBatches, RevisionBatch, RevisionBatches,
};
pub use single::{
    EntityDriver, EntityTarget, IncrementalPages, PageDriver, PageTarget, RevisionDriver,
    RevisionSearch, RevisionTarget,
};
pub use types::{AggregateStats, DriverState};

use crate::response::Response;
use tracing::warn;

/// Log every API warning of a response
fn log_warnings(response: &Response) {
    for warning in response.warnings() {
        warn!(
            module = warning.module.as_deref().unwrap_or("main"),
            code = warning.code.as_deref().unwrap_or("unknown"),
            "API warning: {}",
            warning.text.as_deref().unwrap_or_default()
        );
    }
}
