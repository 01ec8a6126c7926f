//! Engine types
//!
//! Driver states and aggregation statistics.

use serde::Serialize;

/// Lifecycle of one logical request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    /// No entity found yet
    #[default]
    Requesting,
    /// At least one partial entity merged, completion not yet signaled
    Accumulating,
    /// Completion signal observed (terminal)
    Complete,
    /// The request failed (terminal)
    Failed,
}

impl DriverState {
    /// Whether no further responses will be pulled
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// Statistics from one logical request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateStats {
    /// Responses pulled from the source
    pub responses: usize,
    /// Responses that produced no entity
    pub empty_responses: usize,
    /// Entities handed to the caller
    pub entities: usize,
    /// Batches flushed
    pub batches: usize,
}

impl AggregateStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one pulled response that produced `entities` entities
    pub fn add_response(&mut self, entities: usize) {
        self.responses += 1;
        if entities == 0 {
            self.empty_responses += 1;
        }
    }

    /// Count entities handed to the caller
    pub fn add_entities(&mut self, count: usize) {
        self.entities += count;
    }

    /// Count a flushed batch
    pub fn add_batch(&mut self) {
        self.batches += 1;
    }
}
