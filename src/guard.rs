//! Empty-response governor
//!
//! Bounds the number of consecutive unproductive responses within one
//! logical request. Each driver owns its own [`EmptyResponseGovernor`], so
//! concurrently running requests never share a counter.

use crate::error::{Error, Result};
use tracing::trace;

/// Counts consecutive responses that produced no entities
#[derive(Debug, Clone, Default)]
pub struct EmptyResponseGovernor {
    /// Maximum tolerated run of empty responses (`None` = unbounded)
    limit: Option<u32>,
    /// Current run length
    consecutive: u32,
}

impl EmptyResponseGovernor {
    /// Create a governor with an optional limit
    pub fn new(limit: Option<u32>) -> Self {
        Self {
            limit,
            consecutive: 0,
        }
    }

    /// Create a governor that never fails
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Record one response that produced `entities` entities.
    ///
    /// Fails with [`Error::TooManyEmptyResponses`] once the run of empty
    /// responses exceeds the limit. A productive response resets the run.
    pub fn record(&mut self, entities: usize) -> Result<()> {
        if entities > 0 {
            self.consecutive = 0;
            return Ok(());
        }

        self.consecutive = self.consecutive.saturating_add(1);
        trace!(
            consecutive = self.consecutive,
            limit = ?self.limit,
            "Empty response"
        );
        match self.limit {
            Some(limit) if self.consecutive > limit => Err(Error::TooManyEmptyResponses {
                limit,
                consecutive: self.consecutive,
            }),
            _ => Ok(()),
        }
    }

    /// Current run of consecutive empty responses
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Configured limit
    pub fn limit(&self) -> Option<u32> {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_never_fails() {
        let mut governor = EmptyResponseGovernor::unbounded();
        for _ in 0..1000 {
            governor.record(0).unwrap();
        }
        assert_eq!(governor.consecutive(), 1000);
        assert!(governor.limit().is_none());
    }

    #[test]
    fn test_limit_allows_exactly_limit_empty_responses() {
        let mut governor = EmptyResponseGovernor::new(Some(3));
        governor.record(0).unwrap();
        governor.record(0).unwrap();
        governor.record(0).unwrap();
        governor.record(2).unwrap();
        assert_eq!(governor.consecutive(), 0);
    }

    #[test]
    fn test_limit_exceeded() {
        let mut governor = EmptyResponseGovernor::new(Some(3));
        for _ in 0..3 {
            governor.record(0).unwrap();
        }
        let err = governor.record(0).unwrap_err();
        assert!(matches!(
            err,
            Error::TooManyEmptyResponses {
                limit: 3,
                consecutive: 4
            }
        ));
    }

    #[test]
    fn test_non_consecutive_empties_never_fail() {
        let mut governor = EmptyResponseGovernor::new(Some(2));
        for _ in 0..100 {
            governor.record(0).unwrap();
            governor.record(0).unwrap();
            governor.record(1).unwrap();
        }
    }

    #[test]
    fn test_zero_limit() {
        let mut governor = EmptyResponseGovernor::new(Some(0));
        governor.record(1).unwrap();
        assert!(governor.record(0).is_err());
    }

    #[test]
    fn test_independent_instances() {
        let mut first = EmptyResponseGovernor::new(Some(1));
        let mut second = first.clone();
        first.record(0).unwrap();
        assert!(first.record(0).is_err());
        second.record(0).unwrap();
        assert_eq!(second.consecutive(), 1);
    }
}
