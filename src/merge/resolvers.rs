//! Stock conflict resolvers

use super::types::{describe_value, Conflict, ConflictResolver};
use crate::error::{Error, Result};
use crate::types::JsonValue;

/// Keeps the accumulator's value when both sides are strings or both are
/// numbers; such values may be unstable between responses, so the earlier
/// one is picked arbitrarily. Fails on every other mismatch.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepEarlierScalars;

impl ConflictResolver for KeepEarlierScalars {
    fn resolve(&self, conflict: Conflict<'_>) -> Result<JsonValue> {
        if same_scalar_kind(conflict.base, conflict.incremental) {
            return Ok(conflict.base.clone());
        }
        Err(conflict_error(&conflict))
    }
}

/// Like [`KeepEarlierScalars`], but the incremental value wins
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferLater;

impl ConflictResolver for PreferLater {
    fn resolve(&self, conflict: Conflict<'_>) -> Result<JsonValue> {
        if same_scalar_kind(conflict.base, conflict.incremental) {
            return Ok(conflict.incremental.clone());
        }
        Err(conflict_error(&conflict))
    }
}

/// Fails on every disagreement
#[derive(Debug, Clone, Copy, Default)]
pub struct Strict;

impl ConflictResolver for Strict {
    fn resolve(&self, conflict: Conflict<'_>) -> Result<JsonValue> {
        Err(conflict_error(&conflict))
    }
}

fn same_scalar_kind(a: &JsonValue, b: &JsonValue) -> bool {
    matches!(
        (a, b),
        (JsonValue::String(_), JsonValue::String(_)) | (JsonValue::Number(_), JsonValue::Number(_))
    )
}

fn conflict_error(conflict: &Conflict<'_>) -> Error {
    Error::merge_conflict(
        conflict.path,
        describe_value(conflict.base),
        describe_value(conflict.incremental),
    )
}
