//! Merge types and traits

use crate::error::Result;
use crate::types::{JsonObject, JsonValue};

/// A scalar disagreement between accumulator and incremental value
pub struct Conflict<'a> {
    /// Value currently held by the accumulator
    pub base: &'a JsonValue,
    /// Value observed in the incremental entity
    pub incremental: &'a JsonValue,
    /// Dotted path of the attribute, e.g. `a.b.c`
    pub path: &'a str,
    /// The accumulator object holding the attribute.
    ///
    /// Resolvers may record extra bookkeeping here; the returned value is
    /// stored under `key` afterwards.
    pub container: &'a mut JsonObject,
    /// Attribute key within `container`
    pub key: &'a str,
}

/// Decides the merged value when two partial entities disagree
pub trait ConflictResolver: Send + Sync {
    /// Return the value to store, or fail the merge
    fn resolve(&self, conflict: Conflict<'_>) -> Result<JsonValue>;
}

impl<F> ConflictResolver for F
where
    F: Fn(Conflict<'_>) -> Result<JsonValue> + Send + Sync,
{
    fn resolve(&self, conflict: Conflict<'_>) -> Result<JsonValue> {
        self(conflict)
    }
}

/// Short description of a value for conflict messages
///
/// `null`, `array` and `object` by kind; scalars as `<kind> (<value>)`.
pub fn describe_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "null".to_string(),
        JsonValue::Array(_) => "array".to_string(),
        JsonValue::Object(_) => "object".to_string(),
        JsonValue::Bool(b) => format!("boolean ({b})"),
        JsonValue::Number(n) => format!("number ({n})"),
        JsonValue::String(s) => format!("string ({s})"),
    }
}
