//! Common types used throughout mw-aggregate
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Request parameters, sent verbatim by the transport
pub type QueryParams = BTreeMap<String, String>;

// ============================================================================
// Entity Ids
// ============================================================================

/// A page or revision id in canonical decimal form.
///
/// Ids are never converted to floating point: two ids compare equal exactly
/// when their decimal digits are equal, so `123456789123456789` and
/// `123456789123456788` stay distinct even though they round to the same
/// `f64`. Negative ids occur for missing pages in the legacy response format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityId(String);

impl EntityId {
    /// Parse an id from its decimal text
    pub fn parse(text: &str) -> Result<Self> {
        canonicalize(text.trim())
            .map(Self)
            .ok_or_else(|| Error::invalid_request(format!("'{text}' is not a decimal id")))
    }

    /// Read an id from a JSON string or number
    ///
    /// Integral numbers are rendered exactly; a float that already lost
    /// precision cannot be recovered and is rendered from its binary value.
    pub fn from_value(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::String(s) => canonicalize(s.trim()).map(Self),
            JsonValue::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Some(Self(u.to_string()))
                } else if let Some(i) = n.as_i64() {
                    Some(Self(i.to_string()))
                } else {
                    let f = n.as_f64()?;
                    if f.is_finite() && f.fract() == 0.0 {
                        canonicalize(&format!("{f:.0}")).map(Self)
                    } else {
                        None
                    }
                }
            }
            _ => None,
        }
    }

    /// The canonical decimal text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a negative placeholder id
    pub fn is_negative(&self) -> bool {
        self.0.starts_with('-')
    }
}

/// Strip sign noise and leading zeros; `None` if not an integer literal
fn canonicalize(text: &str) -> Option<String> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        return Some("0".to_string());
    }
    Some(if negative {
        format!("-{trimmed}")
    } else {
        trimmed.to_string()
    })
}

impl Ord for EntityId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_negative(), other.is_negative()) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => magnitude(&self.0).cmp(&magnitude(&other.0)),
            (true, true) => magnitude(&other.0).cmp(&magnitude(&self.0)),
        }
    }
}

/// Canonical form has no leading zeros, so digit count orders magnitude
fn magnitude(id: &str) -> (usize, &str) {
    let digits = id.trim_start_matches('-');
    (digits.len(), digits)
}

impl PartialOrd for EntityId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Self::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid entity id: {value}")))
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Backoff strategy for transport retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("123", "123" ; "plain")]
    #[test_case("000123", "123" ; "leading zeros")]
    #[test_case("+42", "42" ; "explicit plus")]
    #[test_case(" 7 ", "7" ; "surrounding whitespace")]
    #[test_case("0000", "0" ; "all zeros")]
    #[test_case("-1", "-1" ; "negative placeholder")]
    #[test_case("-0", "0" ; "negative zero")]
    fn test_parse_canonical(input: &str, expected: &str) {
        assert_eq!(EntityId::parse(input).unwrap().as_str(), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("12a" ; "trailing letter")]
    #[test_case("1.5" ; "decimal point")]
    #[test_case("-" ; "bare sign")]
    fn test_parse_rejects(input: &str) {
        assert!(EntityId::parse(input).is_err());
    }

    #[test]
    fn test_large_ids_are_exact() {
        let a = EntityId::parse("123456789123456789").unwrap();
        let b = EntityId::parse("123456789123456788").unwrap();
        assert_ne!(a, b);
        // the two collapse to one f64
        let fa: f64 = "123456789123456789".parse().unwrap();
        let fb: f64 = "123456789123456788".parse().unwrap();
        assert_eq!(fa.to_bits(), fb.to_bits());

        let from_number = EntityId::from_value(&json!(123_456_789_123_456_789_u64)).unwrap();
        let from_text = EntityId::from_value(&json!("123456789123456789")).unwrap();
        assert_eq!(from_number, a);
        assert_eq!(from_text, a);
    }

    #[test]
    fn test_from_value_rejects_non_ids() {
        assert!(EntityId::from_value(&json!(1.5)).is_none());
        assert!(EntityId::from_value(&json!(null)).is_none());
        assert!(EntityId::from_value(&json!([1])).is_none());
        assert!(EntityId::from_value(&json!("abc")).is_none());
    }

    #[test]
    fn test_ordering_is_numeric() {
        let mut ids: Vec<EntityId> = ["10", "9", "-1", "100", "-5", "0"]
            .iter()
            .map(|s| EntityId::parse(s).unwrap())
            .collect();
        ids.sort();
        let rendered: Vec<&str> = ids.iter().map(EntityId::as_str).collect();
        assert_eq!(rendered, vec!["-5", "-1", "0", "9", "10", "100"]);
    }

    #[test]
    fn test_serde_round_trip_as_string() {
        let id = EntityId::from(42);
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("42"));
        let back: EntityId = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(back, id);
    }
}
