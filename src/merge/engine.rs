//! Deep merge of partial entities

use super::types::{Conflict, ConflictResolver};
use crate::error::Result;
use crate::types::{JsonObject, JsonValue};

/// Merge `incremental` into `base` in place
pub fn merge_values(
    base: &mut JsonObject,
    incremental: &JsonObject,
    resolver: &dyn ConflictResolver,
) -> Result<()> {
    merge_values_at(base, incremental, resolver, "")
}

/// Merge `incremental` into `base`, reporting conflicts below `prefix`
pub fn merge_values_at(
    base: &mut JsonObject,
    incremental: &JsonObject,
    resolver: &dyn ConflictResolver,
    prefix: &str,
) -> Result<()> {
    for (key, value) in incremental {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        let Some(existing) = base.get_mut(key) else {
            base.insert(key.clone(), value.clone());
            continue;
        };
        if existing == value {
            continue;
        }
        match (existing, value) {
            (JsonValue::Object(nested), JsonValue::Object(more)) => {
                merge_values_at(nested, more, resolver, &path)?;
                continue;
            }
            (JsonValue::Array(items), JsonValue::Array(more)) => {
                items.extend(more.iter().cloned());
                continue;
            }
            _ => {}
        }

        let current = base.get(key).cloned().unwrap_or(JsonValue::Null);
        let resolved = resolver.resolve(Conflict {
            base: &current,
            incremental: value,
            path: &path,
            container: base,
            key,
        })?;
        base.insert(key.clone(), resolved);
    }
    Ok(())
}
