//! Title resolution through normalization and redirects

use crate::response::Response;
use std::collections::HashSet;

/// Resolve `title` to the title present in `response`.
///
/// Normalization is applied at most once. Redirects are then followed in
/// logical order, rescanning the whole list after each hop, since the
/// response does not list them in discovery order. Returns `None` when the
/// redirect chain reachable from `title` contains a cycle.
pub fn resolve_title(response: &Response, title: &str) -> Option<String> {
    let mut current = response
        .normalized()
        .iter()
        .find(|n| n.from == title)
        .map_or_else(|| title.to_string(), |n| n.to.clone());

    let mut visited = HashSet::new();
    loop {
        if visited.contains(&current) {
            tracing::debug!(title, at = %current, "Redirect loop");
            return None;
        }
        let Some(redirect) = response.redirects().iter().find(|r| r.from == current) else {
            return Some(current);
        };
        let next = redirect.to.clone();
        visited.insert(std::mem::replace(&mut current, next));
    }
}
