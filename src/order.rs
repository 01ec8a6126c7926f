//! Stock comparators for ordering a batch's output

use crate::locate::{Page, Revision};
use crate::types::EntityId;
use chrono::{DateTime, FixedOffset};
use std::cmp::Ordering;

/// Order pages by title; untitled pages last
pub fn pages_by_title(a: &Page, b: &Page) -> Ordering {
    none_last(a.title(), b.title())
}

/// Order pages numerically by page id; pages without an id last
pub fn pages_by_id(a: &Page, b: &Page) -> Ordering {
    none_last(a.page_id(), b.page_id())
}

/// Order revisions numerically by revision id
pub fn revisions_by_id(a: &Revision, b: &Revision) -> Ordering {
    none_last(a.rev_id(), b.rev_id())
}

/// Order revisions chronologically, then by id; revisions without a
/// parseable timestamp last
pub fn revisions_by_timestamp(a: &Revision, b: &Revision) -> Ordering {
    let time = |r: &Revision| r.timestamp().and_then(parse_timestamp);
    none_last(time(a), time(b)).then_with(|| revisions_by_id(a, b))
}

fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(text).ok()
}

fn none_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn page(value: Value) -> Page {
        serde_json::from_value(value).unwrap()
    }

    fn revision(value: Value) -> Revision {
        match value {
            Value::Object(map) => Revision::new(map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_pages_by_id_is_numeric() {
        let mut pages = vec![
            page(json!({"pageid": 100, "title": "C"})),
            page(json!({"title": "Missing", "missing": true})),
            page(json!({"pageid": 9, "title": "B"})),
        ];
        pages.sort_by(pages_by_id);
        let titles: Vec<_> = pages.iter().map(|p| p.title().unwrap()).collect();
        assert_eq!(titles, vec!["B", "C", "Missing"]);
    }

    #[test]
    fn test_pages_by_title() {
        let mut pages = vec![page(json!({"title": "b"})), page(json!({"title": "A"}))];
        pages.sort_by(pages_by_title);
        assert_eq!(pages[0].title(), Some("A"));
    }

    #[test]
    fn test_revisions_by_timestamp_across_offsets() {
        let mut revisions = vec![
            revision(json!({"revid": 1, "timestamp": "2024-01-01T12:00:00+02:00"})),
            revision(json!({"revid": 2, "timestamp": "2024-01-01T11:00:00Z"})),
            revision(json!({"revid": 3})),
        ];
        revisions.sort_by(revisions_by_timestamp);
        let ids: Vec<_> = revisions
            .iter()
            .map(|r| r.rev_id().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_unparseable_timestamps_sort_with_untimed() {
        let mut revisions = vec![
            revision(json!({"revid": 4, "timestamp": "yesterday"})),
            revision(json!({"revid": 3})),
            revision(json!({"revid": 2, "timestamp": "2024-01-02T00:00:00Z"})),
            revision(json!({"revid": 1, "timestamp": "not a time"})),
            revision(json!({"revid": 5, "timestamp": "2024-01-01T00:00:00Z"})),
        ];
        revisions.sort_by(revisions_by_timestamp);
        let ids: Vec<_> = revisions
            .iter()
            .map(|r| r.rev_id().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["5", "2", "1", "3", "4"]);
    }

    #[test]
    fn test_revisions_by_id_large_values() {
        let a = revision(json!({"revid": "123456789123456789"}));
        let b = revision(json!({"revid": "123456789123456788"}));
        assert_eq!(revisions_by_id(&a, &b), Ordering::Greater);
        assert_eq!(
            EntityId::parse("2").unwrap().cmp(&EntityId::parse("10").unwrap()),
            Ordering::Less
        );
    }
}
