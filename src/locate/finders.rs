//! Entity lookup inside one response

use super::title::resolve_title;
use super::types::{Page, Revision};
use crate::response::Response;
use crate::types::{EntityId, JsonValue};
use std::sync::Arc;

/// Find the page for `title`, following normalization and redirects
pub fn find_page_by_title(response: &Response, title: &str) -> Option<Page> {
    let resolved = resolve_title(response, title)?;
    response
        .pages()
        .iter()
        .find(|entry| entry.title.as_deref() == Some(resolved.as_str()))
        .map(|entry| Page::new(entry.entity.clone()))
}

/// Find the page with the given id
pub fn find_page_by_id(response: &Response, page_id: &EntityId) -> Option<Page> {
    response
        .page_by_id(page_id)
        .map(|entry| Page::new(entry.entity.clone()))
}

/// Find the revision with the given id.
///
/// Pages are searched in document order, and revisions within each page in
/// document order. A located revision is associated with its page (minus
/// the page's revisions). If no page holds it, `badrevids` is consulted; a
/// revision found there is missing and has no page association.
pub fn find_revision_by_id(response: &Response, rev_id: &EntityId) -> Option<Revision> {
    for entry in response.pages() {
        let Some(JsonValue::Array(revisions)) = entry.entity.get("revisions") else {
            continue;
        };
        let found = revisions
            .iter()
            .filter_map(JsonValue::as_object)
            .find(|rev| has_rev_id(rev.get("revid"), rev_id));
        if let Some(revision) = found {
            let page = Page::new(entry.entity.clone()).without_revisions();
            return Some(Revision::with_page(revision.clone(), Arc::new(page)));
        }
    }

    response
        .bad_revisions()
        .iter()
        .find(|bad| has_rev_id(bad.get("revid"), rev_id))
        .map(|bad| Revision::new(bad.clone()))
}

/// Every page of the response, in document order
pub fn response_pages(response: &Response) -> Vec<Page> {
    response
        .pages()
        .iter()
        .map(|entry| Page::new(entry.entity.clone()))
        .collect()
}

/// Every revision of the response, each associated with its page.
///
/// Missing revisions from `badrevids` follow, without a page.
pub fn response_revisions(response: &Response) -> Vec<Revision> {
    let mut out = Vec::new();
    for entry in response.pages() {
        let Some(JsonValue::Array(revisions)) = entry.entity.get("revisions") else {
            continue;
        };
        let page = Arc::new(Page::new(entry.entity.clone()).without_revisions());
        out.extend(
            revisions
                .iter()
                .filter_map(JsonValue::as_object)
                .map(|rev| Revision::with_page(rev.clone(), Arc::clone(&page))),
        );
    }
    out.extend(
        response
            .bad_revisions()
            .iter()
            .map(|bad| Revision::new(bad.clone())),
    );
    out
}

fn has_rev_id(value: Option<&JsonValue>, wanted: &EntityId) -> bool {
    value
        .and_then(EntityId::from_value)
        .is_some_and(|id| &id == wanted)
}
