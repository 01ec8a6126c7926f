//! Locate module
//!
//! Finds pages and revisions inside a single response.
//!
//! # Overview
//!
//! - [`resolve_title`] follows normalization and redirects to the title the
//!   response actually uses, reporting redirect loops as "not found"
//! - `find_*` functions look a single entity up by title or id
//! - [`response_pages`] and [`response_revisions`] decompose a response into
//!   all of its entities, for one-to-many queries

mod finders;
mod title;
mod types;

pub use finders::{
    find_page_by_id, find_page_by_title, find_revision_by_id, response_pages, response_revisions,
};
pub use title::resolve_title;
pub use types::{Page, Revision};
