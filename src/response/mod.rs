//! Response module
//!
//! Ingests one API response document into a unified view.
//!
//! # Overview
//!
//! The API may return the page collection either as a map keyed by page id
//! (legacy format) or as an ordered list (current format). [`Response`]
//! materializes both into one ordered sequence of [`PageEntry`] values on
//! ingestion, so lookup and merge code never branches on format version.
//! Legacy empty-string flags (`missing: ""`) are normalized to booleans.

mod types;

pub use types::{PageEntry, Redirect, Response, TitleMapping, Warning};
