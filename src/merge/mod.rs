//! Merge module
//!
//! Deep-merges partial entities observed across continued responses.
//!
//! # Overview
//!
//! [`merge_values`] folds an incremental property bag into an accumulator:
//!
//! - attributes absent from the accumulator are copied in
//! - identical values are left alone
//! - nested objects are merged recursively
//! - arrays are concatenated, accumulator first
//! - anything else is handed to a [`ConflictResolver`]
//!
//! [`KeepEarlierScalars`] is the default resolver: two strings or two
//! numbers may legitimately differ between responses (for example a
//! `touched` timestamp), so the earlier value is kept; every other mismatch
//! is a [`crate::Error::MergeConflict`].

mod engine;
mod resolvers;
mod types;

pub use engine::{merge_values, merge_values_at};
pub use resolvers::{KeepEarlierScalars, PreferLater, Strict};
pub use types::{describe_value, Conflict, ConflictResolver};
