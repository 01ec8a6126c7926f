//! Continuation module
//!
//! Pull-based sources of responses for one logical request.
//!
//! # Overview
//!
//! A [`ResponseSource`] yields one [`crate::response::Response`] per call,
//! with exactly one suspension point per step. Consumers stop a logical
//! request simply by not pulling again; nothing needs tearing down.
//!
//! - [`Continuation`] drives a [`crate::transport::Transport`], forwarding
//!   each response's `continue` token into the next request
//! - [`ReplaySource`] yields a fixed list of documents

mod source;
mod types;

pub use source::{Continuation, ReplaySource};
pub use types::ResponseSource;
