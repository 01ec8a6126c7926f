//! CLI module
//!
//! Command-line interface for aggregated queries.
//!
//! # Commands
//!
//! - `page` - Fetch one complete page by title or id
//! - `revision` - Fetch one revision by id
//! - `pages` - Fetch every page produced by a generator
//! - `revisions` - Fetch every revision of a generator's pages
//! - `validate` - Check a configuration file

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
