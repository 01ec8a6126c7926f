//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Aggregate continued MediaWiki query responses into complete entities
#[derive(Parser, Debug)]
#[command(name = "mw-aggregate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// API endpoint, e.g. https://en.wikipedia.org/w/api.php
    #[arg(short, long, global = true)]
    pub api: Option<String>,

    /// Serve responses from a recorded file (JSON array or JSON lines)
    #[arg(long, global = true)]
    pub replay: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Fail after more than this many consecutive empty responses
    #[arg(long, global = true)]
    pub max_empty: Option<u32>,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch one complete page
    Page {
        /// Page title
        #[arg(long, required_unless_present = "pageid", conflicts_with = "pageid")]
        title: Option<String>,

        /// Page id
        #[arg(long)]
        pageid: Option<String>,

        /// Print the merged page after every productive response
        #[arg(long, requires = "title")]
        incremental: bool,

        /// Extra query parameters (key=value)
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Fetch one revision
    Revision {
        /// Revision id
        #[arg(long)]
        revid: String,

        /// Stop as soon as the revision is located
        #[arg(long)]
        potential: bool,

        /// Extra query parameters (key=value)
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Fetch every page produced by a generator
    Pages {
        /// Generator module, e.g. allpages
        #[arg(long)]
        generator: String,

        /// Extra query parameters (key=value)
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Fetch every revision of the pages produced by a generator
    Revisions {
        /// Generator module, e.g. allpages
        #[arg(long)]
        generator: String,

        /// Extra query parameters (key=value)
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Validate the configuration file
    Validate,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one document per line)
    Json,
    /// Indented JSON
    Pretty,
}

/// Parse a `key=value` parameter
fn parse_param(text: &str) -> std::result::Result<(String, String), String> {
    text.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{text}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_command() {
        let cli = Cli::parse_from([
            "mw-aggregate",
            "--api",
            "https://example.org/w/api.php",
            "page",
            "--title",
            "Main Page",
            "-p",
            "prop=links|categories",
            "-p",
            "pllimit=max",
        ]);
        match cli.command {
            Commands::Page { title, params, .. } => {
                assert_eq!(title.as_deref(), Some("Main Page"));
                assert_eq!(params[0], ("prop".to_string(), "links|categories".to_string()));
                assert_eq!(params.len(), 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_page_requires_title_or_id() {
        assert!(Cli::try_parse_from(["mw-aggregate", "page"]).is_err());
        assert!(
            Cli::try_parse_from(["mw-aggregate", "page", "--title", "A", "--pageid", "1"]).is_err()
        );
        assert!(Cli::try_parse_from(["mw-aggregate", "page", "--pageid", "1", "--incremental"])
            .is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "mw-aggregate",
            "pages",
            "--generator",
            "allpages",
            "--max-empty",
            "5",
            "--format",
            "pretty",
        ]);
        assert_eq!(cli.max_empty, Some(5));
        assert_eq!(cli.format, OutputFormat::Pretty);
    }

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("a=b=c").unwrap(),
            ("a".to_string(), "b=c".to_string())
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }
}
