//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::client::QueryClient;
use crate::config::{AggregateConfig, OptionOverrides};
use crate::continuation::ResponseSource;
use crate::engine::{BatchAccumulator, BatchAggregator};
use crate::error::{Error, Result, ResultExt};
use crate::locate::Revision;
use crate::transport::{HttpTransport, ReplayTransport, Transport};
use crate::types::{EntityId, QueryParams};
use futures::StreamExt;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Validate => self.validate(),
            Commands::Page {
                title,
                pageid,
                incremental,
                params,
            } => {
                self.page(title.as_deref(), pageid.as_deref(), *incremental, params)
                    .await
            }
            Commands::Revision {
                revid,
                potential,
                params,
            } => self.revision(revid, *potential, params).await,
            Commands::Pages { generator, params } => {
                let client = self.client()?;
                let batches =
                    client.full_pages(generator, to_params(params), &OptionOverrides::new())?;
                self.drain(batches, |page| serde_json::to_value(page)).await
            }
            Commands::Revisions { generator, params } => {
                let client = self.client()?;
                let batches =
                    client.full_revisions(generator, to_params(params), &OptionOverrides::new())?;
                self.drain(batches, |revision| Ok(revision_json(revision)))
                    .await
            }
        }
    }

    /// Load the configuration file, or defaults without one
    fn load_config(&self) -> Result<AggregateConfig> {
        match &self.cli.config {
            Some(path) => AggregateConfig::load(path),
            None => Ok(AggregateConfig::default()),
        }
    }

    /// Build the client from configuration and flags
    fn client(&self) -> Result<QueryClient> {
        let config = self.load_config()?;
        let transport: Arc<dyn Transport> = match &self.cli.replay {
            Some(path) => Arc::new(
                ReplayTransport::from_file(path)
                    .with_context(|| format!("Failed to load replay file '{}'", path.display()))?,
            ),
            None => Arc::new(HttpTransport::new(
                config.transport_config(self.cli.api.as_deref())?,
            )?),
        };

        let mut options = config.to_options();
        if let Some(limit) = self.cli.max_empty {
            options = options.with_max_empty_responses(limit);
        }
        Ok(QueryClient::from_shared(transport).with_options(options))
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;
        self.output(&json!({
            "valid": true,
            "config": config,
        }))
    }

    /// Fetch one page
    async fn page(
        &self,
        title: Option<&str>,
        pageid: Option<&str>,
        incremental: bool,
        params: &[(String, String)],
    ) -> Result<()> {
        let client = self.client()?;
        let overrides = OptionOverrides::new();
        let params = to_params(params);

        let page = match (title, pageid) {
            (Some(title), _) if incremental => {
                let mut snapshots = client.incremental_page_by_title(title, params, &overrides)?;
                let mut last = None;
                while let Some(snapshot) = snapshots.next().await {
                    let snapshot = snapshot?;
                    self.output(&snapshot)?;
                    last = Some(snapshot);
                }
                if last.is_none() {
                    warn!(title, "Page not found");
                }
                return Ok(());
            }
            (Some(title), _) => client.full_page_by_title(title, params, &overrides).await?,
            (None, Some(id)) => {
                let id = EntityId::parse(id)?;
                client.full_page_by_id(&id, params, &overrides).await?
            }
            (None, None) => {
                return Err(Error::config("either --title or --pageid is required"));
            }
        };

        if page.is_none() {
            warn!("Page not found");
        }
        self.output(&page)
    }

    /// Fetch one revision
    async fn revision(
        &self,
        revid: &str,
        potential: bool,
        params: &[(String, String)],
    ) -> Result<()> {
        let client = self.client()?;
        let overrides = OptionOverrides::new();
        let rev_id = EntityId::parse(revid)?;

        let revision = if potential {
            Some(
                client
                    .potential_revision_by_id(&rev_id, to_params(params), &overrides)?
                    .find()
                    .await?,
            )
        } else {
            client
                .full_revision_by_id(&rev_id, to_params(params), &overrides)
                .await?
        };

        match revision {
            Some(revision) => self.output(&revision_json(&revision)),
            None => {
                warn!(rev_id = %rev_id, "Revision not found");
                self.output(&Value::Null)
            }
        }
    }

    /// Print every entity of a batch aggregation
    async fn drain<S, A>(
        &self,
        mut batches: BatchAggregator<S, A>,
        render: impl Fn(&A::Item) -> serde_json::Result<Value>,
    ) -> Result<()>
    where
        S: ResponseSource,
        A: BatchAccumulator,
    {
        while let Some(item) = batches.next_item().await? {
            self.output(&render(&item)?)?;
        }
        let stats = batches.stats();
        info!(
            responses = stats.responses,
            empty = stats.empty_responses,
            batches = stats.batches,
            entities = stats.entities,
            "Done"
        );
        Ok(())
    }

    /// Print one JSON document
    fn output<T: Serialize>(&self, value: &T) -> Result<()> {
        let text = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(value)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        };
        println!("{text}");
        Ok(())
    }
}

/// Collect `key=value` pairs into query parameters
fn to_params(pairs: &[(String, String)]) -> QueryParams {
    pairs.iter().cloned().collect()
}

/// A revision with its owning page next to it
fn revision_json(revision: &Revision) -> Value {
    json!({
        "revision": revision,
        "page": revision.page(),
    })
}
