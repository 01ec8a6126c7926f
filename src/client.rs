//! Query client
//!
//! Binds a [`Transport`] and default [`QueryOptions`] to the aggregation
//! engine. Every call validates its request, merges its
//! [`OptionOverrides`] over the defaults and starts a fresh driver, so
//! calls running concurrently on one client never share state.

use crate::config::{OptionOverrides, QueryOptions};
use crate::continuation::Continuation;
use crate::engine::{
    IncrementalPages, PageBatches, PageDriver, PageTarget, RevisionBatches, RevisionDriver,
    RevisionSearch, RevisionTarget,
};
use crate::error::Result;
use crate::locate::{Page, Revision};
use crate::request::{QueryRequest, QueryTarget};
use crate::transport::Transport;
use crate::types::{EntityId, QueryParams};
use std::sync::Arc;
use tracing::debug;

/// Aggregating client for one API endpoint
#[derive(Clone)]
pub struct QueryClient {
    transport: Arc<dyn Transport>,
    options: QueryOptions,
}

impl QueryClient {
    /// Create a client with default options
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    /// Create a client over a shared transport
    pub fn from_shared(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            options: QueryOptions::default(),
        }
    }

    /// Replace the default options
    #[must_use]
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// The default options
    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// The complete page with the given title
    pub async fn full_page_by_title(
        &self,
        title: &str,
        params: QueryParams,
        overrides: &OptionOverrides,
    ) -> Result<Option<Page>> {
        let (source, options) =
            self.start(QueryTarget::Title(title.to_string()), params, overrides)?;
        PageDriver::new(source, PageTarget::Title(title.to_string()), options)
            .run()
            .await
    }

    /// The complete page with the given id
    pub async fn full_page_by_id(
        &self,
        page_id: &EntityId,
        params: QueryParams,
        overrides: &OptionOverrides,
    ) -> Result<Option<Page>> {
        let (source, options) =
            self.start(QueryTarget::PageId(page_id.clone()), params, overrides)?;
        PageDriver::new(source, PageTarget::Id(page_id.clone()), options)
            .run()
            .await
    }

    /// The page with the given title, as merged after each productive response
    pub fn incremental_page_by_title(
        &self,
        title: &str,
        params: QueryParams,
        overrides: &OptionOverrides,
    ) -> Result<IncrementalPages> {
        let (source, options) =
            self.start(QueryTarget::Title(title.to_string()), params, overrides)?;
        Ok(PageDriver::new(source, PageTarget::Title(title.to_string()), options).incremental())
    }

    /// The complete revision with the given id
    pub async fn full_revision_by_id(
        &self,
        rev_id: &EntityId,
        params: QueryParams,
        overrides: &OptionOverrides,
    ) -> Result<Option<Revision>> {
        let (source, options) =
            self.start(QueryTarget::RevisionId(rev_id.clone()), params, overrides)?;
        RevisionDriver::new(source, RevisionTarget(rev_id.clone()), options)
            .run()
            .await
    }

    /// Search for a revision, stopping as soon as it is located
    pub fn potential_revision_by_id(
        &self,
        rev_id: &EntityId,
        params: QueryParams,
        overrides: &OptionOverrides,
    ) -> Result<RevisionSearch<Continuation>> {
        let (source, options) =
            self.start(QueryTarget::RevisionId(rev_id.clone()), params, overrides)?;
        Ok(RevisionSearch::new(source, rev_id.clone(), &options))
    }

    /// Every page produced by `generator`, batch by batch
    pub fn full_pages(
        &self,
        generator: &str,
        params: QueryParams,
        overrides: &OptionOverrides,
    ) -> Result<PageBatches<Continuation>> {
        let (source, options) =
            self.start(QueryTarget::Generator(generator.to_string()), params, overrides)?;
        Ok(PageBatches::new(source, options))
    }

    /// Every revision of the pages produced by `generator`, batch by batch
    pub fn full_revisions(
        &self,
        generator: &str,
        params: QueryParams,
        overrides: &OptionOverrides,
    ) -> Result<RevisionBatches<Continuation>> {
        let (source, options) =
            self.start(QueryTarget::Generator(generator.to_string()), params, overrides)?;
        Ok(RevisionBatches::new(source, options))
    }

    /// Validate a request and open its continuation
    fn start(
        &self,
        target: QueryTarget,
        params: QueryParams,
        overrides: &OptionOverrides,
    ) -> Result<(Continuation, QueryOptions)> {
        let request = QueryRequest::new(target, params)?;
        let options = self.options.merged(overrides);
        debug!(request = ?request.target(), options = ?options, "Starting logical request");
        Ok((
            Continuation::new(Arc::clone(&self.transport), request.to_params()),
            options,
        ))
    }
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
