//! Batch aggregation for generator-style requests
//!
//! Entities are merged by identity within one batch (the run of responses
//! up to and including a batch completion signal), optionally sorted, and
//! handed out before the next batch is pulled. Nothing is merged across a
//! batch boundary.

use super::log_warnings;
use super::types::{AggregateStats, DriverState};
use crate::config::QueryOptions;
use crate::continuation::ResponseSource;
use crate::error::{Error, Result};
use crate::guard::EmptyResponseGovernor;
use crate::locate::{response_pages, response_revisions, Page, Revision};
use crate::merge::merge_values;
use crate::response::Response;
use crate::types::EntityId;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

// ============================================================================
// Accumulators
// ============================================================================

/// Per-batch accumulator of one entity kind
pub trait BatchAccumulator: Send {
    /// The entity handed to the caller
    type Item: Send;

    /// Fold every entity of `response` in; returns how many were found
    fn absorb(&mut self, response: &Response, options: &QueryOptions) -> Result<usize>;

    /// Take the batch's entities in output order, leaving the accumulator empty
    fn flush(&mut self, options: &QueryOptions) -> Vec<Self::Item>;

    /// Whether nothing has been absorbed since the last flush
    fn is_empty(&self) -> bool;
}

/// Identity of a page within one batch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PageKey {
    Id(EntityId),
    /// Missing pages share degenerate ids, so they are told apart by title
    Title(String),
}

impl PageKey {
    fn of(page: &Page) -> Option<Self> {
        match (page.page_id(), page.title()) {
            (Some(id), _) if !page.is_missing() => Some(Self::Id(id)),
            (_, Some(title)) => Some(Self::Title(title.to_string())),
            (Some(id), None) => Some(Self::Id(id)),
            (None, None) => None,
        }
    }
}

/// Pages of the current batch, merged by identity in first-occurrence order
#[derive(Debug, Default)]
pub struct PageBatch {
    pages: Vec<Page>,
    index: HashMap<PageKey, usize>,
}

impl BatchAccumulator for PageBatch {
    type Item = Page;

    fn absorb(&mut self, response: &Response, options: &QueryOptions) -> Result<usize> {
        let pages = response_pages(response);
        let found = pages.len();
        for page in pages {
            let Some(key) = PageKey::of(&page) else {
                self.pages.push(page);
                continue;
            };
            match self.index.get(&key) {
                Some(&position) => merge_values(
                    self.pages[position].attributes_mut(),
                    page.attributes(),
                    options.conflict_resolver(),
                )?,
                None => {
                    self.index.insert(key, self.pages.len());
                    self.pages.push(page);
                }
            }
        }
        Ok(found)
    }

    fn flush(&mut self, options: &QueryOptions) -> Vec<Page> {
        self.index.clear();
        let mut pages = std::mem::take(&mut self.pages);
        if let Some(compare) = options.compare_pages() {
            pages.sort_by(|a, b| compare(a, b));
        }
        pages
    }

    fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Revisions of the current batch, each with its owning page, in encounter order
#[derive(Debug, Default)]
pub struct RevisionBatch {
    revisions: Vec<Revision>,
}

impl BatchAccumulator for RevisionBatch {
    type Item = Revision;

    fn absorb(&mut self, response: &Response, _options: &QueryOptions) -> Result<usize> {
        let revisions = response_revisions(response);
        let found = revisions.len();
        self.revisions.extend(revisions);
        Ok(found)
    }

    fn flush(&mut self, options: &QueryOptions) -> Vec<Revision> {
        let mut revisions = std::mem::take(&mut self.revisions);
        if let Some(compare) = options.compare_revisions() {
            revisions.sort_by(|a, b| compare(a, b));
        }
        revisions
    }

    fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }
}

// ============================================================================
// Batch Aggregator
// ============================================================================

/// Drives a one-to-many logical request, yielding entities batch by batch
pub struct BatchAggregator<S, A: BatchAccumulator> {
    source: S,
    accumulator: A,
    options: QueryOptions,
    governor: EmptyResponseGovernor,
    ready: VecDeque<A::Item>,
    state: DriverState,
    stats: AggregateStats,
}

/// Aggregates the pages of a generator request
pub type PageBatches<S> = BatchAggregator<S, PageBatch>;

/// Aggregates the revisions of a generator request
pub type RevisionBatches<S> = BatchAggregator<S, RevisionBatch>;

impl<S: ResponseSource, A: BatchAccumulator + Default> BatchAggregator<S, A> {
    /// Create an aggregator; its governor is private to this request
    pub fn new(source: S, options: QueryOptions) -> Self {
        Self {
            source,
            accumulator: A::default(),
            governor: options.governor(),
            options,
            ready: VecDeque::new(),
            state: DriverState::Requesting,
            stats: AggregateStats::new(),
        }
    }
}

impl<S: ResponseSource, A: BatchAccumulator> BatchAggregator<S, A> {
    /// Current state
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Statistics so far
    pub fn stats(&self) -> &AggregateStats {
        &self.stats
    }

    /// The next completed entity, pulling responses as needed
    pub async fn next_item(&mut self) -> Result<Option<A::Item>> {
        loop {
            if let Some(item) = self.ready.pop_front() {
                self.stats.add_entities(1);
                return Ok(Some(item));
            }
            if self.state.is_terminal() {
                return Ok(None);
            }
            if let Err(e) = self.pull().await {
                debug!(error = %e, responses = self.stats.responses, "Batch aggregation failed");
                self.state = DriverState::Failed;
                self.ready.clear();
                return Err(e);
            }
        }
    }

    /// Collect every remaining entity
    pub async fn collect_all(mut self) -> Result<Vec<A::Item>> {
        let mut items = Vec::new();
        while let Some(item) = self.next_item().await? {
            items.push(item);
        }
        Ok(items)
    }

    async fn pull(&mut self) -> Result<()> {
        let Some(response) = self.source.next_response().await? else {
            if !self.accumulator.is_empty() {
                return Err(Error::exhausted(
                    "continuation ended in the middle of a batch",
                ));
            }
            debug!(
                responses = self.stats.responses,
                batches = self.stats.batches,
                entities = self.stats.entities,
                "Aggregation complete"
            );
            self.state = DriverState::Complete;
            return Ok(());
        };
        log_warnings(&response);

        let found = self.accumulator.absorb(&response, &self.options)?;
        self.stats.add_response(found);
        self.governor.record(found)?;
        if found > 0 {
            self.state = DriverState::Accumulating;
        }

        if response.is_batch_complete() {
            let batch = self.accumulator.flush(&self.options);
            debug!(
                batch = self.stats.batches + 1,
                entities = batch.len(),
                "Batch complete"
            );
            self.stats.add_batch();
            self.ready.extend(batch);
        }
        Ok(())
    }
}

impl<S, A> BatchAggregator<S, A>
where
    S: ResponseSource + 'static,
    A: BatchAccumulator + 'static,
{
    /// The aggregator as a stream of entities
    pub fn into_stream(self) -> BoxStream<'static, Result<A::Item>> {
        stream::try_unfold(self, |mut aggregator| async move {
            let item = aggregator.next_item().await?;
            Ok::<_, Error>(item.map(|item| (item, aggregator)))
        })
        .boxed()
    }
}
