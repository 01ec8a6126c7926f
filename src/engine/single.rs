//! Single-entity drivers
//!
//! [`EntityDriver`] folds every response of one logical request into one
//! accumulator until the batch completion signal. [`RevisionSearch`] is the
//! "potential" variant: it stops as soon as the revision is located.

use super::log_warnings;
use super::types::{AggregateStats, DriverState};
use crate::config::QueryOptions;
use crate::continuation::ResponseSource;
use crate::error::{Error, Result};
use crate::guard::EmptyResponseGovernor;
use crate::locate::{find_page_by_id, find_page_by_title, find_revision_by_id, Page, Revision};
use crate::merge::{merge_values, merge_values_at, ConflictResolver};
use crate::response::Response;
use crate::types::EntityId;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// Targets
// ============================================================================

/// Something a single-entity driver can look up and merge
pub trait EntityTarget: Send {
    /// The aggregated entity
    type Entity: Clone + Send;

    /// Find the target inside one response
    fn locate(&self, response: &Response) -> Option<Self::Entity>;

    /// Merge a newly located partial into the accumulator
    fn merge(
        accumulator: &mut Self::Entity,
        incremental: Self::Entity,
        resolver: &dyn ConflictResolver,
    ) -> Result<()>;

    /// Short description for diagnostics
    fn describe(&self) -> String;
}

/// A page, by title or by id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTarget {
    /// Located through normalization and redirects
    Title(String),
    /// Located by canonical page id
    Id(EntityId),
}

impl EntityTarget for PageTarget {
    type Entity = Page;

    fn locate(&self, response: &Response) -> Option<Page> {
        match self {
            Self::Title(title) => find_page_by_title(response, title),
            Self::Id(id) => find_page_by_id(response, id),
        }
    }

    fn merge(
        accumulator: &mut Page,
        incremental: Page,
        resolver: &dyn ConflictResolver,
    ) -> Result<()> {
        merge_values(accumulator.attributes_mut(), incremental.attributes(), resolver)
    }

    fn describe(&self) -> String {
        match self {
            Self::Title(title) => format!("page '{title}'"),
            Self::Id(id) => format!("page {id}"),
        }
    }
}

/// A revision by id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionTarget(pub EntityId);

impl EntityTarget for RevisionTarget {
    type Entity = Revision;

    fn locate(&self, response: &Response) -> Option<Revision> {
        find_revision_by_id(response, &self.0)
    }

    fn merge(
        accumulator: &mut Revision,
        incremental: Revision,
        resolver: &dyn ConflictResolver,
    ) -> Result<()> {
        merge_values(accumulator.attributes_mut(), incremental.attributes(), resolver)?;
        let Some(page) = incremental.page() else {
            return Ok(());
        };
        match accumulator.page_mut() {
            Some(existing) => {
                merge_values_at(existing.attributes_mut(), page.attributes(), resolver, "page")
            }
            None => {
                accumulator.set_page(Arc::new(page.clone()));
                Ok(())
            }
        }
    }

    fn describe(&self) -> String {
        format!("revision {}", self.0)
    }
}

// ============================================================================
// Entity Driver
// ============================================================================

/// Outcome of one pulled response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Merged,
    Empty,
    Ended,
}

/// Drives one single-entity logical request to completion
pub struct EntityDriver<S, T: EntityTarget> {
    source: S,
    target: T,
    options: QueryOptions,
    governor: EmptyResponseGovernor,
    accumulator: Option<T::Entity>,
    state: DriverState,
    stats: AggregateStats,
}

/// Full page driver
pub type PageDriver<S> = EntityDriver<S, PageTarget>;

/// Full revision driver
pub type RevisionDriver<S> = EntityDriver<S, RevisionTarget>;

/// Accumulator snapshots of a page, one per productive response
pub type IncrementalPages = BoxStream<'static, Result<Page>>;

impl<S: ResponseSource, T: EntityTarget> EntityDriver<S, T> {
    /// Create a driver; its governor is private to this request
    pub fn new(source: S, target: T, options: QueryOptions) -> Self {
        Self {
            source,
            target,
            governor: options.governor(),
            options,
            accumulator: None,
            state: DriverState::Requesting,
            stats: AggregateStats::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Statistics so far
    pub fn stats(&self) -> &AggregateStats {
        &self.stats
    }

    /// The accumulator as merged so far
    pub fn current(&self) -> Option<&T::Entity> {
        self.accumulator.as_ref()
    }

    /// Pull responses until completion and return the merged entity.
    ///
    /// `None` means the request completed without the target ever being
    /// found, e.g. because its title is part of a redirect loop.
    pub async fn run(mut self) -> Result<Option<T::Entity>> {
        while self.step().await? != Step::Ended {}
        self.finish()
    }

    /// Pull and fold one response; `false` once the request has ended
    pub async fn advance(&mut self) -> Result<bool> {
        Ok(self.step().await? != Step::Ended)
    }

    async fn step(&mut self) -> Result<Step> {
        if self.state.is_terminal() {
            return Ok(Step::Ended);
        }
        match self.pull().await {
            Ok(step) => Ok(step),
            Err(e) => {
                debug!(entity = %self.target.describe(), error = %e, "Driver failed");
                self.state = DriverState::Failed;
                Err(e)
            }
        }
    }

    async fn pull(&mut self) -> Result<Step> {
        let Some(response) = self.source.next_response().await? else {
            return Ok(Step::Ended);
        };
        log_warnings(&response);

        let step = match self.target.locate(&response) {
            Some(found) => {
                match self.accumulator.as_mut() {
                    Some(accumulator) => {
                        T::merge(accumulator, found, self.options.conflict_resolver())?;
                    }
                    None => self.accumulator = Some(found),
                }
                self.governor.record(1)?;
                self.stats.add_response(1);
                self.state = DriverState::Accumulating;
                Step::Merged
            }
            None => {
                self.stats.add_response(0);
                self.governor.record(0)?;
                Step::Empty
            }
        };

        if response.is_batch_complete() {
            debug!(
                entity = %self.target.describe(),
                responses = self.stats.responses,
                found = self.accumulator.is_some(),
                "Batch complete"
            );
            self.state = DriverState::Complete;
        }
        Ok(step)
    }

    fn finish(&mut self) -> Result<Option<T::Entity>> {
        if self.state != DriverState::Complete {
            self.state = DriverState::Failed;
            return Err(Error::exhausted(format!(
                "{} never signaled batch completion",
                self.target.describe()
            )));
        }
        let entity = self.accumulator.take();
        if entity.is_some() {
            self.stats.add_entities(1);
        }
        Ok(entity)
    }
}

impl<S: ResponseSource + 'static> PageDriver<S> {
    /// Yield the merged page after every productive response
    pub fn incremental(self) -> IncrementalPages {
        stream::try_unfold(self, |mut driver| async move {
            loop {
                match driver.step().await? {
                    Step::Merged => {
                        let snapshot = driver.accumulator.clone();
                        if let Some(page) = snapshot {
                            return Ok(Some((page, driver)));
                        }
                    }
                    Step::Empty => {}
                    Step::Ended => {
                        driver.finish()?;
                        return Ok::<_, Error>(None);
                    }
                }
            }
        })
        .boxed()
    }
}

// ============================================================================
// Potential Revision Search
// ============================================================================

/// Searches for one revision, stopping as soon as it is located
pub struct RevisionSearch<S> {
    source: S,
    rev_id: EntityId,
    governor: EmptyResponseGovernor,
    state: DriverState,
    stats: AggregateStats,
}

impl<S: ResponseSource> RevisionSearch<S> {
    /// Create a search; its governor is private to this request
    pub fn new(source: S, rev_id: EntityId, options: &QueryOptions) -> Self {
        Self {
            source,
            rev_id,
            governor: options.governor(),
            state: DriverState::Requesting,
            stats: AggregateStats::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Statistics so far
    pub fn stats(&self) -> &AggregateStats {
        &self.stats
    }

    /// Pull one response.
    ///
    /// Yields `Some(None)` for a response without the revision and
    /// `Some(Some(revision))` once it is located; `None` afterwards, after
    /// an error, or when the source runs dry.
    pub async fn next(&mut self) -> Result<Option<Option<Revision>>> {
        if self.state.is_terminal() {
            return Ok(None);
        }
        let step = self.pull().await;
        if step.is_err() {
            self.state = DriverState::Failed;
        }
        step
    }

    async fn pull(&mut self) -> Result<Option<Option<Revision>>> {
        let Some(response) = self.source.next_response().await? else {
            return Ok(None);
        };
        log_warnings(&response);

        match find_revision_by_id(&response, &self.rev_id) {
            Some(revision) => {
                self.governor.record(1)?;
                self.stats.add_response(1);
                self.stats.add_entities(1);
                self.state = DriverState::Complete;
                debug!(rev_id = %self.rev_id, responses = self.stats.responses, "Revision located");
                Ok(Some(Some(revision)))
            }
            None => {
                self.stats.add_response(0);
                self.governor.record(0)?;
                Ok(Some(None))
            }
        }
    }

    /// Pull until the revision is located
    pub async fn find(mut self) -> Result<Revision> {
        while let Some(step) = self.next().await? {
            if let Some(revision) = step {
                return Ok(revision);
            }
        }
        Err(Error::exhausted(format!(
            "revision {} was never found",
            self.rev_id
        )))
    }
}

impl<S: ResponseSource + 'static> RevisionSearch<S> {
    /// The search as a stream of placeholders and the final revision
    pub fn into_stream(self) -> BoxStream<'static, Result<Option<Revision>>> {
        stream::try_unfold(self, |mut search| async move {
            let step = search.next().await?;
            Ok::<_, Error>(step.map(|step| (step, search)))
        })
        .boxed()
    }
}
