//! Crawler coordinator - the per-entity run loop
//!
//! This module drives one pipeline over the whole entity list:
//! - Processing entities strictly in input order, one at a time
//! - Turning every pipeline result into an entity report
//! - Notifying the sink before and after each entity
//! - Stopping between entities once shutdown is requested

use crate::api::{DateWindow, Entity, NeighborSource, PagedFeed, ProfileLookup};
use crate::config::CrawlerConfig;
use crate::graph::{GraphCrawler, NeighborMode};
use crate::output::{EdgeSink, OutputError, RunReport, TimelineSink};
use crate::resilience::{AbortCause, FailureCode, ResilienceEngine, Sleeper};
use crate::state::{EntityOutcome, EntityReport};
use crate::timeline::{BoundaryLocator, LocateError, StopReason, WindowCrawler};
use std::time::Duration;

/// Timeline pipeline settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineSettings {
    pub page_size: u32,
    pub pacing: Duration,
}

impl From<&CrawlerConfig> for TimelineSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            page_size: config.page_size,
            pacing: Duration::from_millis(config.pacing_delay_ms),
        }
    }
}

/// Graph pipeline settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphSettings {
    pub mode: NeighborMode,
    pub chunk_size: usize,
    pub resolve_names: bool,
}

impl From<&CrawlerConfig> for GraphSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            mode: config.neighbor_mode,
            chunk_size: config.chunk_size,
            resolve_names: config.resolve_names,
        }
    }
}

/// Main crawler coordinator structure
///
/// Owns the resilience engine so the failure tally spans the whole run.
pub struct Coordinator<S> {
    engine: ResilienceEngine<S>,
}

impl<S: Sleeper> Coordinator<S> {
    pub fn new(engine: ResilienceEngine<S>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &ResilienceEngine<S> {
        &self.engine
    }

    /// Retrieves the date window of every entity's timeline
    ///
    /// # Arguments
    ///
    /// * `feed` - Page-indexed feed to read from
    /// * `entities` - Entities in processing order
    /// * `window` - Inclusive date window to retrieve
    /// * `settings` - Page size and pacing delay
    /// * `sink` - Receives every emitted item
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - Per-entity outcomes and the failure tally
    /// * `Err(OutputError)` - The sink failed; the run stops there
    pub async fn run_timeline<F: PagedFeed + ?Sized>(
        &mut self,
        feed: &F,
        entities: &[Entity],
        window: &DateWindow,
        settings: &TimelineSettings,
        sink: &mut dyn TimelineSink,
    ) -> Result<RunReport, OutputError> {
        let mut report = RunReport::new();
        let total = entities.len();
        tracing::info!(
            "Starting timeline run: {} entities, window {}",
            total,
            window
        );

        for (index, entity) in entities.iter().enumerate() {
            if self.stop_requested(&mut report, total - index) {
                break;
            }
            tracing::info!(
                "Building corpus of entity ({}/{}): {}",
                index + 1,
                total,
                entity
            );

            sink.begin_entity(entity)?;
            let entity_report = self
                .timeline_entity(feed, entity, window, settings, sink)
                .await?;
            sink.finish_entity(&entity_report)?;

            log_outcome(&entity_report);
            report.record(entity_report);
        }

        report.finish(self.engine.tally().clone());
        Ok(report)
    }

    async fn timeline_entity<F: PagedFeed + ?Sized>(
        &mut self,
        feed: &F,
        entity: &Entity,
        window: &DateWindow,
        settings: &TimelineSettings,
        sink: &mut dyn TimelineSink,
    ) -> Result<EntityReport, OutputError> {
        let start_page = match BoundaryLocator::new(feed, settings.page_size)
            .locate(&mut self.engine, entity, window)
            .await
        {
            Ok(page) => page,
            Err(LocateError::Aborted(cause)) => return Ok(aborted(entity, 0, cause)),
            Err(err @ LocateError::Unordered { .. }) => {
                self.engine.record(FailureCode::Unordered);
                tracing::error!("{}: {}", entity, err);
                return Ok(EntityReport::stopped(entity, 0, err));
            }
            Err(err @ LocateError::TooDeep(_)) => {
                return Ok(EntityReport::stopped(entity, 0, err));
            }
        };
        tracing::info!("{}: window starts on page {}", entity, start_page);

        let crawl = WindowCrawler::new(feed, settings.page_size, settings.pacing)
            .crawl(&mut self.engine, entity, start_page, window, sink)
            .await?;

        let report = match crawl.stop {
            StopReason::ReachedWindowStart | StopReason::Exhausted => {
                EntityReport::done(entity, crawl.items_emitted)
            }
            StopReason::Shutdown => aborted(entity, crawl.items_emitted, AbortCause::Shutdown),
            StopReason::Aborted(cause) => aborted(entity, crawl.items_emitted, cause),
            StopReason::Unordered { page } => EntityReport::stopped(
                entity,
                crawl.items_emitted,
                LocateError::Unordered { page },
            ),
        };
        Ok(report)
    }

    /// Retrieves the social-graph edges of every entity
    ///
    /// # Arguments
    ///
    /// * `neighbors` - Source of neighbor ids
    /// * `lookup` - Batch resolver for neighbor names
    /// * `entities` - Entities in processing order
    /// * `settings` - Neighbor mode, chunk size and name resolution
    /// * `sink` - Receives every emitted edge
    pub async fn run_graph<N, L>(
        &mut self,
        neighbors: &N,
        lookup: &L,
        entities: &[Entity],
        settings: &GraphSettings,
        sink: &mut dyn EdgeSink,
    ) -> Result<RunReport, OutputError>
    where
        N: NeighborSource + ?Sized,
        L: ProfileLookup + ?Sized,
    {
        let mut report = RunReport::new();
        let total = entities.len();
        let crawler = GraphCrawler::new(neighbors, lookup, settings.mode)
            .with_chunk_size(settings.chunk_size)
            .with_resolve_names(settings.resolve_names);
        tracing::info!(
            "Starting graph run: {} entities, {} mode",
            total,
            settings.mode
        );

        for (index, entity) in entities.iter().enumerate() {
            if self.stop_requested(&mut report, total - index) {
                break;
            }
            tracing::info!(
                "Crawling neighbors of entity ({}/{}): {}",
                index + 1,
                total,
                entity
            );

            sink.begin_entity(entity)?;
            let phase = crawler.crawl(&mut self.engine, entity, sink).await?;
            let entity_report = phase.report(entity);
            sink.finish_entity(&entity_report)?;

            log_outcome(&entity_report);
            report.record(entity_report);
        }

        report.finish(self.engine.tally().clone());
        Ok(report)
    }

    fn stop_requested(&self, report: &mut RunReport, remaining: usize) -> bool {
        if !self.engine.is_shutdown() {
            return false;
        }
        tracing::warn!("Shutdown requested, {} entities not started", remaining);
        report.not_started = remaining;
        true
    }
}

fn aborted(entity: &Entity, records: u64, cause: AbortCause) -> EntityReport {
    let report = EntityReport::stopped(entity, records, cause);
    if cause == AbortCause::Shutdown {
        report.with_outcome(EntityOutcome::Interrupted)
    } else {
        report
    }
}

fn log_outcome(report: &EntityReport) {
    let cause = report.cause.as_deref().unwrap_or("");
    match report.outcome {
        EntityOutcome::Done => {
            tracing::info!("Finished {}: {} records", report.entity, report.records)
        }
        EntityOutcome::Interrupted => {
            tracing::warn!("Interrupted {} after {} records", report.entity, report.records)
        }
        EntityOutcome::PartiallyDone => tracing::warn!(
            "Partially crawled {}: {} records kept, {}",
            report.entity,
            report.records,
            cause
        ),
        EntityOutcome::Skipped => tracing::warn!("Could not crawl {}: {}", report.entity, cause),
    }
}
