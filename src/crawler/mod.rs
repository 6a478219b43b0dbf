//! Crawler module for run orchestration
//!
//! This module contains the entry points that wire configuration, the HTTP
//! client and the resilience engine into a [`Coordinator`]:
//! - Timeline runs over a page-indexed feed
//! - Graph runs over cursor-paged neighbor ids and batch lookups

mod coordinator;

pub use coordinator::{Coordinator, GraphSettings, TimelineSettings};

use crate::api::{DateWindow, Entity, HttpApi};
use crate::config::Config;
use crate::output::{EdgeSink, RunReport, TimelineSink};
use crate::resilience::{ResilienceEngine, RetryPolicy, TokioSleeper};
use crate::TrawlError;
use tokio_util::sync::CancellationToken;

/// Runs a complete timeline crawl
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `entities` - Entities in processing order
/// * `window` - Inclusive date window to retrieve
/// * `sink` - Receives every emitted item
/// * `shutdown` - Cancelled to stop sleeping and skip remaining entities
///
/// # Returns
///
/// * `Ok(RunReport)` - The run finished or was interrupted cleanly
/// * `Err(TrawlError)` - Client setup or the sink failed
pub async fn crawl_timelines(
    config: &Config,
    entities: &[Entity],
    window: &DateWindow,
    sink: &mut dyn TimelineSink,
    shutdown: CancellationToken,
) -> Result<RunReport, TrawlError> {
    let api = HttpApi::new(&config.api)?;
    let policy = RetryPolicy::new(&config.retry);
    tracing::debug!("Retry policy: {:?}", policy);

    let mut coordinator = Coordinator::new(ResilienceEngine::new(policy, TokioSleeper::new(shutdown)));
    let settings = TimelineSettings::from(&config.crawler);
    let report = coordinator
        .run_timeline(&api, entities, window, &settings, sink)
        .await?;
    Ok(report)
}

/// Runs a complete graph crawl
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `entities` - Entities in processing order
/// * `sink` - Receives every emitted edge
/// * `shutdown` - Cancelled to stop sleeping and skip remaining entities
pub async fn crawl_graph(
    config: &Config,
    entities: &[Entity],
    sink: &mut dyn EdgeSink,
    shutdown: CancellationToken,
) -> Result<RunReport, TrawlError> {
    let api = HttpApi::new(&config.api)?;
    let settings = GraphSettings::from(&config.crawler);
    let policy = RetryPolicy::new(&config.retry);
    tracing::debug!("Retry policy: {:?}", policy);

    let mut coordinator = Coordinator::new(ResilienceEngine::new(policy, TokioSleeper::new(shutdown)));
    let report = coordinator
        .run_graph(&api, &api, entities, &settings, sink)
        .await?;
    Ok(report)
}
