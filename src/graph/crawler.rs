//! Per-entity neighbor crawl and chunked name resolution

use super::NeighborMode;
use crate::api::{Cursor, Edge, Entity, NeighborSource, ProfileLookup};
use crate::output::{EdgeSink, OutputError};
use crate::resilience::{AbortCause, Pagination, ResilienceEngine, Sleeper};
use crate::state::{EntityOutcome, EntityReport};

/// Ids resolved per batch lookup unless configured otherwise
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Largest chunk the batch lookup endpoint accepts
pub const MAX_CHUNK_SIZE: usize = 100;

/// Progress of one entity through the graph pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Fetching neighbor ids, `cursor` is the next page to ask for
    ///
    /// Without name resolution every page is written as it arrives and
    /// `collected` stays empty.
    AwaitingNeighborIds {
        cursor: Cursor,
        collected: Vec<u64>,
        emitted: u64,
    },

    /// Resolving `ids` chunk by chunk
    ResolvingChunks {
        ids: Vec<u64>,
        next_chunk: usize,
        emitted: u64,
    },

    Done { emitted: u64 },

    /// The neighbor ids could not be fetched
    Skipped { cause: AbortCause },

    /// A chunk lookup was abandoned; earlier chunks stay emitted
    PartiallyDone { emitted: u64, cause: AbortCause },
}

impl Phase {
    pub fn start() -> Self {
        Self::AwaitingNeighborIds {
            cursor: Cursor::START,
            collected: Vec::new(),
            emitted: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Done { .. } | Self::Skipped { .. } | Self::PartiallyDone { .. }
        )
    }

    /// Edges emitted so far
    pub fn emitted(&self) -> u64 {
        match self {
            Self::AwaitingNeighborIds { emitted, .. }
            | Self::ResolvingChunks { emitted, .. }
            | Self::Done { emitted }
            | Self::PartiallyDone { emitted, .. } => *emitted,
            Self::Skipped { .. } => 0,
        }
    }

    /// Summarizes the phase as an end-of-run entity report
    ///
    /// A phase abandoned because of shutdown, or never finished, is reported
    /// as `Interrupted`.
    pub fn report(&self, entity: &Entity) -> EntityReport {
        match self {
            Self::Done { emitted } => EntityReport::done(entity, *emitted),
            Self::Skipped { cause } | Self::PartiallyDone { cause, .. }
                if *cause == AbortCause::Shutdown =>
            {
                EntityReport::stopped(entity, self.emitted(), cause)
                    .with_outcome(EntityOutcome::Interrupted)
            }
            Self::Skipped { cause } => EntityReport::stopped(entity, 0, cause),
            Self::PartiallyDone { emitted, cause } => EntityReport::stopped(entity, *emitted, cause)
                .with_outcome(EntityOutcome::PartiallyDone),
            Self::AwaitingNeighborIds { .. } | Self::ResolvingChunks { .. } => {
                EntityReport::stopped(entity, self.emitted(), "not finished")
                    .with_outcome(EntityOutcome::Interrupted)
            }
        }
    }
}

/// Drives entities through the graph phase machine
pub struct GraphCrawler<'a, N: ?Sized, L: ?Sized> {
    neighbors: &'a N,
    lookup: &'a L,
    mode: NeighborMode,
    chunk_size: usize,
    resolve_names: bool,
}

impl<'a, N, L> GraphCrawler<'a, N, L>
where
    N: NeighborSource + ?Sized,
    L: ProfileLookup + ?Sized,
{
    pub fn new(neighbors: &'a N, lookup: &'a L, mode: NeighborMode) -> Self {
        Self {
            neighbors,
            lookup,
            mode,
            chunk_size: DEFAULT_CHUNK_SIZE,
            resolve_names: true,
        }
    }

    /// Sets the number of ids per lookup, clamped to `1..=MAX_CHUNK_SIZE`
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.clamp(1, MAX_CHUNK_SIZE);
        self
    }

    /// When disabled, edges carry raw neighbor ids and no lookups are made
    pub fn with_resolve_names(mut self, resolve_names: bool) -> Self {
        self.resolve_names = resolve_names;
        self
    }

    /// Chunk size as the page size of a lookup call
    fn chunk_pages(&self) -> u32 {
        u32::try_from(self.chunk_size).unwrap_or(u32::MAX)
    }

    /// Runs `entity` to a terminal phase, streaming edges to `sink`
    ///
    /// Only sink failures are returned as errors.
    pub async fn crawl<S: Sleeper>(
        &self,
        engine: &mut ResilienceEngine<S>,
        entity: &Entity,
        sink: &mut dyn EdgeSink,
    ) -> Result<Phase, OutputError> {
        let mut phase = Phase::start();
        while !phase.is_terminal() {
            phase = self.step(engine, entity, phase, sink).await?;
        }
        Ok(phase)
    }

    async fn step<S: Sleeper>(
        &self,
        engine: &mut ResilienceEngine<S>,
        entity: &Entity,
        phase: Phase,
        sink: &mut dyn EdgeSink,
    ) -> Result<Phase, OutputError> {
        let next = match phase {
            Phase::AwaitingNeighborIds {
                cursor,
                mut collected,
                mut emitted,
            } => {
                let neighbors = self.neighbors;
                let label = format!("{} neighbors (cursor {})", entity, cursor);
                let pagination = self.mode.pagination(self.chunk_pages());
                match engine
                    .run(&label, pagination, move || neighbors.neighbor_ids(entity, cursor))
                    .await
                {
                    Ok(page) => {
                        if self.resolve_names {
                            collected.extend(page.ids);
                        } else {
                            emitted += write_raw_ids(entity, &page.ids, sink)?;
                        }

                        if self.mode == NeighborMode::Cursor && page.has_more {
                            Phase::AwaitingNeighborIds {
                                cursor: page.next_cursor,
                                collected,
                                emitted,
                            }
                        } else if self.resolve_names {
                            tracing::info!("{}: {} neighbors", entity, collected.len());
                            Phase::ResolvingChunks {
                                ids: collected,
                                next_chunk: 0,
                                emitted: 0,
                            }
                        } else {
                            tracing::info!("{}: {} neighbors", entity, emitted);
                            Phase::Done { emitted }
                        }
                    }
                    Err(cause) if emitted > 0 => {
                        tracing::warn!(
                            "{}: neighbor paging stopped after {} ids: {}",
                            entity,
                            emitted,
                            cause
                        );
                        Phase::PartiallyDone { emitted, cause }
                    }
                    Err(cause) => {
                        tracing::warn!("Could not access neighbors of {}: {}", entity, cause);
                        Phase::Skipped { cause }
                    }
                }
            }

            Phase::ResolvingChunks {
                ids,
                next_chunk,
                mut emitted,
            } => {
                let start = next_chunk * self.chunk_size;
                if start >= ids.len() {
                    return Ok(Phase::Done { emitted });
                }
                let end = (start + self.chunk_size).min(ids.len());
                let chunk = &ids[start..end];
                let source = entity.to_string();

                let lookup = self.lookup;
                let label = format!(
                    "{} chunk {}/{}",
                    entity,
                    next_chunk + 1,
                    ids.len().div_ceil(self.chunk_size)
                );
                let pagination = Pagination::PageIndex {
                    page_size: self.chunk_pages(),
                };
                match engine
                    .run(&label, pagination, move || lookup.lookup(chunk))
                    .await
                {
                    Ok(profiles) => {
                        for profile in profiles {
                            sink.write_edge(&Edge {
                                source: source.clone(),
                                target: profile.screen_name,
                            })?;
                            emitted += 1;
                        }
                    }
                    Err(cause) => {
                        sink.flush()?;
                        tracing::warn!(
                            "{}: dropping chunks from {} on: {}",
                            entity,
                            next_chunk + 1,
                            cause
                        );
                        return Ok(Phase::PartiallyDone { emitted, cause });
                    }
                }
                sink.flush()?;

                Phase::ResolvingChunks {
                    ids,
                    next_chunk: next_chunk + 1,
                    emitted,
                }
            }

            terminal => terminal,
        };
        Ok(next)
    }
}

/// Writes one edge per raw neighbor id and flushes them as one page
fn write_raw_ids(entity: &Entity, ids: &[u64], sink: &mut dyn EdgeSink) -> Result<u64, OutputError> {
    let source = entity.to_string();
    for id in ids {
        sink.write_edge(&Edge {
            source: source.clone(),
            target: id.to_string(),
        })?;
    }
    sink.flush()?;
    Ok(ids.len() as u64)
}
