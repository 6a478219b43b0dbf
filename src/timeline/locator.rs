//! Boundary search over a reverse-chronological page-indexed feed
//!
//! The first page overlapping a date window is found with single-item probes:
//!
//! 1. Doubling phase: probe pages 1, 2, 4, 8, ... until a probe is empty or
//!    at/before the window end. This brackets the boundary between the last
//!    probe that was still too new and the current one in O(log P) calls.
//! 2. Closing phase: narrow the bracket from its upper side, halving the gap
//!    while the window is still far away and stepping one page at a time once
//!    a probe lands inside or after the window start.
//!
//! The probe for page `p` is the single item at position `p * page_size`,
//! i.e. the oldest item of full page `p`.

use crate::api::{DateWindow, Entity, PagedFeed};
use crate::resilience::{AbortCause, Pagination, ResilienceEngine, Sleeper};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Why a boundary search did not produce a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocateError {
    #[error("boundary search aborted: {0}")]
    Aborted(#[from] AbortCause),

    #[error("feed out of order around page {page}")]
    Unordered { page: u32 },

    #[error("feed deeper than {0} pages")]
    TooDeep(u32),
}

/// Probe timestamps seen so far, used to detect ordering violations
#[derive(Debug, Default)]
struct Probes {
    seen: Vec<(u32, DateTime<Utc>)>,
}

impl Probes {
    fn check(&mut self, page: u32, at: DateTime<Utc>) -> Result<(), LocateError> {
        let violated = self
            .seen
            .iter()
            .any(|(p, t)| (*p < page && *t < at) || (*p > page && *t > at));
        if violated {
            return Err(LocateError::Unordered { page });
        }
        self.seen.push((page, at));
        Ok(())
    }
}

/// Finds the first page of a feed at or before a window's end
pub struct BoundaryLocator<'a, F: ?Sized> {
    feed: &'a F,
    page_size: u32,
}

impl<'a, F: PagedFeed + ?Sized> BoundaryLocator<'a, F> {
    pub fn new(feed: &'a F, page_size: u32) -> Self {
        Self { feed, page_size }
    }

    /// Returns the smallest page (>= 1) whose probe is at or before `window.end`
    ///
    /// An empty feed yields page 1. A feed entirely newer than the window
    /// yields the first empty page past its end.
    pub async fn locate<S: Sleeper>(
        &self,
        engine: &mut ResilienceEngine<S>,
        entity: &Entity,
        window: &DateWindow,
    ) -> Result<u32, LocateError> {
        let mut probes = Probes::default();
        let mut current: u32 = 1;
        let mut lower: u32 = 0;
        let mut close;

        tracing::debug!("{}: doubling phase start", entity);
        loop {
            let probe = self.probe(engine, entity, current).await?;
            if let Some(at) = probe {
                probes.check(current, at)?;
            }

            match probe {
                Some(at) if window.is_after_end(at) => {
                    lower = current;
                    current = current
                        .checked_mul(2)
                        .ok_or(LocateError::TooDeep(current))?;
                    tracing::debug!("{}: doubling, going to page {}", entity, current);
                }
                // An empty page counts as found even if the feed has gaps
                other => {
                    close = other.is_some_and(|at| at > window.start);
                    tracing::debug!("{}: doubling found end point at page {}", entity, current);
                    break;
                }
            }
        }

        let mut upper = current;
        tracing::debug!(
            "{}: closing phase start, bracket ({}, {}]",
            entity,
            lower,
            upper
        );
        while upper - lower > 1 {
            let gap = upper - lower;
            let step = if close { 1 } else { gap / 2 };
            current = upper - step;
            tracing::debug!(
                "{}: {} reducing to page {}",
                entity,
                if close { "linearly" } else { "binarily" },
                current
            );

            match self.probe(engine, entity, current).await? {
                Some(at) => {
                    probes.check(current, at)?;
                    if window.is_after_end(at) {
                        lower = current;
                    } else {
                        upper = current;
                        close = at > window.start;
                    }
                }
                None => upper = current,
            }
        }

        tracing::debug!("{}: boundary at page {}", entity, upper.max(1));
        Ok(upper.max(1))
    }

    async fn probe<S: Sleeper>(
        &self,
        engine: &mut ResilienceEngine<S>,
        entity: &Entity,
        page: u32,
    ) -> Result<Option<DateTime<Utc>>, LocateError> {
        let index = page
            .checked_mul(self.page_size)
            .ok_or(LocateError::TooDeep(page))?;
        let feed = self.feed;
        let label = format!("{} probe {}", entity, page);
        let pagination = Pagination::PageIndex {
            page_size: self.page_size,
        };

        let items = engine
            .run(&label, pagination, move || feed.fetch_page(entity, index, 1))
            .await?;
        Ok(items.first().map(|item| item.created_at))
    }
}
