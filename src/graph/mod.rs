//! Social-graph edge retrieval
//!
//! For every entity the full neighbor-id set is fetched first, then resolved
//! to display names in fixed-size chunks through the batch lookup endpoint.
//! Each entity moves through a small phase machine ([`Phase`]):
//!
//! ```text
//! AwaitingNeighborIds --ok--> ResolvingChunks --all chunks--> Done
//!         |                          |
//!       abort                      abort
//!         v                          v
//!      Skipped                 PartiallyDone
//! ```
//!
//! Without name resolution no lookups are made: each page of ids is written
//! as raw-id edges when it arrives, and an abort on a later cursor page ends
//! the entity as `PartiallyDone`.

mod crawler;

pub use crawler::{GraphCrawler, Phase, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};

use crate::resilience::Pagination;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// How the neighbor-id set of an entity is fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NeighborMode {
    /// Follow continuation cursors until the API reports no further page
    #[default]
    Cursor,

    /// One call from the start cursor; any continuation is ignored
    SingleShot,
}

impl NeighborMode {
    /// Pagination discipline of the neighbor-id calls in this mode
    ///
    /// A single-shot call is throttled like a page-index request. Chunk
    /// lookups are page-index calls in both modes.
    pub fn pagination(&self, chunk_size: u32) -> Pagination {
        match self {
            Self::Cursor => Pagination::Cursor,
            Self::SingleShot => Pagination::PageIndex {
                page_size: chunk_size,
            },
        }
    }
}

impl fmt::Display for NeighborMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cursor => f.write_str("cursor"),
            Self::SingleShot => f.write_str("single-shot"),
        }
    }
}

impl FromStr for NeighborMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cursor" => Ok(Self::Cursor),
            "single-shot" => Ok(Self::SingleShot),
            other => Err(format!(
                "unknown neighbor mode '{}' (expected cursor or single-shot)",
                other
            )),
        }
    }
}
