//! Capability traits the crawl pipelines consume
//!
//! Implementations own transport, authentication and response parsing; the
//! pipelines only see typed records and an [`ApiError`] describing why a call
//! failed.

use crate::api::{Cursor, Entity, FeedItem, IdPage, Profile};
use crate::resilience::FailureCode;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a single remote call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited, reset in {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("resource not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    #[error("unauthorized")]
    Unauthorized,

    #[error("unexpected HTTP status {0}")]
    Other(u16),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// The code this failure is tallied under
    pub fn code(&self) -> FailureCode {
        match self {
            Self::Network(_) => FailureCode::Network,
            Self::RateLimited { .. } => FailureCode::Http(429),
            Self::NotFound => FailureCode::Http(404),
            Self::Forbidden => FailureCode::Http(403),
            Self::Unauthorized => FailureCode::Http(401),
            Self::Other(status) => FailureCode::Http(*status),
            Self::Malformed(_) => FailureCode::Malformed,
        }
    }

    /// True for failures that must not be retried
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::NotFound | Self::Forbidden | Self::Unauthorized)
    }
}

/// Page-index pagination over a reverse-chronological feed
#[async_trait]
pub trait PagedFeed: Send + Sync {
    /// Fetches page `page` (1-based) holding up to `count` items, newest first
    async fn fetch_page(
        &self,
        entity: &Entity,
        page: u32,
        count: u32,
    ) -> Result<Vec<FeedItem>, ApiError>;
}

/// Cursor pagination over an entity's neighbor identifiers
#[async_trait]
pub trait NeighborSource: Send + Sync {
    async fn neighbor_ids(&self, entity: &Entity, cursor: Cursor) -> Result<IdPage, ApiError>;
}

/// Batch resolution of identifiers to account records
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn lookup(&self, ids: &[u64]) -> Result<Vec<Profile>, ApiError>;
}
