//! Remote feed API surface
//!
//! This module defines what the crawl pipelines consume from the remote API:
//! - The record types returned by the feed (items, id pages, profiles)
//! - The capability traits for page-index, cursor and batch-lookup calls
//! - The failure taxonomy every remote call reports through
//! - An HTTP client implementing all three capabilities

mod http;
mod traits;

pub use http::{build_http_client, HttpApi};
pub use traits::{ApiError, NeighborSource, PagedFeed, ProfileLookup};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// Opaque handle naming a user or account
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(String);

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single activity record from an entity's feed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedItem {
    pub id: u64,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub text: String,
}

/// Continuation token for cursor pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub i64);

impl Cursor {
    /// Sentinel meaning "from the beginning"
    pub const START: Cursor = Cursor(-1);

    /// Sentinel returned by the API when no further page exists
    pub const END: Cursor = Cursor(0);
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One page of neighbor identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdPage {
    pub ids: Vec<u64>,
    pub next_cursor: Cursor,
    pub has_more: bool,
}

impl IdPage {
    /// Builds a page whose continuation flag follows the cursor convention
    pub fn new(ids: Vec<u64>, next_cursor: Cursor) -> Self {
        Self {
            ids,
            next_cursor,
            has_more: next_cursor != Cursor::END,
        }
    }

    /// A page holding the whole neighbor set
    pub fn last(ids: Vec<u64>) -> Self {
        Self::new(ids, Cursor::END)
    }
}

/// Resolved account record returned by a batch lookup
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub id: u64,
    pub screen_name: String,
}

/// One directed social-graph relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

/// Inclusive date window a timeline crawl is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }

    /// True if `at` is newer than the window
    pub fn is_after_end(&self, at: DateTime<Utc>) -> bool {
        at > self.end
    }

    /// True if `at` is older than the window
    pub fn is_before_start(&self, at: DateTime<Utc>) -> bool {
        at < self.start
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}
