//! Sink traits and types
//!
//! This module defines the interface the pipelines stream records into.
//! Sinks are driven from a single task and are not required to be `Sync`.

use crate::api::{Edge, Entity, FeedItem};
use crate::state::EntityReport;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Behaviour shared by every sink
///
/// Records written before a failure are never rolled back, so `flush` is
/// called after every page or chunk, before any sleep.
pub trait RecordSink {
    /// Called once before the first record of an entity
    ///
    /// # Arguments
    ///
    /// * `entity` - The entity about to be processed
    fn begin_entity(&mut self, _entity: &Entity) -> OutputResult<()> {
        Ok(())
    }

    /// Called once after an entity reached its final outcome
    ///
    /// # Arguments
    ///
    /// * `report` - What happened to the entity
    fn finish_entity(&mut self, _report: &EntityReport) -> OutputResult<()> {
        Ok(())
    }

    /// Pushes buffered records to durable storage
    fn flush(&mut self) -> OutputResult<()>;
}

/// Receives feed items of a timeline crawl
pub trait TimelineSink: RecordSink {
    /// Records one feed item belonging to `entity`
    fn write_item(&mut self, entity: &Entity, item: &FeedItem) -> OutputResult<()>;
}

/// Receives edges of a graph crawl
pub trait EdgeSink: RecordSink {
    /// Records one directed edge
    fn write_edge(&mut self, edge: &Edge) -> OutputResult<()>;
}
