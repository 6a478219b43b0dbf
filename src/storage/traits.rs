//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::api::{Edge, Entity, FeedItem};
use crate::resilience::ErrorTally;
use crate::state::EntityReport;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed to persist a run.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    /// * `mode` - Which pipeline the run executes (`timeline` or `graph`)
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str, mode: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as finished with the given status and a finish timestamp
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Records =====

    /// Inserts a batch of feed items in one transaction
    ///
    /// Items already stored for the same run and entity are ignored.
    fn insert_feed_items(&mut self, run_id: i64, items: &[(Entity, FeedItem)])
        -> StorageResult<()>;

    /// Inserts a batch of edges in one transaction
    fn insert_edges(&mut self, run_id: i64, edges: &[Edge]) -> StorageResult<()>;

    /// Counts feed items stored for a run
    fn count_feed_items(&self, run_id: i64) -> StorageResult<u64>;

    /// Counts edges stored for a run
    fn count_edges(&self, run_id: i64) -> StorageResult<u64>;

    // ===== Reporting =====

    /// Records (or replaces) the outcome of one entity
    fn record_entity_outcome(&mut self, run_id: i64, report: &EntityReport)
        -> StorageResult<()>;

    /// Loads the outcomes of a run in entity order
    fn load_entity_outcomes(&self, run_id: i64) -> StorageResult<Vec<EntityReport>>;

    /// Stores the failure tally of a run
    fn save_failure_tally(&mut self, run_id: i64, tally: &ErrorTally) -> StorageResult<()>;

    /// Loads the failure tally of a run as `(code, count)` pairs
    fn load_failure_tally(&self, run_id: i64) -> StorageResult<Vec<(String, u64)>>;
}
