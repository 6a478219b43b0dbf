//! SQLite-backed record sink
//!
//! Records are buffered per page or chunk and written in one transaction on
//! every flush, so a committed page is never half-written.

use crate::api::{Edge, Entity, FeedItem};
use crate::output::{EdgeSink, OutputError, OutputResult, RecordSink, RunReport, TimelineSink};
use crate::state::EntityReport;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunStatus, SqliteStorage};

impl From<StorageError> for OutputError {
    fn from(err: StorageError) -> Self {
        OutputError::Storage(err.to_string())
    }
}

/// Sink persisting one run into a storage backend
pub struct SqliteSink<S: Storage = SqliteStorage> {
    storage: S,
    run_id: i64,
    pending_items: Vec<(Entity, FeedItem)>,
    pending_edges: Vec<Edge>,
}

impl<S: Storage> SqliteSink<S> {
    /// Opens a new run in `storage`
    ///
    /// # Arguments
    ///
    /// * `storage` - Backend receiving the records
    /// * `config_hash` - Hash of the configuration the run uses
    /// * `mode` - Pipeline name stored with the run
    pub fn start(mut storage: S, config_hash: &str, mode: &str) -> StorageResult<Self> {
        let run_id = storage.create_run(config_hash, mode)?;
        tracing::info!("Started run {} ({})", run_id, mode);
        Ok(Self {
            storage,
            run_id,
            pending_items: Vec::new(),
            pending_edges: Vec::new(),
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Flushes pending records, stores the tally and closes the run
    pub fn finish(&mut self, report: &RunReport) -> OutputResult<()> {
        self.flush()?;
        self.storage.save_failure_tally(self.run_id, &report.tally)?;
        let status = if report.was_interrupted() {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };
        self.storage.finish_run(self.run_id, status)?;
        tracing::info!("Run {} finished as {}", self.run_id, status.to_db_string());
        Ok(())
    }

    /// Marks the run as failed after an unrecoverable error
    pub fn abandon(&mut self) -> OutputResult<()> {
        self.storage.finish_run(self.run_id, RunStatus::Failed)?;
        tracing::error!("Run {} marked as failed", self.run_id);
        Ok(())
    }
}

impl<S: Storage> RecordSink for SqliteSink<S> {
    fn finish_entity(&mut self, report: &EntityReport) -> OutputResult<()> {
        self.flush()?;
        self.storage.record_entity_outcome(self.run_id, report)?;
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        if !self.pending_items.is_empty() {
            self.storage
                .insert_feed_items(self.run_id, &self.pending_items)?;
            self.pending_items.clear();
        }
        if !self.pending_edges.is_empty() {
            self.storage.insert_edges(self.run_id, &self.pending_edges)?;
            self.pending_edges.clear();
        }
        Ok(())
    }
}

impl<S: Storage> TimelineSink for SqliteSink<S> {
    fn write_item(&mut self, entity: &Entity, item: &FeedItem) -> OutputResult<()> {
        self.pending_items.push((entity.clone(), item.clone()));
        Ok(())
    }
}

impl<S: Storage> EdgeSink for SqliteSink<S> {
    fn write_edge(&mut self, edge: &Edge) -> OutputResult<()> {
        self.pending_edges.push(edge.clone());
        Ok(())
    }
}
