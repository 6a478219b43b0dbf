//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::api::{Edge, Entity, FeedItem};
use crate::resilience::ErrorTally;
use crate::state::{EntityOutcome, EntityReport};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        mode: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str, mode: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, mode, status) VALUES (?1, ?2, ?3, ?4)",
            params![now, config_hash, mode, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, mode, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, mode, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Records =====

    fn insert_feed_items(
        &mut self,
        run_id: i64,
        items: &[(Entity, FeedItem)],
    ) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO feed_items (run_id, entity, item_id, author, created_at, text)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (entity, item) in items {
                let item_id = i64::try_from(item.id).map_err(|_| {
                    StorageError::Database(format!("item id {} out of range", item.id))
                })?;
                stmt.execute(params![
                    run_id,
                    entity.as_str(),
                    item_id,
                    item.author,
                    item.created_at.to_rfc3339(),
                    item.text
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn insert_edges(&mut self, run_id: i64, edges: &[Edge]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO edges (run_id, source, target) VALUES (?1, ?2, ?3)",
            )?;
            for edge in edges {
                stmt.execute(params![run_id, edge.source, edge.target])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn count_feed_items(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM feed_items WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_edges(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM edges WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Reporting =====

    fn record_entity_outcome(
        &mut self,
        run_id: i64,
        report: &EntityReport,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO entity_outcomes (run_id, entity, outcome, records, cause, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run_id,
                report.entity.as_str(),
                report.outcome.to_db_string(),
                report.records as i64,
                report.cause,
                now
            ],
        )?;
        Ok(())
    }

    fn load_entity_outcomes(&self, run_id: i64) -> StorageResult<Vec<EntityReport>> {
        let mut stmt = self.conn.prepare(
            "SELECT entity, outcome, records, cause FROM entity_outcomes
             WHERE run_id = ?1 ORDER BY rowid",
        )?;

        let reports = stmt
            .query_map(params![run_id], |row| {
                let outcome: String = row.get(1)?;
                let records: i64 = row.get(2)?;
                Ok(EntityReport {
                    entity: Entity::new(row.get::<_, String>(0)?),
                    outcome: EntityOutcome::from_db_string(&outcome)
                        .unwrap_or(EntityOutcome::Skipped),
                    records: records as u64,
                    cause: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(reports)
    }

    fn save_failure_tally(&mut self, run_id: i64, tally: &ErrorTally) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM failure_tally WHERE run_id = ?1", params![run_id])?;
        for (code, count) in tally.by_frequency() {
            tx.execute(
                "INSERT INTO failure_tally (run_id, code, count) VALUES (?1, ?2, ?3)",
                params![run_id, code.to_db_string(), count as i64],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn load_failure_tally(&self, run_id: i64) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT code, count FROM failure_tally WHERE run_id = ?1 ORDER BY count DESC, code",
        )?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
