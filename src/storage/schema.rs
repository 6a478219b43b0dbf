//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the trawl database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    mode TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Feed items of timeline runs
CREATE TABLE IF NOT EXISTS feed_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    entity TEXT NOT NULL,
    item_id INTEGER NOT NULL,
    author TEXT NOT NULL,
    created_at TEXT NOT NULL,
    text TEXT NOT NULL,
    UNIQUE(run_id, entity, item_id)
);

CREATE INDEX IF NOT EXISTS idx_feed_items_entity ON feed_items(entity);

-- Social-graph edges of graph runs
CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    source TEXT NOT NULL,
    target TEXT NOT NULL,
    UNIQUE(run_id, source, target)
);

CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source);

-- Final state of every entity of a run
CREATE TABLE IF NOT EXISTS entity_outcomes (
    run_id INTEGER NOT NULL REFERENCES runs(id),
    entity TEXT NOT NULL,
    outcome TEXT NOT NULL,
    records INTEGER NOT NULL DEFAULT 0,
    cause TEXT,
    finished_at TEXT NOT NULL,
    PRIMARY KEY(run_id, entity)
);

-- Failure counts by code, written when a run finishes
CREATE TABLE IF NOT EXISTS failure_tally (
    run_id INTEGER NOT NULL REFERENCES runs(id),
    code TEXT NOT NULL,
    count INTEGER NOT NULL,
    PRIMARY KEY(run_id, code)
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in [
            "runs",
            "feed_items",
            "edges",
            "entity_outcomes",
            "failure_tally",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
