//! Database connection and initialization utilities.
//!
//! This module provides the low-level SQLite connection primitive and the
//! idempotent schema setup used by `initialize` (spec §6.1).

use crate::core::error::Error;
use crate::core::schemas;
use rusqlite::Connection;

/// Establish a SQLite connection with this crate's standard configuration.
///
/// Enables:
/// - WAL (Write-Ahead Logging) mode for better concurrency
/// - Foreign key constraints
/// - a 5-second busy timeout for lock contention
///
/// Mutations should go through `core::broker::Broker::with_tx` rather than
/// opening a raw connection, so writes are serialized per database path.
pub fn connect(db_path: &str) -> Result<Connection, Error> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
    conn.execute("PRAGMA foreign_keys=ON;", [])?;
    Ok(conn)
}

/// Idempotent schema/metadata setup (spec §6.1 `initialize(store)`).
pub fn initialize(conn: &Connection) -> Result<(), Error> {
    conn.execute(schemas::SEGMENTS_TABLE, [])?;
    conn.execute(schemas::SEGMENTS_INDEX_ENTITY_VALID, [])?;
    conn.execute(schemas::SEGMENTS_INDEX_ENTITY_CURRENT, [])?;
    conn.execute(schemas::WATERMARKS_TABLE, [])?;
    Ok(())
}
