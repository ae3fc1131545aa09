//! Versioned feed schema bootstrap.
//!
//! # Invariants
//! - Bootstrap is idempotent: every statement is `IF NOT EXISTS`.
//! - The applied version is mirrored to `PRAGMA user_version`.
//! - Databases stamped with a newer version are rejected untouched.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Applies the feed schema on the provided connection when it is missing.
pub fn apply_schema(conn: &mut Connection) -> DbResult<()> {
    let current = current_user_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: SCHEMA_VERSION,
        });
    }
    if current == SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA_SQL)?;
    tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    tx.commit()?;
    Ok(())
}

/// Reads the schema version stamped on the connection.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
