//! Relational backend over SQLite.
//!
//! # Invariants
//! - Statements come from `Operation::to_sql` and bind every value by name.
//! - One connection behind a mutex; every call holds it for its full duration.
//! - Batches run inside one `BEGIN IMMEDIATE` transaction and keep the
//!   connection locked until commit or rollback.
//! - SQLite constraint failures surface as `ConstraintViolation`; every other
//!   engine failure is a transport failure.

use crate::backend::{check_arity, Backend, BackendKind, Row, TransactionScope};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::value::{format_timestamp, parse_timestamp, Column, ColumnKind, FieldValue};
use crate::repo::{RepoError, RepoResult};
use crate::statement::{Operation, Predicate};
use log::warn;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, ErrorCode, ToSql};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed adapter sharing one bootstrapped connection between callers.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Opens (or creates) a database file with the feed schema applied.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps a connection that already carries the feed schema.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }
}

impl Backend for SqliteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn execute(&self, operation: &Operation, values: &[FieldValue]) -> RepoResult<usize> {
        execute_on(&*self.lock()?, operation, values)
    }

    fn begin(&self) -> RepoResult<Box<dyn TransactionScope + '_>> {
        let conn = self.lock()?;
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(DbError::from)?;
        Ok(Box::new(SqliteScope { conn }))
    }

    fn scan_all(&self, operation: &Operation) -> RepoResult<Vec<Row>> {
        query_rows(&*self.lock()?, operation, &[])
    }

    fn scan_by_id(&self, operation: &Operation, id: &FieldValue) -> RepoResult<Option<Row>> {
        if operation.predicate() != Predicate::PrimaryKey {
            return Err(RepoError::InvalidDescriptor {
                collection: operation.collection(),
                reason: "scan_by_id requires a by-id read".to_string(),
            });
        }
        let mut rows = query_rows(&*self.lock()?, operation, std::slice::from_ref(id))?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    fn scan_by_field(&self, operation: &Operation, value: &FieldValue) -> RepoResult<Vec<Row>> {
        if !matches!(operation.predicate(), Predicate::Field(_)) {
            return Err(RepoError::InvalidDescriptor {
                collection: operation.collection(),
                reason: "scan_by_field requires a filtered read".to_string(),
            });
        }
        query_rows(&*self.lock()?, operation, std::slice::from_ref(value))
    }
}

/// Open transaction holding the connection lock.
struct SqliteScope<'conn> {
    conn: MutexGuard<'conn, Connection>,
}

impl TransactionScope for SqliteScope<'_> {
    fn execute(&mut self, operation: &Operation, values: &[FieldValue]) -> RepoResult<usize> {
        execute_on(&self.conn, operation, values)
    }

    fn commit(self: Box<Self>) -> Result<(), DbError> {
        self.conn.execute_batch("COMMIT").map_err(DbError::from)
    }

    fn rollback(self: Box<Self>) -> Result<(), DbError> {
        self.conn.execute_batch("ROLLBACK").map_err(DbError::from)
    }
}

impl Drop for SqliteScope<'_> {
    fn drop(&mut self) {
        // Never hand the next caller a connection inside a stale transaction.
        if !self.conn.is_autocommit() {
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                warn!("event=scope_release module=backend status=error error={err}");
            }
        }
    }
}

fn execute_on(conn: &Connection, operation: &Operation, values: &[FieldValue]) -> RepoResult<usize> {
    check_arity(operation, values)?;
    let names = placeholder_names(operation);
    let bound = values.iter().map(to_sql_value).collect::<Vec<_>>();
    let params = named_params(&names, &bound);

    let mut stmt = conn
        .prepare_cached(&operation.to_sql())
        .map_err(|err| map_sqlite_error(operation, err))?;
    stmt.execute(params.as_slice())
        .map_err(|err| map_sqlite_error(operation, err))
}

fn query_rows(
    conn: &Connection,
    operation: &Operation,
    values: &[FieldValue],
) -> RepoResult<Vec<Row>> {
    check_arity(operation, values)?;
    let names = placeholder_names(operation);
    let bound = values.iter().map(to_sql_value).collect::<Vec<_>>();
    let params = named_params(&names, &bound);
    let columns = operation.descriptor().columns;

    let mut stmt = conn
        .prepare_cached(&operation.to_sql())
        .map_err(|err| map_sqlite_error(operation, err))?;
    let mut rows = stmt
        .query(params.as_slice())
        .map_err(|err| map_sqlite_error(operation, err))?;

    let mut scanned = Vec::new();
    while let Some(row) = rows.next().map_err(|err| map_sqlite_error(operation, err))? {
        let mut values = Vec::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            let raw = row
                .get_ref(index)
                .map_err(|err| map_sqlite_error(operation, err))?;
            values.push(from_sql_value(operation.collection(), column, raw)?);
        }
        scanned.push(values);
    }
    Ok(scanned)
}

fn placeholder_names(operation: &Operation) -> Vec<String> {
    operation
        .bind_columns()
        .iter()
        .map(|column| format!(":{}", column.name))
        .collect()
}

fn named_params<'a>(names: &'a [String], values: &'a [Value]) -> Vec<(&'a str, &'a dyn ToSql)> {
    names
        .iter()
        .zip(values)
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect()
}

fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(text) => Value::Text(text.clone()),
        FieldValue::Integer(number) => Value::Integer(*number),
        FieldValue::Bool(flag) => Value::Integer(i64::from(*flag)),
        FieldValue::Blob(bytes) => Value::Blob(bytes.clone()),
        FieldValue::Timestamp(at) => Value::Text(format_timestamp(at)),
    }
}

fn from_sql_value(collection: &str, column: &Column, raw: ValueRef<'_>) -> RepoResult<FieldValue> {
    let invalid = |found: &str| {
        RepoError::InvalidData(format!(
            "invalid {found} value in {collection}.{} (expected {})",
            column.name, column.kind
        ))
    };

    match (column.kind, raw) {
        (ColumnKind::Id | ColumnKind::Text, ValueRef::Text(bytes)) => std::str::from_utf8(bytes)
            .map(|text| FieldValue::Text(text.to_string()))
            .map_err(|_| invalid("non-utf8 text")),
        (ColumnKind::Integer, ValueRef::Integer(number)) => Ok(FieldValue::Integer(number)),
        (ColumnKind::Bool, ValueRef::Integer(0)) => Ok(FieldValue::Bool(false)),
        (ColumnKind::Bool, ValueRef::Integer(1)) => Ok(FieldValue::Bool(true)),
        (ColumnKind::Blob, ValueRef::Blob(bytes)) => Ok(FieldValue::Blob(bytes.to_vec())),
        (ColumnKind::Blob, ValueRef::Null) => Ok(FieldValue::Blob(Vec::new())),
        (ColumnKind::Timestamp, ValueRef::Text(bytes)) => std::str::from_utf8(bytes)
            .ok()
            .and_then(parse_timestamp)
            .map(FieldValue::Timestamp)
            .ok_or_else(|| invalid("timestamp")),
        (_, ValueRef::Null) => Err(invalid("null")),
        (_, other) => Err(invalid(other.data_type().to_string().as_str())),
    }
}

fn map_sqlite_error(operation: &Operation, err: rusqlite::Error) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            return RepoError::ConstraintViolation {
                collection: operation.collection(),
                message: message.clone().unwrap_or_else(|| failure.to_string()),
            };
        }
    }
    RepoError::Transport(DbError::Sqlite(err))
}
