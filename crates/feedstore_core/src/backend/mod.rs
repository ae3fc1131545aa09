//! Backend adapter contract and its relational/document implementations.
//!
//! # Responsibility
//! - Define the capability set every storage engine must provide.
//! - Keep engine details (SQL, documents, snapshots) behind one seam so the
//!   generic repository is written once.
//!
//! # Invariants
//! - Rows are exchanged as `FieldValue` vectors in descriptor column order.
//! - Unfiltered and field-filtered scans are ordered by the descriptor's
//!   `order_by` columns.
//! - A transaction scope that is dropped without `commit` rolls back.
//! - Backends are shared handles: `Send + Sync`, serialized internally.

use crate::db::DbError;
use crate::model::value::FieldValue;
use crate::repo::{RepoError, RepoResult};
use crate::statement::Operation;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub mod document;
pub mod factory;
pub mod sqlite;

pub use document::DocumentBackend;
pub use factory::open_backend;
pub use sqlite::SqliteBackend;

/// One scanned row, ordered like the descriptor's columns.
pub type Row = Vec<FieldValue>;

/// Storage engine selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// SQLite with parameterized statements.
    #[serde(alias = "relational")]
    Sqlite,
    /// Embedded schemaless document store.
    #[serde(alias = "doc")]
    Document,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Document => "document",
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown backend name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBackend(pub String);

impl Display for UnknownBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown backend `{}`; expected sqlite|relational|document|doc",
            self.0
        )
    }
}

impl std::error::Error for UnknownBackend {}

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "relational" => Ok(Self::Sqlite),
            "document" | "doc" => Ok(Self::Document),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}

/// Capability set a storage engine provides to the repository layer.
///
/// One handle serves every caller. An open scope holds the backend
/// exclusively, so the thread owning it must not call the backend directly.
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Executes one write outside any scope; returns affected rows.
    fn execute(&self, operation: &Operation, values: &[FieldValue]) -> RepoResult<usize>;

    /// Opens the scope a batch runs in.
    fn begin(&self) -> RepoResult<Box<dyn TransactionScope + '_>>;

    /// Returns every row in the operation's default order.
    fn scan_all(&self, operation: &Operation) -> RepoResult<Vec<Row>>;

    fn scan_by_id(&self, operation: &Operation, id: &FieldValue) -> RepoResult<Option<Row>>;

    /// Returns rows whose filtered column equals `value`, in default order.
    fn scan_by_field(&self, operation: &Operation, value: &FieldValue) -> RepoResult<Vec<Row>>;
}

/// Atomic unit of a bulk operation.
///
/// Owned by exactly one bulk call; never nested or shared across threads.
pub trait TransactionScope {
    /// Executes one write inside the scope; returns affected rows.
    fn execute(&mut self, operation: &Operation, values: &[FieldValue]) -> RepoResult<usize>;

    /// Terminal step. A failure here leaves the outcome unknown; no rollback
    /// is possible afterwards.
    fn commit(self: Box<Self>) -> Result<(), DbError>;

    fn rollback(self: Box<Self>) -> Result<(), DbError>;
}

pub(crate) fn check_arity(operation: &Operation, values: &[FieldValue]) -> RepoResult<()> {
    let expected = operation.bind_columns().len();
    if values.len() != expected {
        return Err(RepoError::InvalidDescriptor {
            collection: operation.collection(),
            reason: format!(
                "{} expects {expected} values, got {}",
                operation.kind().as_str(),
                values.len()
            ),
        });
    }
    Ok(())
}
