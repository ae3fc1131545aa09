use crate::db::DbError;
use crate::model::value::ColumnKind;
use crate::model::RecordId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for every feed/item persistence operation.
#[derive(Debug)]
pub enum RepoError {
    /// Lookup, update or delete by id matched no record.
    NotFound {
        collection: &'static str,
        id: RecordId,
    },
    /// Dynamic filter named a column the collection does not have.
    InvalidField {
        collection: &'static str,
        field: String,
    },
    /// Dynamic filter value does not match the column kind.
    InvalidFilterValue {
        collection: &'static str,
        field: &'static str,
        expected: ColumnKind,
    },
    /// Duplicate key or dangling reference.
    ConstraintViolation {
        collection: &'static str,
        message: String,
    },
    /// Engine or IO failure. Never retried by this layer.
    Transport(DbError),
    /// Commit was attempted and failed; the batch may or may not be visible.
    /// Callers must re-read the affected records before acting.
    PartialCommitUnknown {
        collection: &'static str,
        source: DbError,
    },
    /// Persisted data cannot be mapped back to a record.
    InvalidData(String),
    /// Descriptor or operation shape rejected by the statement builder.
    InvalidDescriptor {
        collection: &'static str,
        reason: String,
    },
}

impl RepoError {
    /// Returns whether this error leaves storage in an unknown state.
    pub fn requires_reverification(&self) -> bool {
        matches!(self, Self::PartialCommitUnknown { .. })
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { collection, id } => write!(f, "{collection} record not found: {id}"),
            Self::InvalidField { collection, field } => {
                write!(f, "unknown field `{field}` for {collection}")
            }
            Self::InvalidFilterValue {
                collection,
                field,
                expected,
            } => write!(
                f,
                "filter value for {collection}.{field} must be a {expected} value"
            ),
            Self::ConstraintViolation {
                collection,
                message,
            } => write!(f, "constraint violation on {collection}: {message}"),
            Self::Transport(err) => write!(f, "{err}"),
            Self::PartialCommitUnknown { collection, source } => write!(
                f,
                "commit outcome unknown for {collection} batch, re-verify state: {source}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::InvalidDescriptor { collection, reason } => {
                write!(f, "invalid operation on {collection}: {reason}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::PartialCommitUnknown { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Transport(value)
    }
}
