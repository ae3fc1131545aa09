//! Entity descriptors and the record mapping contract.
//!
//! # Responsibility
//! - Describe one collection: name, ordered typed columns, default order and
//!   optional owner reference.
//! - Map records to and from backend-neutral rows.
//!
//! # Invariants
//! - `columns[0]` is the primary key and has kind `ColumnKind::Id`.
//! - `order_by` ends with the primary key so full scans are totally ordered.

use crate::model::value::{parse_timestamp, Column, ColumnKind, FieldValue};
use crate::model::RecordId;
use crate::repo::{RepoError, RepoResult};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Static layout of one persisted collection.
#[derive(Debug, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Table (relational) or collection (document) name.
    pub collection: &'static str,
    /// Ordered columns, primary key first.
    pub columns: &'static [Column],
    /// Columns used to order unfiltered scans, ascending.
    pub order_by: &'static [&'static str],
    /// Column referencing the owning record, when the record has an owner.
    pub owner_column: Option<&'static str>,
}

impl EntityDescriptor {
    pub fn primary_key(&self) -> Option<&'static Column> {
        self.columns.first()
    }

    /// Looks up a known column by exact name.
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> {
        self.columns.iter().map(|column| column.name)
    }
}

/// A record type persisted through the generic repository.
pub trait Record: Sized {
    /// Collection layout shared by every backend.
    const DESCRIPTOR: &'static EntityDescriptor;

    /// Primary key value.
    fn id(&self) -> RecordId;

    /// Values for every descriptor column, in column order.
    fn to_row(&self) -> Vec<FieldValue>;

    /// Rebuilds a record from a row produced by a backend scan.
    fn from_row(row: RowReader<'_>) -> RepoResult<Self>;
}

/// Typed, name-addressed access to one scanned row.
pub struct RowReader<'a> {
    descriptor: &'static EntityDescriptor,
    values: &'a [FieldValue],
}

impl<'a> RowReader<'a> {
    pub fn new(descriptor: &'static EntityDescriptor, values: &'a [FieldValue]) -> RepoResult<Self> {
        if values.len() != descriptor.columns.len() {
            return Err(RepoError::InvalidData(format!(
                "row for `{}` has {} values, expected {}",
                descriptor.collection,
                values.len(),
                descriptor.columns.len()
            )));
        }
        Ok(Self { descriptor, values })
    }

    fn value(&self, column: &str) -> RepoResult<&'a FieldValue> {
        self.descriptor
            .column_index(column)
            .map(|index| &self.values[index])
            .ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "unknown column `{}.{column}`",
                    self.descriptor.collection
                ))
            })
    }

    fn mismatch(&self, column: &str, expected: ColumnKind) -> RepoError {
        RepoError::InvalidData(format!(
            "column `{}.{column}` does not hold a {expected} value",
            self.descriptor.collection
        ))
    }

    pub fn id(&self, column: &str) -> RepoResult<RecordId> {
        match self.value(column)? {
            FieldValue::Text(text) => Uuid::parse_str(text).map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid uuid value `{text}` in {}.{column}",
                    self.descriptor.collection
                ))
            }),
            _ => Err(self.mismatch(column, ColumnKind::Id)),
        }
    }

    pub fn text(&self, column: &str) -> RepoResult<String> {
        match self.value(column)? {
            FieldValue::Text(text) => Ok(text.clone()),
            _ => Err(self.mismatch(column, ColumnKind::Text)),
        }
    }

    pub fn integer(&self, column: &str) -> RepoResult<i64> {
        match self.value(column)? {
            FieldValue::Integer(value) => Ok(*value),
            _ => Err(self.mismatch(column, ColumnKind::Integer)),
        }
    }

    pub fn flag(&self, column: &str) -> RepoResult<bool> {
        match self.value(column)? {
            FieldValue::Bool(value) => Ok(*value),
            _ => Err(self.mismatch(column, ColumnKind::Bool)),
        }
    }

    pub fn blob(&self, column: &str) -> RepoResult<Vec<u8>> {
        match self.value(column)? {
            FieldValue::Blob(bytes) => Ok(bytes.clone()),
            _ => Err(self.mismatch(column, ColumnKind::Blob)),
        }
    }

    pub fn timestamp(&self, column: &str) -> RepoResult<DateTime<Utc>> {
        match self.value(column)? {
            FieldValue::Timestamp(value) => Ok(*value),
            FieldValue::Text(text) => {
                parse_timestamp(text).ok_or_else(|| self.mismatch(column, ColumnKind::Timestamp))
            }
            _ => Err(self.mismatch(column, ColumnKind::Timestamp)),
        }
    }
}
