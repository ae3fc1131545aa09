//! Statement builder: turns (descriptor, operation kind) into an operation.
//!
//! # Responsibility
//! - Produce the engine-neutral [`Operation`] every backend executes.
//! - Render operations to parameterized SQL for the relational backend.
//!
//! # Invariants
//! - Pure and stateless; no I/O.
//! - Only column names taken from a static descriptor are embedded in SQL.
//!   Caller-supplied field names are resolved against the descriptor first
//!   and rejected with `InvalidField` when unknown.
//! - The primary key never appears in an update's `SET` list.

use crate::model::record::EntityDescriptor;
use crate::model::value::{Column, ColumnKind, FieldValue};
use crate::repo::{RepoError, RepoResult};

/// Logical operation requested by a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Read,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Row selection of a read or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Every row; reads are ordered by the descriptor's `order_by`.
    All,
    PrimaryKey,
    /// Single `column = value` equality.
    Field(&'static Column),
}

/// Executable operation descriptor shared by all backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    descriptor: &'static EntityDescriptor,
    kind: OperationKind,
    predicate: Predicate,
}

/// Builds the default operation of `kind` for `descriptor`.
///
/// Reads select every row, updates and deletes target the primary key.
pub fn build(descriptor: &'static EntityDescriptor, kind: OperationKind) -> RepoResult<Operation> {
    validate_descriptor(descriptor)?;
    let predicate = match kind {
        OperationKind::Create | OperationKind::Read => Predicate::All,
        OperationKind::Update | OperationKind::Delete => Predicate::PrimaryKey,
    };
    Ok(Operation {
        descriptor,
        kind,
        predicate,
    })
}

fn validate_descriptor(descriptor: &'static EntityDescriptor) -> RepoResult<()> {
    let invalid = |reason: &str| RepoError::InvalidDescriptor {
        collection: descriptor.collection,
        reason: reason.to_string(),
    };

    let primary_key = descriptor
        .primary_key()
        .ok_or_else(|| invalid("column list is empty"))?;
    if primary_key.kind != ColumnKind::Id {
        return Err(invalid("first column must be the id primary key"));
    }
    if descriptor
        .order_by
        .iter()
        .any(|name| descriptor.column(name).is_none())
    {
        return Err(invalid("order_by names an unknown column"));
    }
    Ok(())
}

impl Operation {
    /// Narrows a read to the primary key.
    pub fn by_id(mut self) -> RepoResult<Self> {
        if self.kind != OperationKind::Read {
            return Err(self.invalid("by-id selection applies to reads"));
        }
        self.predicate = Predicate::PrimaryKey;
        Ok(self)
    }

    /// Narrows a read or delete to `field = value`.
    ///
    /// # Errors
    /// - `InvalidField` when `field` is not a descriptor column.
    /// - `InvalidFilterValue` when `value` does not fit the column kind.
    pub fn filtered(mut self, field: &str, value: &FieldValue) -> RepoResult<Self> {
        if !matches!(self.kind, OperationKind::Read | OperationKind::Delete) {
            return Err(self.invalid("field filters apply to reads and deletes"));
        }
        let column = self
            .descriptor
            .column(field)
            .ok_or_else(|| RepoError::InvalidField {
                collection: self.descriptor.collection,
                field: field.to_string(),
            })?;
        if !value.fits(column.kind) {
            return Err(RepoError::InvalidFilterValue {
                collection: self.descriptor.collection,
                field: column.name,
                expected: column.kind,
            });
        }
        self.predicate = Predicate::Field(column);
        Ok(self)
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.descriptor
    }

    pub fn collection(&self) -> &'static str {
        self.descriptor.collection
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn predicate(&self) -> Predicate {
        self.predicate
    }

    /// Columns whose values must be bound, in binding order.
    pub fn bind_columns(&self) -> Vec<&'static Column> {
        match (self.kind, self.predicate) {
            (OperationKind::Create | OperationKind::Update, _) => {
                self.descriptor.columns.iter().collect()
            }
            (_, Predicate::All) => Vec::new(),
            (_, Predicate::PrimaryKey) => self.descriptor.primary_key().into_iter().collect(),
            (_, Predicate::Field(column)) => vec![column],
        }
    }

    /// Renders the operation as SQL with `:column` named placeholders.
    pub fn to_sql(&self) -> String {
        let table = self.descriptor.collection;
        let columns = self.descriptor.column_names().collect::<Vec<_>>();
        let primary_key = self.primary_key_name();

        match self.kind {
            OperationKind::Create => {
                let placeholders = columns
                    .iter()
                    .map(|name| format!(":{name}"))
                    .collect::<Vec<_>>();
                format!(
                    "INSERT INTO {table} ({}) VALUES ({})",
                    columns.join(", "),
                    placeholders.join(", ")
                )
            }
            OperationKind::Update => {
                let assignments = columns
                    .iter()
                    .filter(|name| **name != primary_key)
                    .map(|name| format!("{name} = :{name}"))
                    .collect::<Vec<_>>();
                format!(
                    "UPDATE {table} SET {} WHERE {primary_key} = :{primary_key}",
                    assignments.join(", ")
                )
            }
            OperationKind::Read => {
                let mut sql = format!("SELECT {} FROM {table}", columns.join(", "));
                sql.push_str(&self.where_clause());
                if self.predicate != Predicate::PrimaryKey {
                    let order = self
                        .descriptor
                        .order_by
                        .iter()
                        .map(|name| format!("{name} ASC"))
                        .collect::<Vec<_>>();
                    sql.push_str(&format!(" ORDER BY {}", order.join(", ")));
                }
                sql
            }
            OperationKind::Delete => format!("DELETE FROM {table}{}", self.where_clause()),
        }
    }

    fn where_clause(&self) -> String {
        match self.predicate {
            Predicate::All => String::new(),
            Predicate::PrimaryKey => {
                let primary_key = self.primary_key_name();
                format!(" WHERE {primary_key} = :{primary_key}")
            }
            Predicate::Field(column) => format!(" WHERE {0} = :{0}", column.name),
        }
    }

    fn primary_key_name(&self) -> &'static str {
        self.descriptor
            .primary_key()
            .map_or("id", |column| column.name)
    }

    fn invalid(&self, reason: &str) -> RepoError {
        RepoError::InvalidDescriptor {
            collection: self.descriptor.collection,
            reason: reason.to_string(),
        }
    }
}
