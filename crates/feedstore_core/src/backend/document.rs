//! Document backend: schemaless JSON collections keyed by native `_id`.
//!
//! # Responsibility
//! - Store each record as one JSON document in its named collection.
//! - Emulate atomic batches with a two-phase staged write.
//! - Optionally mirror the whole store to a JSON snapshot file.
//!
//! # Invariants
//! - The primary key column is stored as `_id`; every other column under its
//!   own name.
//! - Reference columns are never checked; callers keep parents in place.
//! - A batch stages writes on copies of the touched collections while holding
//!   the store lock. Nothing is visible to readers before publish.
//! - Deletes remove exactly the matched documents, never a whole collection.
//! - A single write whose snapshot cannot be written is undone in memory.
//! - While a scope is open the same thread must not call the backend directly.

use crate::backend::{check_arity, Backend, BackendKind, Row, TransactionScope};
use crate::db::DbError;
use crate::model::record::EntityDescriptor;
use crate::model::value::{format_timestamp, parse_timestamp, Column, ColumnKind, FieldValue};
use crate::repo::{RepoError, RepoResult};
use crate::statement::{Operation, OperationKind, Predicate};
use log::{error, info};
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

const ID_KEY: &str = "_id";

type Document = Map<String, Value>;
type Collection = BTreeMap<String, Document>;
type Collections = BTreeMap<String, Collection>;

/// Embedded document store.
pub struct DocumentBackend {
    collections: Mutex<Collections>,
    snapshot_path: Option<PathBuf>,
}

impl Default for DocumentBackend {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl DocumentBackend {
    /// Creates an empty store that lives only as long as this value.
    pub fn in_memory() -> Self {
        Self {
            collections: Mutex::new(Collections::new()),
            snapshot_path: None,
        }
    }

    /// Opens a snapshot-backed store, loading `path` when it exists.
    ///
    /// # Side effects
    /// - Every successful write rewrites the snapshot file.
    /// - Emits `doc_open` logging events with duration and status.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        let started_at = Instant::now();
        let path = path.as_ref().to_path_buf();
        info!("event=doc_open module=backend status=start mode=file");

        let loaded = match load_snapshot(&path) {
            Ok(collections) => collections,
            Err(err) => {
                error!(
                    "event=doc_open module=backend status=error mode=file duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };

        info!(
            "event=doc_open module=backend status=ok mode=file collections={} duration_ms={}",
            loaded.len(),
            started_at.elapsed().as_millis()
        );
        Ok(Self {
            collections: Mutex::new(loaded),
            snapshot_path: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Number of documents currently published in `collection`.
    pub fn document_count(&self, collection: &str) -> RepoResult<usize> {
        let collections = self.lock()?;
        Ok(collections.get(collection).map_or(0, BTreeMap::len))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, DbError> {
        self.collections.lock().map_err(|_| DbError::LockPoisoned)
    }

    fn persist(&self, collections: &Collections) -> Result<(), DbError> {
        let Some(path) = self.snapshot_path.as_ref() else {
            return Ok(());
        };
        let bytes = serde_json::to_vec(collections)?;
        let staging = path.with_extension("tmp");
        std::fs::write(&staging, bytes)?;
        std::fs::rename(&staging, path)?;
        Ok(())
    }

    fn scan(&self, operation: &Operation, value: Option<&FieldValue>) -> RepoResult<Vec<Row>> {
        let descriptor = operation.descriptor();
        let collections = self.lock()?;
        let Some(collection) = collections.get(operation.collection()) else {
            return Ok(Vec::new());
        };

        let mut rows = Vec::new();
        match (operation.predicate(), value) {
            (Predicate::All, _) => {
                for document in collection.values() {
                    rows.push(from_document(descriptor, document)?);
                }
            }
            (Predicate::PrimaryKey, Some(id)) => {
                if let Some(document) = collection.get(&key_text(operation, id)?) {
                    rows.push(from_document(descriptor, document)?);
                }
            }
            (Predicate::Field(column), Some(expected)) => {
                let index = field_index(descriptor, column)?;
                for document in collection.values() {
                    let row = from_document(descriptor, document)?;
                    if row[index] == *expected {
                        rows.push(row);
                    }
                }
            }
            (_, None) => {
                return Err(RepoError::InvalidDescriptor {
                    collection: descriptor.collection,
                    reason: "filtered scan needs a value".to_string(),
                });
            }
        }

        sort_rows(descriptor, &mut rows);
        Ok(rows)
    }
}

impl Backend for DocumentBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Document
    }

    fn execute(&self, operation: &Operation, values: &[FieldValue]) -> RepoResult<usize> {
        let mut collections = self.lock()?;
        let name = operation.collection();
        let previous = collections.get(name).cloned();
        let changed = apply_write(&mut collections, operation, values)?;
        if changed == 0 {
            return Ok(changed);
        }

        if let Err(err) = self.persist(&collections) {
            // The write never becomes visible when the snapshot cannot hold it.
            match previous {
                Some(collection) => collections.insert(name.to_string(), collection),
                None => collections.remove(name),
            };
            return Err(err.into());
        }
        Ok(changed)
    }

    fn begin(&self) -> RepoResult<Box<dyn TransactionScope + '_>> {
        let guard = self.lock()?;
        Ok(Box::new(DocumentScope {
            backend: self,
            published: guard,
            staged: Collections::new(),
        }))
    }

    fn scan_all(&self, operation: &Operation) -> RepoResult<Vec<Row>> {
        self.scan(operation, None)
    }

    fn scan_by_id(&self, operation: &Operation, id: &FieldValue) -> RepoResult<Option<Row>> {
        if operation.predicate() != Predicate::PrimaryKey {
            return Err(RepoError::InvalidDescriptor {
                collection: operation.collection(),
                reason: "scan_by_id requires a by-id read".to_string(),
            });
        }
        Ok(self.scan(operation, Some(id))?.into_iter().next())
    }

    fn scan_by_field(&self, operation: &Operation, value: &FieldValue) -> RepoResult<Vec<Row>> {
        if !matches!(operation.predicate(), Predicate::Field(_)) {
            return Err(RepoError::InvalidDescriptor {
                collection: operation.collection(),
                reason: "scan_by_field requires a filtered read".to_string(),
            });
        }
        self.scan(operation, Some(value))
    }
}

/// Staged batch. Phase one writes into `staged`; phase two publishes.
struct DocumentScope<'s> {
    backend: &'s DocumentBackend,
    published: MutexGuard<'s, Collections>,
    staged: Collections,
}

impl TransactionScope for DocumentScope<'_> {
    fn execute(&mut self, operation: &Operation, values: &[FieldValue]) -> RepoResult<usize> {
        let name = operation.collection();
        if !self.staged.contains_key(name) {
            let current = self.published.get(name).cloned().unwrap_or_default();
            self.staged.insert(name.to_string(), current);
        }
        apply_write(&mut self.staged, operation, values)
    }

    fn commit(self: Box<Self>) -> Result<(), DbError> {
        let DocumentScope {
            backend,
            mut published,
            staged,
        } = *self;
        for (name, collection) in staged {
            published.insert(name, collection);
        }
        // Published in memory at this point; a snapshot failure leaves disk behind.
        backend.persist(&published)
    }

    fn rollback(self: Box<Self>) -> Result<(), DbError> {
        Ok(())
    }
}

fn apply_write(
    collections: &mut Collections,
    operation: &Operation,
    values: &[FieldValue],
) -> RepoResult<usize> {
    check_arity(operation, values)?;
    let descriptor = operation.descriptor();
    let collection = collections
        .entry(descriptor.collection.to_string())
        .or_default();

    match operation.kind() {
        OperationKind::Create => {
            let id = key_text(operation, &values[0])?;
            if collection.contains_key(&id) {
                return Err(RepoError::ConstraintViolation {
                    collection: descriptor.collection,
                    message: format!("duplicate key `{id}`"),
                });
            }
            let document = to_document(descriptor, values)?;
            collection.insert(id, document);
            Ok(1)
        }
        OperationKind::Update => {
            let id = key_text(operation, &values[0])?;
            let document = to_document(descriptor, values)?;
            match collection.get_mut(&id) {
                Some(existing) => {
                    *existing = document;
                    Ok(1)
                }
                None => Ok(0),
            }
        }
        OperationKind::Delete => match operation.predicate() {
            Predicate::PrimaryKey => {
                let id = key_text(operation, &values[0])?;
                Ok(usize::from(collection.remove(&id).is_some()))
            }
            Predicate::Field(column) => {
                let index = field_index(descriptor, column)?;
                let mut doomed = Vec::new();
                for (id, document) in collection.iter() {
                    if from_document(descriptor, document)?[index] == values[0] {
                        doomed.push(id.clone());
                    }
                }
                for id in &doomed {
                    collection.remove(id);
                }
                Ok(doomed.len())
            }
            Predicate::All => Err(RepoError::InvalidDescriptor {
                collection: descriptor.collection,
                reason: "unfiltered delete is not supported".to_string(),
            }),
        },
        OperationKind::Read => Err(RepoError::InvalidDescriptor {
            collection: descriptor.collection,
            reason: "reads cannot be executed as writes".to_string(),
        }),
    }
}

fn load_snapshot(path: &Path) -> Result<Collections, DbError> {
    if !path.exists() {
        return Ok(Collections::new());
    }
    let bytes = std::fs::read(path)?;
    if bytes.is_empty() {
        return Ok(Collections::new());
    }
    Ok(serde_json::from_slice(&bytes)?)
}

fn key_text(operation: &Operation, value: &FieldValue) -> RepoResult<String> {
    match value {
        FieldValue::Text(text) => Ok(text.clone()),
        _ => Err(RepoError::InvalidData(format!(
            "{} key must be text",
            operation.collection()
        ))),
    }
}

fn field_index(descriptor: &EntityDescriptor, column: &Column) -> RepoResult<usize> {
    descriptor.column_index(column.name).ok_or_else(|| RepoError::InvalidField {
        collection: descriptor.collection,
        field: column.name.to_string(),
    })
}

fn document_key(index: usize, column: &Column) -> &'static str {
    if index == 0 {
        ID_KEY
    } else {
        column.name
    }
}

fn to_document(descriptor: &EntityDescriptor, values: &[FieldValue]) -> RepoResult<Document> {
    let mut document = Document::new();
    for (index, (column, value)) in descriptor.columns.iter().zip(values).enumerate() {
        if !value.fits(column.kind) {
            return Err(RepoError::InvalidData(format!(
                "value for {}.{} is not a {} value",
                descriptor.collection, column.name, column.kind
            )));
        }
        let json = match value {
            FieldValue::Text(text) => Value::String(text.clone()),
            FieldValue::Integer(number) => Value::Number(Number::from(*number)),
            FieldValue::Bool(flag) => Value::Bool(*flag),
            FieldValue::Blob(bytes) => {
                Value::Array(bytes.iter().map(|byte| Value::from(*byte)).collect())
            }
            FieldValue::Timestamp(at) => Value::String(format_timestamp(at)),
        };
        document.insert(document_key(index, column).to_string(), json);
    }
    Ok(document)
}

fn from_document(descriptor: &EntityDescriptor, document: &Document) -> RepoResult<Row> {
    let mut row = Vec::with_capacity(descriptor.columns.len());
    for (index, column) in descriptor.columns.iter().enumerate() {
        let key = document_key(index, column);
        let invalid = || {
            RepoError::InvalidData(format!(
                "document field `{key}` in {} is missing or not a {} value",
                descriptor.collection, column.kind
            ))
        };
        let json = document.get(key).ok_or_else(invalid)?;
        let value = match (column.kind, json) {
            (ColumnKind::Id | ColumnKind::Text, Value::String(text)) => {
                FieldValue::Text(text.clone())
            }
            (ColumnKind::Integer, Value::Number(number)) => {
                FieldValue::Integer(number.as_i64().ok_or_else(invalid)?)
            }
            (ColumnKind::Bool, Value::Bool(flag)) => FieldValue::Bool(*flag),
            (ColumnKind::Blob, Value::Array(items)) => FieldValue::Blob(
                items
                    .iter()
                    .map(|item| {
                        item.as_u64()
                            .and_then(|byte| u8::try_from(byte).ok())
                            .ok_or_else(invalid)
                    })
                    .collect::<RepoResult<Vec<u8>>>()?,
            ),
            (ColumnKind::Timestamp, Value::String(text)) => {
                FieldValue::Timestamp(parse_timestamp(text).ok_or_else(invalid)?)
            }
            _ => return Err(invalid()),
        };
        row.push(value);
    }
    Ok(row)
}

fn sort_rows(descriptor: &EntityDescriptor, rows: &mut [Row]) {
    let indices = descriptor
        .order_by
        .iter()
        .filter_map(|name| descriptor.column_index(name))
        .collect::<Vec<_>>();
    rows.sort_by(|left, right| {
        indices
            .iter()
            .map(|&index| left[index].compare(&right[index]))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::{from_document, to_document, ID_KEY};
    use crate::model::entity::ENTITY_DESCRIPTOR;
    use crate::model::value::FieldValue;

    #[test]
    fn primary_key_is_stored_under_native_id() {
        let values = vec![
            FieldValue::from("a1"),
            FieldValue::from("PERSON"),
            FieldValue::from("Ada"),
            FieldValue::Integer(3),
            FieldValue::Integer(6),
            FieldValue::from("i1"),
        ];
        let document = to_document(&ENTITY_DESCRIPTOR, &values).unwrap();
        assert_eq!(document[ID_KEY], "a1");
        assert!(document.get("id").is_none());
        assert_eq!(from_document(&ENTITY_DESCRIPTOR, &document).unwrap(), values);
    }

    #[test]
    fn missing_fields_are_invalid_data() {
        let mut document = serde_json::Map::new();
        document.insert(ID_KEY.to_string(), "a1".into());
        assert!(from_document(&ENTITY_DESCRIPTOR, &document).is_err());
    }
}
