//! Generic repository over any `Record` and any `Backend`.

use crate::backend::{Backend, Row, TransactionScope};
use crate::model::entity::Entity;
use crate::model::feed::Feed;
use crate::model::item::Item;
use crate::model::metadata::MetaData;
use crate::model::record::{Record, RowReader};
use crate::model::value::FieldValue;
use crate::model::RecordId;
use crate::repo::{RepoError, RepoResult};
use crate::statement::{self, Operation, OperationKind};
use log::{debug, error, warn};
use std::marker::PhantomData;
use std::time::Instant;

pub type FeedRepository<'b> = Repository<'b, Feed>;
pub type ItemRepository<'b> = Repository<'b, Item>;
pub type MetaDataRepository<'b> = Repository<'b, MetaData>;
pub type EntityRepository<'b> = Repository<'b, Entity>;

/// CRUD and bulk-CRUD access to one collection.
///
/// Holds only a borrowed backend handle; cheap to construct per call site.
pub struct Repository<'b, R: Record> {
    backend: &'b dyn Backend,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Clone for Repository<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Record> Copy for Repository<'_, R> {}

impl<'b, R: Record> Repository<'b, R> {
    pub fn new(backend: &'b dyn Backend) -> Self {
        Self {
            backend,
            _record: PhantomData,
        }
    }

    fn collection(&self) -> &'static str {
        R::DESCRIPTOR.collection
    }

    /// Stores one record and returns its id.
    ///
    /// # Errors
    /// - `ConstraintViolation` on duplicate id or missing parent reference
    ///   (reference checks depend on the backend).
    pub fn create(&self, record: &R) -> RepoResult<RecordId> {
        let result = statement::build(R::DESCRIPTOR, OperationKind::Create)
            .and_then(|operation| self.backend.execute(&operation, &record.to_row()));
        self.observe("create", result)?;
        Ok(record.id())
    }

    /// Returns every record in the collection's default order.
    pub fn find(&self) -> RepoResult<Vec<R>> {
        let result = statement::build(R::DESCRIPTOR, OperationKind::Read)
            .and_then(|operation| self.backend.scan_all(&operation));
        let rows = self.observe("find", result)?;
        rows.iter().map(|row| read_record::<R>(row)).collect()
    }

    /// Returns the record with `id`, or `NotFound`.
    pub fn find_by_id(&self, id: RecordId) -> RepoResult<R> {
        let key = FieldValue::from(id);
        let result = statement::build(R::DESCRIPTOR, OperationKind::Read)
            .and_then(Operation::by_id)
            .and_then(|operation| self.backend.scan_by_id(&operation, &key));
        match self.observe("find_by_id", result)? {
            Some(row) => read_record::<R>(&row),
            None => Err(self.not_found(id)),
        }
    }

    /// Returns records whose `field` equals `value`, in default order.
    ///
    /// # Errors
    /// - `InvalidField` when `field` is not a column of this collection.
    /// - `InvalidFilterValue` when `value` does not fit the column kind.
    pub fn find_by(&self, field: &str, value: impl Into<FieldValue>) -> RepoResult<Vec<R>> {
        let value = value.into();
        let result = statement::build(R::DESCRIPTOR, OperationKind::Read)
            .and_then(|operation| operation.filtered(field, &value))
            .and_then(|operation| self.backend.scan_by_field(&operation, &value));
        let rows = self.observe("find_by", result)?;
        rows.iter().map(|row| read_record::<R>(row)).collect()
    }

    /// Returns records owned by `owner` (feed for items, item for children).
    pub fn find_by_owner(&self, owner: RecordId) -> RepoResult<Vec<R>> {
        let field = self.owner_column()?;
        self.find_by(field, owner)
    }

    /// Overwrites every non-key field of the stored record with `record.id`.
    pub fn update(&self, record: &R) -> RepoResult<()> {
        let result = statement::build(R::DESCRIPTOR, OperationKind::Update)
            .and_then(|operation| self.backend.execute(&operation, &record.to_row()));
        if self.observe("update", result)? == 0 {
            return Err(self.not_found(record.id()));
        }
        Ok(())
    }

    /// Removes the stored record with `record.id`.
    ///
    /// Deleting a record that does not exist is `NotFound`, not a silent
    /// success. Owned children are left in place; see [`Self::delete_by_owner`].
    pub fn delete(&self, record: &R) -> RepoResult<()> {
        let key = FieldValue::from(record.id());
        let result = statement::build(R::DESCRIPTOR, OperationKind::Delete)
            .and_then(|operation| self.backend.execute(&operation, std::slice::from_ref(&key)));
        if self.observe("delete", result)? == 0 {
            return Err(self.not_found(record.id()));
        }
        Ok(())
    }

    /// Removes exactly the records owned by `owner`; returns how many.
    ///
    /// Zero matches is a success.
    pub fn delete_by_owner(&self, owner: RecordId) -> RepoResult<usize> {
        let value = FieldValue::from(owner);
        let result = self.owner_delete(&value).and_then(|operation| {
            self.backend
                .execute(&operation, std::slice::from_ref(&value))
        });
        self.observe("delete_by_owner", result)
    }

    /// Same as [`Self::delete_by_owner`], staged inside a caller-owned scope.
    ///
    /// Nothing is visible until the caller commits the scope.
    pub fn delete_by_owner_in(
        &self,
        scope: &mut (dyn TransactionScope + '_),
        owner: RecordId,
    ) -> RepoResult<usize> {
        let value = FieldValue::from(owner);
        let result = self
            .owner_delete(&value)
            .and_then(|operation| scope.execute(&operation, std::slice::from_ref(&value)));
        self.observe("delete_by_owner", result)
    }

    /// Creates every record in one atomic batch.
    pub fn bulk_create(&self, records: &[R]) -> RepoResult<usize> {
        let rows = records.iter().map(|record| (record.id(), record.to_row()));
        self.run_batch("bulk_create", OperationKind::Create, rows.collect())
    }

    /// Updates every record in one atomic batch; any missing id aborts it.
    pub fn bulk_update(&self, records: &[R]) -> RepoResult<usize> {
        let rows = records.iter().map(|record| (record.id(), record.to_row()));
        self.run_batch("bulk_update", OperationKind::Update, rows.collect())
    }

    /// Deletes exactly the given records in one atomic batch; any missing id
    /// aborts it.
    pub fn bulk_delete(&self, records: &[R]) -> RepoResult<usize> {
        let rows = records
            .iter()
            .map(|record| (record.id(), vec![FieldValue::from(record.id())]));
        self.run_batch("bulk_delete", OperationKind::Delete, rows.collect())
    }

    fn run_batch(
        &self,
        event: &'static str,
        kind: OperationKind,
        rows: Vec<(RecordId, Row)>,
    ) -> RepoResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let started_at = Instant::now();
        let collection = self.collection();
        let operation = statement::build(R::DESCRIPTOR, kind)?;
        let mut scope = match self.backend.begin() {
            Ok(scope) => scope,
            Err(err) => return Err(self.fail(event, err)),
        };

        for (index, (id, values)) in rows.iter().enumerate() {
            let outcome = scope.execute(&operation, values).and_then(|changed| {
                if changed == 0 && kind != OperationKind::Create {
                    Err(self.not_found(*id))
                } else {
                    Ok(changed)
                }
            });

            if let Err(err) = outcome {
                error!(
                    "event={event} module=repo status=error collection={collection} row_index={index} rows={} error={}",
                    rows.len(),
                    err
                );
                if let Err(rollback_err) = scope.rollback() {
                    error!(
                        "event={event} module=repo status=error collection={collection} error_code=rollback_failed error={}",
                        rollback_err
                    );
                }
                return Err(err);
            }
        }

        if let Err(source) = scope.commit() {
            error!(
                "event={event} module=repo status=error collection={collection} rows={} duration_ms={} error_code=commit_unknown error={}",
                rows.len(),
                started_at.elapsed().as_millis(),
                source
            );
            return Err(RepoError::PartialCommitUnknown { collection, source });
        }

        debug!(
            "event={event} module=repo status=ok collection={collection} rows={} duration_ms={}",
            rows.len(),
            started_at.elapsed().as_millis()
        );
        Ok(rows.len())
    }

    fn owner_delete(&self, owner: &FieldValue) -> RepoResult<Operation> {
        let field = self.owner_column()?;
        statement::build(R::DESCRIPTOR, OperationKind::Delete)?.filtered(field, owner)
    }

    fn owner_column(&self) -> RepoResult<&'static str> {
        R::DESCRIPTOR
            .owner_column
            .ok_or_else(|| RepoError::InvalidField {
                collection: self.collection(),
                field: "owner".to_string(),
            })
    }

    fn not_found(&self, id: RecordId) -> RepoError {
        RepoError::NotFound {
            collection: self.collection(),
            id,
        }
    }

    fn observe<T>(&self, event: &'static str, result: RepoResult<T>) -> RepoResult<T> {
        match result {
            Ok(value) => {
                debug!(
                    "event={event} module=repo status=ok collection={}",
                    self.collection()
                );
                Ok(value)
            }
            Err(err) => Err(self.fail(event, err)),
        }
    }

    fn fail(&self, event: &'static str, err: RepoError) -> RepoError {
        let collection = self.collection();
        match &err {
            RepoError::Transport(_)
            | RepoError::PartialCommitUnknown { .. }
            | RepoError::InvalidData(_)
            | RepoError::InvalidDescriptor { .. } => {
                error!("event={event} module=repo status=error collection={collection} error={err}");
            }
            RepoError::ConstraintViolation { .. } => {
                warn!("event={event} module=repo status=error collection={collection} error={err}");
            }
            RepoError::NotFound { .. }
            | RepoError::InvalidField { .. }
            | RepoError::InvalidFilterValue { .. } => {
                debug!("event={event} module=repo status=error collection={collection} error={err}");
            }
        }
        err
    }
}

fn read_record<R: Record>(row: &[FieldValue]) -> RepoResult<R> {
    R::from_row(RowReader::new(R::DESCRIPTOR, row)?)
}
