#![allow(dead_code)]

use feedstore_core::backend::{Row, TransactionScope};
use feedstore_core::db::DbError;
use feedstore_core::statement::Operation;
use feedstore_core::{
    Backend, BackendKind, DocumentBackend, Feed, FeedRepository, FieldValue, Item, ItemRepository,
    RepoError, RepoResult, SqliteBackend,
};
use std::io;

/// One fresh in-memory store per backend kind.
pub fn backends() -> Vec<(&'static str, Box<dyn Backend>)> {
    vec![
        ("sqlite", Box::new(SqliteBackend::open_in_memory().unwrap())),
        ("document", Box::new(DocumentBackend::in_memory())),
    ]
}

pub fn seed_feed(backend: &dyn Backend, name: &str) -> Feed {
    let feed = Feed::new(name, format!("https://{}.example.com/rss", name.to_lowercase()));
    FeedRepository::new(backend).create(&feed).unwrap();
    feed
}

pub fn seed_item(backend: &dyn Backend, feed: &Feed, title: &str) -> Item {
    let item = Item::new(feed.id, title);
    ItemRepository::new(backend).create(&item).unwrap();
    item
}

/// Document store whose scopes fail on demand.
pub struct FaultyBackend {
    inner: DocumentBackend,
    fail_commit: bool,
    fail_writes_to: Option<&'static str>,
}

impl FaultyBackend {
    /// Every commit fails after the writes are staged.
    pub fn failing_commit() -> Self {
        Self {
            inner: DocumentBackend::in_memory(),
            fail_commit: true,
            fail_writes_to: None,
        }
    }

    /// Scoped writes to `collection` fail; direct writes succeed.
    pub fn failing_scoped_writes_to(collection: &'static str) -> Self {
        Self {
            inner: DocumentBackend::in_memory(),
            fail_commit: false,
            fail_writes_to: Some(collection),
        }
    }
}

struct FaultyScope<'a> {
    inner: Box<dyn TransactionScope + 'a>,
    fail_commit: bool,
    fail_writes_to: Option<&'static str>,
}

fn connection_lost() -> DbError {
    DbError::Io(io::Error::new(
        io::ErrorKind::ConnectionReset,
        "connection lost",
    ))
}

impl Backend for FaultyBackend {
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    fn execute(&self, operation: &Operation, values: &[FieldValue]) -> RepoResult<usize> {
        self.inner.execute(operation, values)
    }

    fn begin(&self) -> RepoResult<Box<dyn TransactionScope + '_>> {
        Ok(Box::new(FaultyScope {
            inner: self.inner.begin()?,
            fail_commit: self.fail_commit,
            fail_writes_to: self.fail_writes_to,
        }))
    }

    fn scan_all(&self, operation: &Operation) -> RepoResult<Vec<Row>> {
        self.inner.scan_all(operation)
    }

    fn scan_by_id(&self, operation: &Operation, id: &FieldValue) -> RepoResult<Option<Row>> {
        self.inner.scan_by_id(operation, id)
    }

    fn scan_by_field(&self, operation: &Operation, value: &FieldValue) -> RepoResult<Vec<Row>> {
        self.inner.scan_by_field(operation, value)
    }
}

impl TransactionScope for FaultyScope<'_> {
    fn execute(&mut self, operation: &Operation, values: &[FieldValue]) -> RepoResult<usize> {
        if self.fail_writes_to == Some(operation.collection()) {
            return Err(RepoError::Transport(connection_lost()));
        }
        self.inner.execute(operation, values)
    }

    fn commit(self: Box<Self>) -> Result<(), DbError> {
        let FaultyScope {
            inner, fail_commit, ..
        } = *self;
        if fail_commit {
            inner.rollback()?;
            return Err(connection_lost());
        }
        inner.commit()
    }

    fn rollback(self: Box<Self>) -> Result<(), DbError> {
        let FaultyScope { inner, .. } = *self;
        inner.rollback()
    }
}
