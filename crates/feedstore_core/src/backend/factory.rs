//! Backend construction from configuration.

use crate::backend::{Backend, BackendKind, DocumentBackend, SqliteBackend};
use crate::config::StoreConfig;
use crate::repo::RepoResult;
use log::info;

/// Opens the backend selected by `config`.
///
/// Without a `path` the sqlite backend runs in memory and the document
/// backend keeps no snapshot. The returned handle is owned by the caller and
/// passed into repositories explicitly.
pub fn open_backend(config: &StoreConfig) -> RepoResult<Box<dyn Backend>> {
    let backend: Box<dyn Backend> = match (config.backend, config.path.as_ref()) {
        (BackendKind::Sqlite, Some(path)) => Box::new(SqliteBackend::open(path)?),
        (BackendKind::Sqlite, None) => Box::new(SqliteBackend::open_in_memory()?),
        (BackendKind::Document, Some(path)) => Box::new(DocumentBackend::open(path)?),
        (BackendKind::Document, None) => Box::new(DocumentBackend::in_memory()),
    };
    info!(
        "event=backend_open module=backend status=ok backend={} persistent={}",
        backend.kind(),
        config.path.is_some()
    );
    Ok(backend)
}
