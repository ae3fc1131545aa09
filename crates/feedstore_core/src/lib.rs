//! Persistence core for feed sources, items and item annotations.
//! This crate is the single source of truth for storage invariants.

pub mod backend;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod statement;

pub use backend::{
    open_backend, Backend, BackendKind, DocumentBackend, SqliteBackend, TransactionScope,
};
pub use config::{ConfigError, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::entity::Entity;
pub use model::feed::Feed;
pub use model::item::Item;
pub use model::metadata::MetaData;
pub use model::record::{EntityDescriptor, Record};
pub use model::value::FieldValue;
pub use model::RecordId;
pub use repo::{
    EntityRepository, FeedRepository, ItemRepository, MetaDataRepository, RepoError, RepoResult,
    Repository,
};
pub use service::feed_service::{FeedService, PurgeSummary};
pub use statement::{Operation, OperationKind};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
