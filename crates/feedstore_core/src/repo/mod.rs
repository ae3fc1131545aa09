//! Repository layer: one generic CRUD contract for every record type.
//!
//! # Responsibility
//! - Turn record-level calls into statement-builder operations.
//! - Own bulk semantics: one transaction scope per call, all-or-nothing.
//! - Map backend rows back into typed records.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `InvalidField`) in
//!   addition to transport errors.
//! - Dynamic field names never reach a backend before they are resolved
//!   against the record's descriptor.
//! - A failed commit is reported as `PartialCommitUnknown` and never followed
//!   by a rollback.

mod error;
pub mod repository;

pub use error::{RepoError, RepoResult};
pub use repository::{
    EntityRepository, FeedRepository, ItemRepository, MetaDataRepository, Repository,
};
