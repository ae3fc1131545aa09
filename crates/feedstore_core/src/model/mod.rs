//! Feed/item domain model and the record contract shared by every backend.
//!
//! # Responsibility
//! - Define the four persisted record shapes (feed, item, metadata, entity).
//! - Describe each record's collection layout through a static descriptor.
//! - Provide the backend-neutral value type rows are exchanged in.
//!
//! # Invariants
//! - Every record is identified by a stable `RecordId` that never changes.
//! - Descriptor column lists start with the primary key.
//! - Rows are ordered exactly like their descriptor's columns.

pub mod entity;
pub mod feed;
pub mod item;
pub mod metadata;
pub mod record;
pub mod value;

/// Stable identifier of every persisted record.
pub type RecordId = uuid::Uuid;
