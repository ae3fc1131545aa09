//! Use-case services over the repository layer.
//!
//! # Responsibility
//! - Bundle the per-record repositories over one injected backend.
//! - Compose multi-collection reads (items with their children).
//!
//! # Invariants
//! - Services never bypass repository contracts.
//! - Services stay storage-agnostic.

pub mod feed_service;
