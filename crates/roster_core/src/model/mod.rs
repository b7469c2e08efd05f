//! Domain model for persisted user records.
//!
//! # Responsibility
//! - Define the canonical record shape shared by storage and callers.
//! - Express partial create/update/filter intent through explicit
//!   field presence (`Option`), never through zero-value sentinels.
//!
//! # Invariants
//! - Every record is identified by a storage-assigned integer key.
//! - Payload structs carry only caller intent; authoritative state
//!   always comes back from storage.

pub mod user;
