//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the record-store contract for user persistence.
//! - Isolate SQLite statement assembly behind the field-set builder.
//!
//! # Invariants
//! - Every mutation statement carries the minimal necessary column set.
//! - Repository APIs return semantic errors (`Conflict`, `NotFound`,
//!   `InvalidRequest`) in addition to DB transport errors.

pub mod fields;
pub mod user_repo;
