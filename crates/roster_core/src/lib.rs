//! Core persistence logic for roster.
//! This crate is the single source of truth for record-store invariants.

pub mod cancel;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use cancel::CancelToken;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::user::{AccountStatus, NewUser, Role, UpdateUser, User, UserFilter, UserId};
pub use repo::fields::FieldSet;
pub use repo::user_repo::{
    ErrorKind, SqliteUserRepository, StoreError, StoreResult, UserRepository,
};
pub use service::user_service::{CompactionPolicy, UserService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
