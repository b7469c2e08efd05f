//! User record model and sparse mutation payloads.
//!
//! # Responsibility
//! - Define the fully-populated `User` record returned by storage.
//! - Define the sparse payloads (`NewUser`, `UpdateUser`, `UserFilter`)
//!   used to express partial create/update/filter intent.
//!
//! # Invariants
//! - `id` is immutable once assigned and is the sole identity key.
//! - A field is "provided" iff it is `Some`; `Some(0)` and `Some("")`
//!   are explicit values, not absence.

use serde::{Deserialize, Serialize};

/// Storage-assigned surrogate key for user records.
pub type UserId = i64;

/// Access role attached to every user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Instance owner, at most one per deployment by convention.
    Owner,
    /// Administrative account.
    Admin,
    /// Regular account.
    User,
}

/// Lifecycle status of a user record.
///
/// Archived is a user-set attribute, not a deletion marker; deletion is
/// a hard delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    /// Default, active state.
    Normal,
    /// Hidden from regular flows but fully retained.
    Archived,
}

/// Fully-populated user record as persisted.
///
/// Instances are only ever produced by decoding storage rows, so every
/// field reflects authoritative post-write state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub email: String,
    pub nickname: String,
    pub password_hash: String,
    /// Empty string means no avatar is set.
    pub avatar_url: String,
    pub status: AccountStatus,
    /// Creation time in epoch seconds.
    pub created_ts: i64,
    /// Last-update time in epoch seconds.
    pub updated_ts: i64,
}

/// Create payload: required identity fields plus optional overrides.
///
/// Absent optional fields take their storage defaults (`status`,
/// timestamps, auto-assigned `id`, empty `avatar_url`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub role: Role,
    pub email: String,
    pub nickname: String,
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub status: Option<AccountStatus>,
    pub created_ts: Option<i64>,
    pub updated_ts: Option<i64>,
    /// Explicit key, for import paths where identity already exists.
    pub id: Option<UserId>,
}

impl NewUser {
    /// Creates a payload with only the required fields set.
    pub fn new(
        username: impl Into<String>,
        role: Role,
        email: impl Into<String>,
        nickname: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            role,
            email: email.into(),
            nickname: nickname.into(),
            password_hash: password_hash.into(),
            avatar_url: None,
            status: None,
            created_ts: None,
            updated_ts: None,
            id: None,
        }
    }
}

/// Partial update payload for one user record.
///
/// Field declaration order is the order assignments appear in the
/// generated statement. Every provided field is applied, including
/// empty strings and zero; omitted fields are never touched. `role`
/// is deliberately not updatable through this payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateUser {
    pub id: UserId,
    pub updated_ts: Option<i64>,
    pub status: Option<AccountStatus>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub nickname: Option<String>,
    /// `Some(String::new())` clears the avatar.
    pub avatar_url: Option<String>,
    pub password_hash: Option<String>,
}

impl UpdateUser {
    /// Creates an empty update targeting `id`.
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            updated_ts: None,
            status: None,
            username: None,
            email: None,
            nickname: None,
            avatar_url: None,
            password_hash: None,
        }
    }

    /// Returns whether the payload updates zero fields.
    pub fn is_empty(&self) -> bool {
        self.updated_ts.is_none()
            && self.status.is_none()
            && self.username.is_none()
            && self.email.is_none()
            && self.nickname.is_none()
            && self.avatar_url.is_none()
            && self.password_hash.is_none()
    }
}

/// Conjunctive equality filter for list queries.
///
/// An absent field matches all records; a present field constrains by
/// equality only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub id: Option<UserId>,
    pub username: Option<String>,
    pub role: Option<Role>,
    pub email: Option<String>,
    pub nickname: Option<String>,
}
