//! User repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/update/list/delete persistence APIs for user records.
//! - Build every statement from the sparse fields actually provided.
//! - Return fully-populated records decoded from authoritative rows.
//!
//! # Invariants
//! - Create and update are single insert-and-return / update-and-return
//!   round trips; there is no separate read-back statement.
//! - An update payload with zero fields is rejected before any SQL is
//!   built.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::cancel::CancelToken;
use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::user::{AccountStatus, NewUser, Role, UpdateUser, User, UserFilter, UserId};
use crate::repo::fields::FieldSet;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const USER_COLUMNS: &str = "id, username, role, email, nickname, password_hash, \
     avatar_url, status, created_ts, updated_ts";

const REQUIRED_USER_COLUMNS: &[&str] = &[
    "id",
    "username",
    "role",
    "email",
    "nickname",
    "password_hash",
    "avatar_url",
    "status",
    "created_ts",
    "updated_ts",
];

pub type StoreResult<T> = Result<T, StoreError>;

/// Store error for user persistence and query operations.
#[derive(Debug)]
pub enum StoreError {
    /// Uniqueness constraint violated (username, or an explicit key).
    Conflict { username: String },
    /// No row matched the targeted key.
    NotFound(UserId),
    /// Caller error detected before touching storage.
    InvalidRequest(&'static str),
    /// The caller's cancel token was tripped before execution.
    Cancelled,
    /// Transport-level storage failure.
    Db(DbError),
    /// Persisted state failed to decode into a complete record.
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

/// Coarse error taxonomy exposed to the RPC service layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Conflict,
    NotFound,
    InvalidRequest,
    Cancelled,
    Internal,
}

impl StoreError {
    /// Maps this error onto the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Db(_)
            | Self::InvalidData(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => ErrorKind::Internal,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conflict { username } => write!(f, "username `{username}` already exists"),
            Self::NotFound(id) => write!(f, "user not found: {id}"),
            Self::InvalidRequest(message) => write!(f, "invalid request: {message}"),
            Self::Cancelled => write!(f, "operation cancelled by caller"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted user data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match required {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{column}` in table `{table}`")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record-store interface for user persistence.
pub trait UserRepository {
    /// Creates one user and returns the storage-authoritative record.
    fn create_user(&self, cancel: &CancelToken, create: NewUser) -> StoreResult<User>;
    /// Applies the provided fields to one user and returns the post-update record.
    fn update_user(&self, cancel: &CancelToken, update: &UpdateUser) -> StoreResult<User>;
    /// Lists records matching every provided equality filter.
    fn list_users(&self, cancel: &CancelToken, filter: &UserFilter) -> StoreResult<Vec<User>>;
    /// Deletes one user by key, returning rows affected; zero is success.
    fn delete_user(&self, cancel: &CancelToken, id: UserId) -> StoreResult<u64>;
    /// Reclaims storage space released by deletions.
    fn compact(&self, cancel: &CancelToken) -> StoreResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, cancel: &CancelToken, create: NewUser) -> StoreResult<User> {
        ensure_not_cancelled(cancel)?;

        let username = create.username.clone();
        let mut fields = FieldSet::new();
        fields.set("username", create.username);
        fields.set("role", role_to_db(create.role).to_string());
        fields.set("email", create.email);
        fields.set("nickname", create.nickname);
        fields.set("password_hash", create.password_hash);
        fields.set_if("avatar_url", create.avatar_url);
        fields.set_if(
            "status",
            create.status.map(|status| status_to_db(status).to_string()),
        );
        fields.set_if("created_ts", create.created_ts);
        fields.set_if("updated_ts", create.updated_ts);
        fields.set_if("id", create.id);

        let sql = format!(
            "INSERT INTO users ({}) VALUES ({}) RETURNING {USER_COLUMNS};",
            fields.column_list(),
            fields.placeholder_list()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(fields.into_values()))?;
        let row = match rows.next() {
            Ok(Some(row)) => row,
            Ok(None) => {
                return Err(StoreError::InvalidData(
                    "insert returned no row".to_string(),
                ))
            }
            Err(err) if is_unique_violation(&err) => {
                return Err(StoreError::Conflict { username })
            }
            Err(err) => return Err(err.into()),
        };

        decode_user_row(row)
    }

    fn update_user(&self, cancel: &CancelToken, update: &UpdateUser) -> StoreResult<User> {
        ensure_not_cancelled(cancel)?;

        if update.is_empty() {
            return Err(StoreError::InvalidRequest("no fields to update"));
        }

        let mut set = FieldSet::new();
        set.set_if("updated_ts", update.updated_ts);
        set.set_if(
            "status",
            update.status.map(|status| status_to_db(status).to_string()),
        );
        set.set_if("username", update.username.clone());
        set.set_if("email", update.email.clone());
        set.set_if("nickname", update.nickname.clone());
        set.set_if("avatar_url", update.avatar_url.clone());
        set.set_if("password_hash", update.password_hash.clone());

        let sql = format!(
            "UPDATE users SET {} WHERE id = ? RETURNING {USER_COLUMNS};",
            set.assignment_list()
        );
        let mut args = set.into_values();
        args.push(Value::Integer(update.id));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(args))?;
        let row = match rows.next() {
            Ok(Some(row)) => row,
            Ok(None) => return Err(StoreError::NotFound(update.id)),
            Err(err) if is_unique_violation(&err) => {
                return Err(StoreError::Conflict {
                    username: update.username.clone().unwrap_or_default(),
                })
            }
            Err(err) => return Err(err.into()),
        };

        decode_user_row(row)
    }

    fn list_users(&self, cancel: &CancelToken, filter: &UserFilter) -> StoreResult<Vec<User>> {
        ensure_not_cancelled(cancel)?;

        let mut where_fields = FieldSet::new();
        where_fields.set_if("id", filter.id);
        where_fields.set_if("username", filter.username.clone());
        where_fields.set_if("role", filter.role.map(|role| role_to_db(role).to_string()));
        where_fields.set_if("email", filter.email.clone());
        where_fields.set_if("nickname", filter.nickname.clone());

        let sql = format!(
            "SELECT {USER_COLUMNS}
             FROM users
             WHERE {}
             ORDER BY created_ts DESC, status DESC;",
            where_fields.predicate()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(where_fields.into_values()))?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(decode_user_row(row)?);
        }

        Ok(users)
    }

    fn delete_user(&self, cancel: &CancelToken, id: UserId) -> StoreResult<u64> {
        ensure_not_cancelled(cancel)?;

        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1;", params![id])?;
        Ok(changed as u64)
    }

    fn compact(&self, cancel: &CancelToken) -> StoreResult<()> {
        ensure_not_cancelled(cancel)?;

        self.conn.execute_batch("VACUUM;")?;
        Ok(())
    }
}

fn ensure_not_cancelled(cancel: &CancelToken) -> StoreResult<()> {
    if cancel.is_cancelled() {
        return Err(StoreError::Cancelled);
    }
    Ok(())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(cause, _)
            if cause.code == rusqlite::ErrorCode::ConstraintViolation
                && (cause.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || cause.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    )
}

fn decode_user_row(row: &Row<'_>) -> StoreResult<User> {
    let role_text: String = row.get("role")?;
    let role = parse_role(&role_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid role `{role_text}` in users.role"))
    })?;

    let status_text: String = row.get("status")?;
    let status = parse_status(&status_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid status `{status_text}` in users.status"))
    })?;

    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        role,
        email: row.get("email")?,
        nickname: row.get("nickname")?,
        password_hash: row.get("password_hash")?,
        avatar_url: row.get("avatar_url")?,
        status,
        created_ts: row.get("created_ts")?,
        updated_ts: row.get("updated_ts")?,
    })
}

fn role_to_db(role: Role) -> &'static str {
    match role {
        Role::Owner => "OWNER",
        Role::Admin => "ADMIN",
        Role::User => "USER",
    }
}

fn parse_role(value: &str) -> Option<Role> {
    match value {
        "OWNER" => Some(Role::Owner),
        "ADMIN" => Some(Role::Admin),
        "USER" => Some(Role::User),
        _ => None,
    }
}

fn status_to_db(status: AccountStatus) -> &'static str {
    match status {
        AccountStatus::Normal => "NORMAL",
        AccountStatus::Archived => "ARCHIVED",
    }
}

fn parse_status(value: &str) -> Option<AccountStatus> {
    match value {
        "NORMAL" => Some(AccountStatus::Normal),
        "ARCHIVED" => Some(AccountStatus::Archived),
        _ => None,
    }
}

fn ensure_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "users")? {
        return Err(StoreError::MissingRequiredTable("users"));
    }

    for column in REQUIRED_USER_COLUMNS.iter().copied() {
        if !table_has_column(conn, "users", column)? {
            return Err(StoreError::MissingRequiredColumn {
                table: "users",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
