use roster_core::db::migrations::latest_version;
use roster_core::db::open_db_in_memory;
use roster_core::{
    AccountStatus, CancelToken, ErrorKind, NewUser, Role, SqliteUserRepository, StoreError,
    UpdateUser, User, UserFilter, UserRepository,
};
use rusqlite::Connection;

fn new_user(username: &str) -> NewUser {
    NewUser::new(
        username,
        Role::User,
        format!("{username}@example.com"),
        username.to_uppercase(),
        "hash",
    )
}

#[test]
fn create_with_required_fields_uses_storage_defaults() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let cancel = CancelToken::none();

    let created = repo.create_user(&cancel, new_user("alice")).unwrap();

    assert!(created.id > 0);
    assert_eq!(created.username, "alice");
    assert_eq!(created.status, AccountStatus::Normal);
    assert_eq!(created.avatar_url, "");
    assert!(created.created_ts > 0);
    assert!(created.updated_ts > 0);
}

#[test]
fn create_honors_explicit_optional_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let cancel = CancelToken::none();

    let mut payload = new_user("bob");
    payload.avatar_url = Some("avatars/bob.png".to_string());
    payload.status = Some(AccountStatus::Archived);
    payload.created_ts = Some(1234);
    payload.updated_ts = Some(1234);
    payload.id = Some(42);

    let created = repo.create_user(&cancel, payload).unwrap();

    assert_eq!(created.id, 42);
    assert_eq!(created.avatar_url, "avatars/bob.png");
    assert_eq!(created.status, AccountStatus::Archived);
    assert_eq!(created.created_ts, 1234);
    assert_eq!(created.updated_ts, 1234);
}

#[test]
fn create_honors_explicit_zero_timestamps() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let cancel = CancelToken::none();

    let mut payload = new_user("epoch");
    payload.created_ts = Some(0);
    payload.updated_ts = Some(0);

    let created = repo.create_user(&cancel, payload).unwrap();

    assert_eq!(created.created_ts, 0);
    assert_eq!(created.updated_ts, 0);
}

#[test]
fn create_duplicate_username_returns_conflict() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let cancel = CancelToken::none();

    repo.create_user(&cancel, new_user("carol")).unwrap();
    let err = repo.create_user(&cancel, new_user("carol")).unwrap_err();

    assert!(matches!(&err, StoreError::Conflict { username } if username == "carol"));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn partial_update_touches_only_provided_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let cancel = CancelToken::none();

    let created = repo.create_user(&cancel, new_user("dave")).unwrap();

    let mut update = UpdateUser::new(created.id);
    update.nickname = Some("Dee".to_string());
    let updated = repo.update_user(&cancel, &update).unwrap();

    let expected = User {
        nickname: "Dee".to_string(),
        ..created
    };
    assert_eq!(updated, expected);
}

#[test]
fn update_applies_empty_and_zero_values() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let cancel = CancelToken::none();

    let mut payload = new_user("erin");
    payload.avatar_url = Some("avatars/erin.png".to_string());
    let created = repo.create_user(&cancel, payload).unwrap();

    let mut update = UpdateUser::new(created.id);
    update.avatar_url = Some(String::new());
    update.updated_ts = Some(0);
    update.status = Some(AccountStatus::Archived);
    let updated = repo.update_user(&cancel, &update).unwrap();

    assert_eq!(updated.avatar_url, "");
    assert_eq!(updated.updated_ts, 0);
    assert_eq!(updated.status, AccountStatus::Archived);
}

#[test]
fn empty_update_is_rejected_before_storage() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let cancel = CancelToken::none();

    let created = repo.create_user(&cancel, new_user("frank")).unwrap();

    let err = repo
        .update_user(&cancel, &UpdateUser::new(created.id))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidRequest(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);

    let filter = UserFilter {
        id: Some(created.id),
        ..UserFilter::default()
    };
    let reread = repo.list_users(&cancel, &filter).unwrap();
    assert_eq!(reread, vec![created]);
}

#[test]
fn update_missing_key_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let cancel = CancelToken::none();

    let mut update = UpdateUser::new(4242);
    update.nickname = Some("ghost".to_string());
    let err = repo.update_user(&cancel, &update).unwrap_err();

    assert!(matches!(err, StoreError::NotFound(4242)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn update_username_to_existing_one_returns_conflict() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let cancel = CancelToken::none();

    repo.create_user(&cancel, new_user("grace")).unwrap();
    let other = repo.create_user(&cancel, new_user("heidi")).unwrap();

    let mut update = UpdateUser::new(other.id);
    update.username = Some("grace".to_string());
    let err = repo.update_user(&cancel, &update).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn list_filters_are_conjunctive_equality_matches() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let cancel = CancelToken::none();

    let mut admin = new_user("ivy");
    admin.role = Role::Admin;
    repo.create_user(&cancel, admin).unwrap();
    repo.create_user(&cancel, new_user("judy")).unwrap();
    repo.create_user(&cancel, new_user("kim")).unwrap();

    let everyone = repo.list_users(&cancel, &UserFilter::default()).unwrap();
    assert_eq!(everyone.len(), 3);

    let filter = UserFilter {
        role: Some(Role::User),
        ..UserFilter::default()
    };
    let regulars = repo.list_users(&cancel, &filter).unwrap();
    assert_eq!(regulars.len(), 2);
    assert!(regulars.iter().all(|user| user.role == Role::User));
    assert!(regulars.iter().all(|user| everyone.contains(user)));

    let narrow = UserFilter {
        role: Some(Role::User),
        username: Some("judy".to_string()),
        ..UserFilter::default()
    };
    let matched = repo.list_users(&cancel, &narrow).unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].username, "judy");

    let miss = UserFilter {
        username: Some("nobody".to_string()),
        ..UserFilter::default()
    };
    assert!(repo.list_users(&cancel, &miss).unwrap().is_empty());
}

#[test]
fn list_orders_by_creation_desc_then_status_desc() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let cancel = CancelToken::none();

    let mut oldest = new_user("oldest");
    oldest.created_ts = Some(100);
    let mut newest = new_user("newest");
    newest.created_ts = Some(300);
    let mut middle = new_user("middle");
    middle.created_ts = Some(200);

    repo.create_user(&cancel, oldest).unwrap();
    repo.create_user(&cancel, newest).unwrap();
    repo.create_user(&cancel, middle).unwrap();

    let listed = repo.list_users(&cancel, &UserFilter::default()).unwrap();
    let names: Vec<&str> = listed.iter().map(|user| user.username.as_str()).collect();
    assert_eq!(names, ["newest", "middle", "oldest"]);
}

#[test]
fn list_breaks_creation_ties_by_status_desc() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let cancel = CancelToken::none();

    let mut archived = new_user("archived");
    archived.created_ts = Some(500);
    archived.status = Some(AccountStatus::Archived);
    let mut normal = new_user("normal");
    normal.created_ts = Some(500);

    repo.create_user(&cancel, archived).unwrap();
    repo.create_user(&cancel, normal).unwrap();

    let listed = repo.list_users(&cancel, &UserFilter::default()).unwrap();
    let names: Vec<&str> = listed.iter().map(|user| user.username.as_str()).collect();
    assert_eq!(names, ["normal", "archived"]);
}

#[test]
fn delete_removes_row_and_missing_key_is_noop_success() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let cancel = CancelToken::none();

    let created = repo.create_user(&cancel, new_user("mallory")).unwrap();

    assert_eq!(repo.delete_user(&cancel, created.id).unwrap(), 1);
    assert!(repo
        .list_users(&cancel, &UserFilter::default())
        .unwrap()
        .is_empty());
    assert_eq!(repo.delete_user(&cancel, created.id).unwrap(), 0);
}

#[test]
fn cancelled_token_aborts_before_any_write() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let cancelled = CancelToken::none();
    cancelled.cancel();

    let err = repo.create_user(&cancelled, new_user("nina")).unwrap_err();
    assert!(matches!(err, StoreError::Cancelled));
    assert_eq!(err.kind(), ErrorKind::Cancelled);

    let fresh = CancelToken::none();
    assert!(repo
        .list_users(&fresh, &UserFilter::default())
        .unwrap()
        .is_empty());
}

#[test]
fn list_aborts_on_undecodable_row() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let cancel = CancelToken::none();

    repo.create_user(&cancel, new_user("oscar")).unwrap();

    conn.execute_batch("PRAGMA ignore_check_constraints = ON;")
        .unwrap();
    conn.execute("UPDATE users SET role = 'WIZARD';", []).unwrap();

    let err = repo
        .list_users(&cancel, &UserFilter::default())
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqliteUserRepository::try_new(&conn);
    match result {
        Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_users_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteUserRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(StoreError::MissingRequiredTable("users"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL,
            email TEXT NOT NULL DEFAULT ''
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteUserRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(StoreError::MissingRequiredColumn {
            table: "users",
            column: "nickname"
        })
    ));
}
