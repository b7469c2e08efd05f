//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `roster_core` wiring end to
//!   end against an in-memory database.
//! - Keep output deterministic for quick local sanity checks.

use roster_core::db::open_db_in_memory;
use roster_core::{
    CancelToken, NewUser, Role, SqliteUserRepository, UserFilter, UserService,
};

fn main() {
    println!("roster_core ping={}", roster_core::ping());
    println!("roster_core version={}", roster_core::core_version());

    if let Err(err) = smoke_round_trip() {
        eprintln!("roster_core smoke failed: {err}");
        std::process::exit(1);
    }
}

fn smoke_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db_in_memory()?;
    let repo = SqliteUserRepository::try_new(&conn)?;
    let service = UserService::new(repo);
    let cancel = CancelToken::none();

    let created = service.create_user(
        &cancel,
        NewUser::new("smoke", Role::User, "smoke@localhost", "Smoke", "x"),
    )?;
    let listed = service.list_users(&cancel, &UserFilter::default())?;

    println!("roster_core smoke created_id={}", created.id);
    println!("roster_core smoke listed={}", listed.len());
    Ok(())
}
