//! Integration tests for registration, the eager progress aggregate, and
//! session-token authentication.

use guidepost::db::Database;
use guidepost::error::{ApiError, ErrorCode};
use guidepost::server::auth::{Authenticator, SessionAuth};

fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

#[test]
fn open_creates_database_file_and_runs_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guidepost.db");

    let db = Database::open(&path).unwrap();
    db.register_user("disk@example.com", "Disk").unwrap();

    assert!(path.exists());
}

#[test]
fn register_creates_user_with_empty_progress_aggregate() {
    let db = setup_db();

    let user = db.register_user("anna@example.com", "Anna").unwrap();

    assert_eq!(user.streak, 0);
    assert!(user.last_active_at.is_none());

    // The aggregate exists immediately; no lazy creation later.
    let snap = db.progress_snapshot(&user.id).unwrap();
    assert!(snap.active_tasks.is_empty());
    assert!(snap.completed_tasks.is_empty());
    assert!(snap.active_paths.is_empty());
    assert!(snap.completed_paths.is_empty());
}

#[test]
fn register_rejects_blank_email() {
    let db = setup_db();

    let err = db.register_user("  ", "Anna").unwrap_err();
    assert_eq!(ApiError::from(err).code, ErrorCode::InvalidInput);
}

#[test]
fn register_rejects_duplicate_email() {
    let db = setup_db();
    db.register_user("anna@example.com", "Anna").unwrap();

    let err = db.register_user("anna@example.com", "Other").unwrap_err();
    assert_eq!(ApiError::from(err).code, ErrorCode::StorageFailure);
}

#[test]
fn progress_snapshot_for_unknown_user_fails_not_found() {
    let db = setup_db();

    let err = db.progress_snapshot("no-such-user").unwrap_err();
    assert_eq!(ApiError::from(err).code, ErrorCode::UserNotFound);
}

#[test]
fn broken_storage_surfaces_as_storage_failure_not_user_not_found() {
    let db = setup_db();
    let user = db.register_user("dora@example.com", "Dora").unwrap();

    // Wreck the progress tables underneath the aggregate probe.
    db.with_conn(|conn| {
        conn.execute_batch(
            "DROP TABLE user_active_tasks;
             DROP TABLE user_completed_tasks;
             DROP TABLE user_active_paths;
             DROP TABLE user_completed_paths;
             DROP TABLE user_progress;",
        )?;
        Ok(())
    })
    .unwrap();

    let err = db.progress_snapshot(&user.id).unwrap_err();
    assert_eq!(ApiError::from(err).code, ErrorCode::StorageFailure);
}

#[test]
fn session_round_trip_resolves_user() {
    let db = setup_db();
    let user = db.register_user("ben@example.com", "Ben").unwrap();

    let token = db.create_session(&user.id).unwrap();
    let resolved = db.resolve_session(&token).unwrap().unwrap();

    assert_eq!(resolved.id, user.id);
    assert_eq!(resolved.email, "ben@example.com");
}

#[test]
fn unknown_token_resolves_to_none() {
    let db = setup_db();

    assert!(db.resolve_session("bogus-token").unwrap().is_none());
}

#[tokio::test]
async fn session_auth_resolves_identity_and_fails_closed() {
    let db = setup_db();
    let user = db.register_user("cara@example.com", "Cara").unwrap();
    let token = db.create_session(&user.id).unwrap();

    let auth = SessionAuth::new(db);

    let identity = auth.authenticate(&token).await.unwrap().unwrap();
    assert_eq!(identity.user_id, user.id);
    assert_eq!(identity.name, "Cara");

    assert!(auth.authenticate("invalid").await.unwrap().is_none());
}
