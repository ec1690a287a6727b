//! Integration tests for path activation, rollover, and completion.

use guidepost::config::ActiveTaskPolicy;
use guidepost::db::Database;
use guidepost::error::{ApiError, ErrorCode};

fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn new_user(db: &Database) -> String {
    let suffix = uuid::Uuid::now_v7().to_string();
    db.register_user(&format!("user-{}@example.com", suffix), "Test User")
        .expect("Failed to register user")
        .id
}

/// Seed a path whose challenges have the given task counts.
/// Returns (path_id, per-challenge (challenge_id, wrapper ids)).
fn seed_path(db: &Database, task_counts: &[usize]) -> (String, Vec<(String, Vec<String>)>) {
    let apostle = db
        .create_apostle("John", None, Some("gentle"), None)
        .expect("Failed to create apostle");
    let path = db
        .create_path("The Narrow Way", Some("a short curriculum"))
        .expect("Failed to create path");

    let mut challenges = Vec::new();
    for (ci, &count) in task_counts.iter().enumerate() {
        let challenge = db
            .create_challenge(&apostle.id, &format!("Challenge {}", ci), None)
            .expect("Failed to create challenge");
        db.add_challenge_to_path(&path.id, &challenge.id)
            .expect("Failed to add challenge to path");

        let mut wrapper_ids = Vec::new();
        for ti in 0..count {
            let task = db
                .create_task(&format!("C{} T{}", ci, ti), None)
                .expect("Failed to create task");
            let wrapper = db
                .add_task_to_challenge(&challenge.id, &task.id, None)
                .expect("Failed to add task");
            wrapper_ids.push(wrapper.id);
        }
        challenges.push((challenge.id, wrapper_ids));
    }
    (path.id, challenges)
}

fn err_code(err: anyhow::Error) -> ErrorCode {
    ApiError::from(err).code
}

mod start_path_tests {
    use super::*;

    #[test]
    fn start_path_seeds_first_task_of_first_challenge() {
        let db = setup_db();
        let (path_id, challenges) = seed_path(&db, &[2, 1]);
        let user = new_user(&db);

        let start = db.start_path(&user, &path_id).unwrap();

        let first = start.first_task.expect("first task must be seeded");
        assert_eq!(first.id, challenges[0].1[0]);

        let snap = db.progress_snapshot(&user).unwrap();
        assert!(snap.active_paths.contains(&path_id));
        assert!(snap.active_tasks.contains(&first.id));
    }

    #[test]
    fn start_path_with_no_challenges_succeeds_without_first_task() {
        let db = setup_db();
        let path = db.create_path("Empty Road", None).unwrap();
        let user = new_user(&db);

        let start = db.start_path(&user, &path.id).unwrap();

        assert!(start.first_task.is_none());
        let snap = db.progress_snapshot(&user).unwrap();
        assert!(snap.active_paths.contains(&path.id));
        assert!(snap.active_tasks.is_empty());
    }

    #[test]
    fn start_path_with_empty_first_challenge_succeeds_without_first_task() {
        let db = setup_db();
        let (path_id, _) = seed_path(&db, &[0]);
        let user = new_user(&db);

        let start = db.start_path(&user, &path_id).unwrap();

        assert!(start.first_task.is_none());
        assert!(db
            .progress_snapshot(&user)
            .unwrap()
            .active_paths
            .contains(&path_id));
    }

    #[test]
    fn start_active_path_fails_without_mutating_sets() {
        let db = setup_db();
        let (path_id, _) = seed_path(&db, &[1]);
        let user = new_user(&db);

        db.start_path(&user, &path_id).unwrap();
        let before = db.progress_snapshot(&user).unwrap();

        let err = db.start_path(&user, &path_id).unwrap_err();
        assert_eq!(err_code(err), ErrorCode::AlreadyActive);

        let after = db.progress_snapshot(&user).unwrap();
        assert_eq!(before.active_paths, after.active_paths);
        assert_eq!(before.active_tasks, after.active_tasks);
    }

    #[test]
    fn start_unknown_path_fails_not_found() {
        let db = setup_db();
        let user = new_user(&db);

        let err = db.start_path(&user, "no-such-path").unwrap_err();
        assert_eq!(err_code(err), ErrorCode::PathNotFound);
    }

    #[test]
    fn start_path_for_unknown_user_fails_not_found() {
        let db = setup_db();
        let (path_id, _) = seed_path(&db, &[1]);

        let err = db.start_path("no-such-user", &path_id).unwrap_err();
        assert_eq!(err_code(err), ErrorCode::UserNotFound);
    }

    #[test]
    fn restarting_a_completed_path_fails_already_completed() {
        let db = setup_db();
        let (path_id, challenges) = seed_path(&db, &[1]);
        let user = new_user(&db);

        db.start_path(&user, &path_id).unwrap();
        db.complete_task(&user, &challenges[0].1[0], "done").unwrap();

        let err = db.start_path(&user, &path_id).unwrap_err();
        assert_eq!(err_code(err), ErrorCode::AlreadyCompleted);
    }
}

mod rollover_tests {
    use super::*;

    #[test]
    fn completing_last_task_of_challenge_rolls_over_to_next_challenge() {
        let db = setup_db();
        let (path_id, challenges) = seed_path(&db, &[2, 1]);
        let user = new_user(&db);

        db.start_path(&user, &path_id).unwrap();
        db.complete_task(&user, &challenges[0].1[0], "c0 t0").unwrap();
        let outcome = db.complete_task(&user, &challenges[0].1[1], "c0 t1").unwrap();

        assert!(outcome.challenge_complete);
        assert!(outcome.completed_path_ids.is_empty());
        assert_eq!(
            outcome.auto_activated.as_ref().map(|t| t.id.as_str()),
            Some(challenges[1].1[0].as_str())
        );

        let snap = db.progress_snapshot(&user).unwrap();
        assert!(snap.active_tasks.contains(&challenges[1].1[0]));
        assert!(snap.active_paths.contains(&path_id));
    }

    #[test]
    fn completing_final_challenge_persists_path_completion() {
        let db = setup_db();
        let (path_id, challenges) = seed_path(&db, &[1, 1]);
        let user = new_user(&db);

        db.start_path(&user, &path_id).unwrap();
        db.complete_task(&user, &challenges[0].1[0], "c0 done").unwrap();
        let outcome = db.complete_task(&user, &challenges[1].1[0], "c1 done").unwrap();

        assert!(outcome.challenge_complete);
        assert!(outcome.auto_activated.is_none());
        assert_eq!(outcome.completed_path_ids, vec![path_id.clone()]);

        let snap = db.progress_snapshot(&user).unwrap();
        assert!(!snap.active_paths.contains(&path_id));
        assert!(snap.completed_paths.contains(&path_id));
        assert!(db.path_complete(&user, &path_id).unwrap());
    }

    #[test]
    fn rollover_walks_past_empty_challenges() {
        let db = setup_db();
        let (path_id, challenges) = seed_path(&db, &[1, 0, 1]);
        let user = new_user(&db);

        db.start_path(&user, &path_id).unwrap();
        let outcome = db.complete_task(&user, &challenges[0].1[0], "c0 done").unwrap();

        // The empty middle challenge cannot strand the user: rollover seeds
        // the first task of the next non-empty challenge.
        assert!(outcome.challenge_complete);
        assert_eq!(
            outcome.auto_activated.as_ref().map(|t| t.id.as_str()),
            Some(challenges[2].1[0].as_str())
        );

        let snap = db.progress_snapshot(&user).unwrap();
        assert!(snap.active_tasks.contains(&challenges[2].1[0]));
        assert!(!snap.completed_paths.contains(&path_id));
    }

    #[test]
    fn rollover_is_skipped_when_path_is_not_active() {
        let db = setup_db();
        let (_, challenges) = seed_path(&db, &[1, 1]);
        let user = new_user(&db);

        // Work the challenge directly without starting the path.
        db.activate_task(&user, &challenges[0].1[0], ActiveTaskPolicy::Single)
            .unwrap();
        let outcome = db.complete_task(&user, &challenges[0].1[0], "done").unwrap();

        assert!(outcome.challenge_complete);
        assert!(outcome.auto_activated.is_none());
        assert!(outcome.completed_path_ids.is_empty());
    }
}

mod progress_stats_tests {
    use super::*;

    #[test]
    fn path_progress_tracks_completion_ratio() {
        let db = setup_db();
        let (path_id, challenges) = seed_path(&db, &[2, 2]);
        let user = new_user(&db);

        db.start_path(&user, &path_id).unwrap();
        let progress = db.path_progress(&user, &path_id).unwrap();
        assert_eq!(progress.total_tasks, 4);
        assert_eq!(progress.completed_tasks, 0);
        assert!(!progress.complete);

        db.complete_task(&user, &challenges[0].1[0], "one").unwrap();
        db.complete_task(&user, &challenges[0].1[1], "two").unwrap();

        let progress = db.path_progress(&user, &path_id).unwrap();
        assert_eq!(progress.completed_tasks, 2);
        assert!((progress.percent - 50.0).abs() < f64::EPSILON);
        assert!(!progress.complete);
    }

    #[test]
    fn task_states_derive_locked_available_active_completed() {
        let db = setup_db();
        let (path_id, challenges) = seed_path(&db, &[3]);
        let user = new_user(&db);

        db.start_path(&user, &path_id).unwrap();
        db.complete_task(&user, &challenges[0].1[0], "done").unwrap();

        use guidepost::types::TaskState;
        let states = db.task_states(&user, &challenges[0].0).unwrap();
        assert_eq!(states.len(), 3);
        assert_eq!(states[0].state, TaskState::Completed);
        assert_eq!(states[1].state, TaskState::Active);
        assert_eq!(states[2].state, TaskState::Locked);
    }

    #[test]
    fn skipped_task_reads_back_as_available() {
        let db = setup_db();
        let (path_id, challenges) = seed_path(&db, &[2]);
        let user = new_user(&db);

        db.start_path(&user, &path_id).unwrap();
        db.skip_task(&user, &challenges[0].1[0], Some("later")).unwrap();

        use guidepost::types::TaskState;
        let states = db.task_states(&user, &challenges[0].0).unwrap();
        assert_eq!(states[0].state, TaskState::Available);
        assert_eq!(states[1].state, TaskState::Locked);
    }
}
