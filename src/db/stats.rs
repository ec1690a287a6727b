//! Derived progression views: per-path completion ratios and task states.

use super::content::path_challenge_ids_internal;
use super::users::{ensure_aggregate_internal, snapshot_internal};
use super::Database;
use crate::availability;
use crate::error::ApiError;
use crate::types::{PathProgress, TaskState, TaskStateView};
use anyhow::Result;
use rusqlite::params;

impl Database {
    /// Per-user completion ratio for a path: completed wrappers over all
    /// wrappers across its challenges. Consistent with the persisted
    /// completed-paths set.
    pub fn path_progress(&self, user_id: &str, path_id: &str) -> Result<PathProgress> {
        self.with_conn(|conn| {
            if super::content::get_path_internal(conn, path_id)?.is_none() {
                return Err(ApiError::path_not_found(path_id).into());
            }
            ensure_aggregate_internal(conn, user_id)?;

            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM task_wrappers tw
                 JOIN path_challenges pc ON pc.challenge_id = tw.challenge_id
                 WHERE pc.path_id = ?1",
                params![path_id],
                |row| row.get(0),
            )?;

            let completed: i64 = conn.query_row(
                "SELECT COUNT(*) FROM user_completed_tasks uct
                 JOIN task_wrappers tw ON tw.id = uct.task_wrapper_id
                 JOIN path_challenges pc ON pc.challenge_id = tw.challenge_id
                 WHERE pc.path_id = ?1 AND uct.user_id = ?2",
                params![path_id, user_id],
                |row| row.get(0),
            )?;

            let percent = if total > 0 {
                completed as f64 / total as f64 * 100.0
            } else {
                0.0
            };

            Ok(PathProgress {
                path_id: path_id.to_string(),
                total_tasks: total,
                completed_tasks: completed,
                percent,
                complete: total > 0 && completed == total,
            })
        })
    }

    /// Every wrapper of a challenge with its derived per-user state.
    pub fn task_states(&self, user_id: &str, challenge_id: &str) -> Result<Vec<TaskStateView>> {
        let details = self.challenge_task_details(challenge_id)?;
        self.with_conn(|conn| {
            ensure_aggregate_internal(conn, user_id)?;
            let snapshot = snapshot_internal(conn, user_id)?;

            let ordered: Vec<String> = details.iter().map(|d| d.id.clone()).collect();

            let views = details
                .into_iter()
                .enumerate()
                .map(|(i, task)| {
                    let state = if snapshot.completed_tasks.contains(&task.id) {
                        TaskState::Completed
                    } else if snapshot.active_tasks.contains(&task.id) {
                        TaskState::Active
                    } else if availability::is_available(&ordered, i, &snapshot.completed_tasks) {
                        TaskState::Available
                    } else {
                        TaskState::Locked
                    };
                    TaskStateView { task, state }
                })
                .collect();

            Ok(views)
        })
    }

    /// Whether every task of every challenge in a path is completed for a user.
    pub fn path_complete(&self, user_id: &str, path_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            ensure_aggregate_internal(conn, user_id)?;
            let snapshot = snapshot_internal(conn, user_id)?;

            let challenge_ids = path_challenge_ids_internal(conn, path_id)?;
            if challenge_ids.is_empty() {
                return Ok(false);
            }

            for challenge_id in &challenge_ids {
                let ordered = super::content::ordered_wrapper_ids_internal(conn, challenge_id)?;
                if ordered.iter().any(|id| !snapshot.completed_tasks.contains(id)) {
                    return Ok(false);
                }
            }
            Ok(true)
        })
    }
}
