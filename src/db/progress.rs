//! Progression engines: path start, task activation, completion, skip.
//!
//! Every mutation runs its whole read-check-write sequence in one transaction
//! under the connection mutex, so concurrent requests for the same user are
//! serialized and no partial transition is ever observable. Precondition
//! violations are detected before any write and surfaced as typed errors.

use super::content::{
    get_detail_internal, get_path_internal, ordered_wrapper_ids_internal,
    path_challenge_ids_internal, paths_containing_challenge_internal,
};
use super::users::{ensure_aggregate_internal, snapshot_internal, touch_aggregate_internal};
use super::{now_ms, Database};
use crate::availability;
use crate::config::ActiveTaskPolicy;
use crate::error::ApiError;
use crate::types::{
    CompletionOutcome, PathStart, ProgressSnapshot, ResultKind, TaskWrapperDetail,
    TaskWrapperResult,
};
use anyhow::Result;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use tracing::{debug, info, warn};

fn insert_active_task(conn: &Connection, user_id: &str, task_wrapper_id: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO user_active_tasks (user_id, task_wrapper_id, activated_at)
         VALUES (?1, ?2, ?3)",
        params![user_id, task_wrapper_id, now_ms()],
    )?;
    Ok(())
}

fn append_result(
    conn: &Connection,
    user_id: &str,
    task_wrapper_id: &str,
    content: Option<&str>,
    kind: ResultKind,
) -> Result<()> {
    conn.execute(
        "INSERT INTO task_results (task_wrapper_id, user_id, content, result, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![task_wrapper_id, user_id, content, kind.as_str(), now_ms()],
    )?;
    Ok(())
}

/// All wrapper ids across every challenge of a path.
fn path_wrapper_ids(conn: &Connection, path_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT tw.id FROM task_wrappers tw
         JOIN path_challenges pc ON pc.challenge_id = tw.challenge_id
         WHERE pc.path_id = ?1",
    )?;
    let ids = stmt
        .query_map(params![path_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

/// Activate the first eligible task of the challenges following
/// `challenge_id` within `path_id`, if any. Empty challenges are walked past
/// (mirroring the empty-challenge tolerance of `start_path`) so the user is
/// never stranded with nothing active. Returns the activated detail.
fn rollover_into_next_challenge(
    conn: &Connection,
    user_id: &str,
    path_id: &str,
    challenge_id: &str,
    snapshot: &ProgressSnapshot,
    completed_after: &HashSet<String>,
) -> Result<Option<TaskWrapperDetail>> {
    let challenge_ids = path_challenge_ids_internal(conn, path_id)?;
    let index = match challenge_ids.iter().position(|id| id == challenge_id) {
        Some(i) => i,
        None => return Ok(None),
    };

    for next_challenge in &challenge_ids[index + 1..] {
        let ordered = ordered_wrapper_ids_internal(conn, next_challenge)?;
        let first = match ordered.first() {
            Some(id) => id,
            None => {
                warn!(challenge_id = %next_challenge, "rollover walking past empty challenge");
                continue;
            }
        };

        if snapshot.active_tasks.contains(first) || completed_after.contains(first) {
            // The user already has a foothold there; nothing to seed.
            return Ok(None);
        }

        insert_active_task(conn, user_id, first)?;
        return get_detail_internal(conn, first);
    }

    Ok(None)
}

impl Database {
    /// Start a path for a user: mark it active and seed the first task of its
    /// first challenge. This is the one call site that self-heals a missing
    /// progress aggregate. Seeding is idempotent and exempt from the
    /// active-task policy.
    pub fn start_path(&self, user_id: &str, path_id: &str) -> Result<PathStart> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let path = get_path_internal(&tx, path_id)?
                .ok_or_else(|| ApiError::path_not_found(path_id))?;

            if super::users::get_user_internal(&tx, user_id)?.is_none() {
                return Err(ApiError::user_not_found(user_id).into());
            }
            tx.execute(
                "INSERT OR IGNORE INTO user_progress (user_id, version, created_at, updated_at)
                 VALUES (?1, 0, ?2, ?2)",
                params![user_id, now_ms()],
            )?;

            let snapshot = snapshot_internal(&tx, user_id)?;
            if snapshot.active_paths.contains(path_id) {
                return Err(ApiError::path_already_active(path_id).into());
            }
            if snapshot.completed_paths.contains(path_id) {
                return Err(ApiError::already_completed(path_id).into());
            }

            tx.execute(
                "INSERT INTO user_active_paths (user_id, path_id, started_at) VALUES (?1, ?2, ?3)",
                params![user_id, path_id, now_ms()],
            )?;

            let challenge_ids = path_challenge_ids_internal(&tx, path_id)?;
            let mut first_task = None;

            match challenge_ids.first() {
                None => {
                    info!(path_id, user_id, "path started with no challenges");
                }
                Some(first_challenge) => {
                    let ordered = ordered_wrapper_ids_internal(&tx, first_challenge)?;
                    match ordered.first() {
                        None => {
                            info!(
                                path_id,
                                challenge_id = %first_challenge,
                                "path started; first challenge has no tasks"
                            );
                        }
                        Some(first_id) => {
                            if !snapshot.completed_tasks.contains(first_id) {
                                insert_active_task(&tx, user_id, first_id)?;
                            }
                            first_task = get_detail_internal(&tx, first_id)?;
                        }
                    }
                }
            }

            touch_aggregate_internal(&tx, user_id)?;
            tx.commit()?;

            info!(user_id, path_id, "path started");
            Ok(PathStart { path, first_task })
        })
    }

    /// Activate a task for a user.
    ///
    /// Checks, first failing one wins: wrapper exists, user exists, not
    /// already active, not already completed, predecessor completed, and the
    /// active-task policy.
    pub fn activate_task(
        &self,
        user_id: &str,
        task_wrapper_id: &str,
        policy: ActiveTaskPolicy,
    ) -> Result<TaskWrapperDetail> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let detail = get_detail_internal(&tx, task_wrapper_id)?
                .ok_or_else(|| ApiError::task_not_found(task_wrapper_id))?;

            ensure_aggregate_internal(&tx, user_id)?;
            let snapshot = snapshot_internal(&tx, user_id)?;

            if snapshot.active_tasks.contains(task_wrapper_id) {
                return Err(ApiError::already_active(task_wrapper_id).into());
            }
            if snapshot.completed_tasks.contains(task_wrapper_id) {
                return Err(ApiError::already_completed(task_wrapper_id).into());
            }

            let ordered = ordered_wrapper_ids_internal(&tx, &detail.challenge_id)?;
            let index = ordered
                .iter()
                .position(|id| id == task_wrapper_id)
                .ok_or_else(|| ApiError::task_not_found(task_wrapper_id))?;

            if !availability::is_available(&ordered, index, &snapshot.completed_tasks) {
                return Err(
                    ApiError::not_available(task_wrapper_id, &ordered[index - 1]).into(),
                );
            }

            if policy == ActiveTaskPolicy::Single {
                if let Some(active) = snapshot.active_tasks.iter().next() {
                    return Err(ApiError::another_task_active(active).into());
                }
            }

            insert_active_task(&tx, user_id, task_wrapper_id)?;
            touch_aggregate_internal(&tx, user_id)?;
            tx.commit()?;

            debug!(user_id, task_wrapper_id, "task activated");
            Ok(detail)
        })
    }

    /// Complete an active task: append the audit record, move the id from the
    /// active to the completed set, bump the user's streak, then auto-advance
    /// within the challenge or roll over into the next challenge of the
    /// containing path. Path completion is persisted in the same transaction.
    pub fn complete_task(
        &self,
        user_id: &str,
        task_wrapper_id: &str,
        content: &str,
    ) -> Result<CompletionOutcome> {
        if content.trim().is_empty() {
            return Err(ApiError::invalid_input("content", "submission content is required").into());
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let detail = get_detail_internal(&tx, task_wrapper_id)?
                .ok_or_else(|| ApiError::task_not_found(task_wrapper_id))?;

            ensure_aggregate_internal(&tx, user_id)?;
            let snapshot = snapshot_internal(&tx, user_id)?;

            if snapshot.completed_tasks.contains(task_wrapper_id) {
                return Err(ApiError::already_completed(task_wrapper_id).into());
            }
            if !snapshot.active_tasks.contains(task_wrapper_id) {
                return Err(ApiError::not_active(task_wrapper_id).into());
            }

            let now = now_ms();

            append_result(&tx, user_id, task_wrapper_id, Some(content), ResultKind::Completed)?;

            tx.execute(
                "DELETE FROM user_active_tasks WHERE user_id = ?1 AND task_wrapper_id = ?2",
                params![user_id, task_wrapper_id],
            )?;
            tx.execute(
                "INSERT INTO user_completed_tasks (user_id, task_wrapper_id, completed_at)
                 VALUES (?1, ?2, ?3)",
                params![user_id, task_wrapper_id, now],
            )?;

            tx.execute(
                "UPDATE users SET streak = streak + 1, last_active_at = ?1 WHERE id = ?2",
                params![now, user_id],
            )?;

            let mut completed_after = snapshot.completed_tasks.clone();
            completed_after.insert(task_wrapper_id.to_string());

            let ordered = ordered_wrapper_ids_internal(&tx, &detail.challenge_id)?;
            let index = ordered
                .iter()
                .position(|id| id == task_wrapper_id)
                .ok_or_else(|| ApiError::task_not_found(task_wrapper_id))?;

            let mut auto_activated = None;
            let mut challenge_complete = false;
            let mut completed_path_ids = Vec::new();

            if index + 1 < ordered.len() {
                // Successor within the challenge. Uniqueness is already
                // established, so the duplicate checks are bypassed here.
                let successor = &ordered[index + 1];
                if !snapshot.active_tasks.contains(successor)
                    && !completed_after.contains(successor)
                {
                    insert_active_task(&tx, user_id, successor)?;
                    auto_activated = get_detail_internal(&tx, successor)?;
                    debug!(user_id, successor = %successor, "auto-advanced to successor task");
                }
            } else {
                challenge_complete = ordered.iter().all(|id| completed_after.contains(id));

                if challenge_complete {
                    info!(user_id, challenge_id = %detail.challenge_id, "challenge completed");

                    for path_id in
                        paths_containing_challenge_internal(&tx, &detail.challenge_id)?
                    {
                        if !snapshot.active_paths.contains(&path_id) {
                            continue;
                        }

                        if auto_activated.is_none() {
                            auto_activated = rollover_into_next_challenge(
                                &tx,
                                user_id,
                                &path_id,
                                &detail.challenge_id,
                                &snapshot,
                                &completed_after,
                            )?;
                        }

                        let all_ids = path_wrapper_ids(&tx, &path_id)?;
                        let complete =
                            !all_ids.is_empty() && all_ids.iter().all(|id| completed_after.contains(id));
                        if complete {
                            tx.execute(
                                "DELETE FROM user_active_paths WHERE user_id = ?1 AND path_id = ?2",
                                params![user_id, &path_id],
                            )?;
                            tx.execute(
                                "INSERT OR IGNORE INTO user_completed_paths (user_id, path_id, completed_at)
                                 VALUES (?1, ?2, ?3)",
                                params![user_id, &path_id, now],
                            )?;
                            info!(user_id, path_id = %path_id, "path completed");
                            completed_path_ids.push(path_id);
                        }
                    }
                }
            }

            touch_aggregate_internal(&tx, user_id)?;
            tx.commit()?;

            info!(user_id, task_wrapper_id, "task completed");
            Ok(CompletionOutcome {
                task_wrapper_id: task_wrapper_id.to_string(),
                auto_activated,
                challenge_complete,
                completed_path_ids,
            })
        })
    }

    /// Skip an active task: record the reason and clear the task from the
    /// active set without completing it. The task stays eligible for
    /// re-activation since its predecessor remains completed.
    pub fn skip_task(&self, user_id: &str, task_wrapper_id: &str, reason: Option<&str>) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if get_detail_internal(&tx, task_wrapper_id)?.is_none() {
                return Err(ApiError::task_not_found(task_wrapper_id).into());
            }

            ensure_aggregate_internal(&tx, user_id)?;
            let snapshot = snapshot_internal(&tx, user_id)?;

            if snapshot.completed_tasks.contains(task_wrapper_id) {
                return Err(ApiError::already_completed(task_wrapper_id).into());
            }
            if !snapshot.active_tasks.contains(task_wrapper_id) {
                return Err(ApiError::not_active(task_wrapper_id).into());
            }

            append_result(&tx, user_id, task_wrapper_id, reason, ResultKind::Skipped)?;
            tx.execute(
                "DELETE FROM user_active_tasks WHERE user_id = ?1 AND task_wrapper_id = ?2",
                params![user_id, task_wrapper_id],
            )?;

            touch_aggregate_internal(&tx, user_id)?;
            tx.commit()?;

            info!(user_id, task_wrapper_id, "task skipped");
            Ok(())
        })
    }

    /// Audit records for a user, optionally filtered to one wrapper.
    /// Append-only; ordered oldest first.
    pub fn task_results(
        &self,
        user_id: &str,
        task_wrapper_id: Option<&str>,
    ) -> Result<Vec<TaskWrapperResult>> {
        self.with_conn(|conn| {
            let mut sql = String::from(
                "SELECT id, task_wrapper_id, user_id, content, result, created_at
                 FROM task_results WHERE user_id = ?1",
            );
            if task_wrapper_id.is_some() {
                sql.push_str(" AND task_wrapper_id = ?2");
            }
            sql.push_str(" ORDER BY id ASC");

            let mut stmt = conn.prepare(&sql)?;

            let parse = |row: &rusqlite::Row| -> rusqlite::Result<TaskWrapperResult> {
                let result_str: String = row.get("result")?;
                Ok(TaskWrapperResult {
                    id: row.get("id")?,
                    task_wrapper_id: row.get("task_wrapper_id")?,
                    user_id: row.get("user_id")?,
                    content: row.get("content")?,
                    result: ResultKind::from_str(&result_str).unwrap_or(ResultKind::Completed),
                    created_at: row.get("created_at")?,
                })
            };

            let results = match task_wrapper_id {
                Some(tw) => stmt
                    .query_map(params![user_id, tw], parse)?
                    .collect::<Result<Vec<_>, _>>()?,
                None => stmt
                    .query_map(params![user_id], parse)?
                    .collect::<Result<Vec<_>, _>>()?,
            };

            Ok(results)
        })
    }
}
