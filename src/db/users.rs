//! User accounts, sessions, and the per-user progress aggregate.

use super::{now_ms, Database};
use crate::error::ApiError;
use crate::types::{ProgressSnapshot, User};
use anyhow::Result;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

fn parse_user_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        name: row.get("name")?,
        streak: row.get("streak")?,
        last_active_at: row.get("last_active_at")?,
        created_at: row.get("created_at")?,
    })
}

pub(crate) fn get_user_internal(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, email, name, streak, last_active_at, created_at FROM users WHERE id = ?1",
        params![user_id],
        parse_user_row,
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Verify the user and their progress aggregate exist.
///
/// The aggregate is created eagerly at registration, so a missing row here is
/// a fatal `UserNotFound` on every path except `start_path`, which self-heals.
pub(crate) fn ensure_aggregate_internal(conn: &Connection, user_id: &str) -> Result<()> {
    let result = conn.query_row(
        "SELECT 1 FROM user_progress WHERE user_id = ?1",
        params![user_id],
        |_| Ok(()),
    );

    match result {
        Ok(()) => Ok(()),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            Err(ApiError::user_not_found(user_id).into())
        }
        Err(e) => Err(e.into()),
    }
}

fn set_query(conn: &Connection, sql: &str, user_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map(params![user_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

/// Read the four progression sets as one snapshot on an existing connection.
pub(crate) fn snapshot_internal(conn: &Connection, user_id: &str) -> Result<ProgressSnapshot> {
    let active_tasks =
        set_query(conn, "SELECT task_wrapper_id FROM user_active_tasks WHERE user_id = ?1", user_id)?;
    let completed_tasks = set_query(
        conn,
        "SELECT task_wrapper_id FROM user_completed_tasks WHERE user_id = ?1",
        user_id,
    )?;
    let active_paths =
        set_query(conn, "SELECT path_id FROM user_active_paths WHERE user_id = ?1", user_id)?;
    let completed_paths =
        set_query(conn, "SELECT path_id FROM user_completed_paths WHERE user_id = ?1", user_id)?;

    Ok(ProgressSnapshot {
        active_tasks: active_tasks.into_iter().collect(),
        completed_tasks: completed_tasks.into_iter().collect(),
        active_paths: active_paths.into_iter().collect(),
        completed_paths: completed_paths.into_iter().collect(),
    })
}

/// Bump the aggregate version inside a mutating transaction.
pub(crate) fn touch_aggregate_internal(conn: &Connection, user_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE user_progress SET version = version + 1, updated_at = ?1 WHERE user_id = ?2",
        params![now_ms(), user_id],
    )?;
    Ok(())
}

impl Database {
    /// Register a user. The progress aggregate is created in the same
    /// transaction, so no later call site needs to lazily create it.
    pub fn register_user(&self, email: &str, name: &str) -> Result<User> {
        if email.trim().is_empty() {
            return Err(ApiError::invalid_input("email", "email is required").into());
        }
        if name.trim().is_empty() {
            return Err(ApiError::invalid_input("name", "name is required").into());
        }

        let id = Uuid::now_v7().to_string();
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO users (id, email, name, streak, created_at) VALUES (?1, ?2, ?3, 0, ?4)",
                params![&id, email, name, now],
            )?;
            tx.execute(
                "INSERT INTO user_progress (user_id, version, created_at, updated_at)
                 VALUES (?1, 0, ?2, ?2)",
                params![&id, now],
            )?;

            tx.commit()?;

            Ok(User {
                id: id.clone(),
                email: email.to_string(),
                name: name.to_string(),
                streak: 0,
                last_active_at: None,
                created_at: now,
            })
        })
    }

    /// Get a user by id.
    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| get_user_internal(conn, user_id))
    }

    /// Issue an opaque session token for a user.
    pub fn create_session(&self, user_id: &str) -> Result<String> {
        let token = Uuid::now_v7().to_string();
        self.with_conn(|conn| {
            if get_user_internal(conn, user_id)?.is_none() {
                return Err(ApiError::user_not_found(user_id).into());
            }
            conn.execute(
                "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
                params![&token, user_id, now_ms()],
            )?;
            Ok(token.clone())
        })
    }

    /// Resolve a session token to its user. None for unknown tokens.
    pub fn resolve_session(&self, token: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let user_id: Option<String> = conn
                .query_row(
                    "SELECT user_id FROM sessions WHERE token = ?1",
                    params![token],
                    |row| row.get(0),
                )
                .ok();

            match user_id {
                Some(user_id) => get_user_internal(conn, &user_id),
                None => Ok(None),
            }
        })
    }

    /// Read the user's progression sets. Unlocked read for display; tolerates
    /// eventual consistency with the last committed write.
    pub fn progress_snapshot(&self, user_id: &str) -> Result<ProgressSnapshot> {
        self.with_conn(|conn| {
            ensure_aggregate_internal(conn, user_id)?;
            snapshot_internal(conn, user_id)
        })
    }
}
