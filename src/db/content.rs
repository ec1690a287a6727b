//! Content-authoring CRUD: virtues, apostles, tasks, challenges, paths.
//!
//! Content is static once created; per-user status never lives here.

use super::{now_ms, Database};
use crate::error::ApiError;
use crate::types::{Apostle, Challenge, Path, Task, TaskWrapper, TaskWrapperDetail, Virtue};
use anyhow::Result;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

fn parse_apostle_row(row: &Row) -> rusqlite::Result<Apostle> {
    Ok(Apostle {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        tone: row.get("tone")?,
        virtue_id: row.get("virtue_id")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_challenge_row(row: &Row) -> rusqlite::Result<Challenge> {
    Ok(Challenge {
        id: row.get("id")?,
        apostle_id: row.get("apostle_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_path_row(row: &Row) -> rusqlite::Result<Path> {
    Ok(Path {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_detail_row(row: &Row) -> rusqlite::Result<TaskWrapperDetail> {
    Ok(TaskWrapperDetail {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        challenge_id: row.get("challenge_id")?,
        position: row.get("position")?,
        name: row.get("name")?,
        description: row.get("description")?,
        apostle_id: row.get("apostle_id")?,
    })
}

const DETAIL_SELECT: &str = "SELECT tw.id, tw.task_id, tw.challenge_id, tw.position,
        t.name, t.description, COALESCE(tw.apostle_id, c.apostle_id) AS apostle_id
     FROM task_wrappers tw
     JOIN tasks t ON t.id = tw.task_id
     JOIN challenges c ON c.id = tw.challenge_id";

/// Fetch a wrapper joined with its task content using an existing connection.
pub(crate) fn get_detail_internal(
    conn: &Connection,
    task_wrapper_id: &str,
) -> Result<Option<TaskWrapperDetail>> {
    let sql = format!("{} WHERE tw.id = ?1", DETAIL_SELECT);
    let result = conn.query_row(&sql, params![task_wrapper_id], parse_detail_row);

    match result {
        Ok(detail) => Ok(Some(detail)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Ordered wrapper ids for a challenge, unlock precedence order.
pub(crate) fn ordered_wrapper_ids_internal(
    conn: &Connection,
    challenge_id: &str,
) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT id FROM task_wrappers WHERE challenge_id = ?1 ORDER BY position ASC",
    )?;
    let ids = stmt
        .query_map(params![challenge_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

/// Ordered challenge ids for a path.
pub(crate) fn path_challenge_ids_internal(conn: &Connection, path_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT challenge_id FROM path_challenges WHERE path_id = ?1 ORDER BY position ASC",
    )?;
    let ids = stmt
        .query_map(params![path_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

/// Paths containing a challenge, in stable id order.
pub(crate) fn paths_containing_challenge_internal(
    conn: &Connection,
    challenge_id: &str,
) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT path_id FROM path_challenges WHERE challenge_id = ?1 ORDER BY path_id ASC",
    )?;
    let ids = stmt
        .query_map(params![challenge_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

pub(crate) fn get_path_internal(conn: &Connection, path_id: &str) -> Result<Option<Path>> {
    let result = conn.query_row(
        "SELECT id, name, description, created_at FROM paths WHERE id = ?1",
        params![path_id],
        parse_path_row,
    );

    match result {
        Ok(path) => Ok(Some(path)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Database {
    /// Create a virtue (static reference data).
    pub fn create_virtue(&self, name: &str, description: Option<&str>) -> Result<Virtue> {
        let id = Uuid::now_v7().to_string();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO virtues (id, name, description) VALUES (?1, ?2, ?3)",
                params![&id, name, description],
            )?;
            Ok(Virtue {
                id: id.clone(),
                name: name.to_string(),
                description: description.map(str::to_string),
            })
        })
    }

    /// Create an apostle persona.
    pub fn create_apostle(
        &self,
        name: &str,
        description: Option<&str>,
        tone: Option<&str>,
        virtue_id: Option<&str>,
    ) -> Result<Apostle> {
        let id = Uuid::now_v7().to_string();
        let now = now_ms();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO apostles (id, name, description, tone, virtue_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![&id, name, description, tone, virtue_id, now],
            )?;
            Ok(Apostle {
                id: id.clone(),
                name: name.to_string(),
                description: description.map(str::to_string),
                tone: tone.map(str::to_string),
                virtue_id: virtue_id.map(str::to_string),
                created_at: now,
            })
        })
    }

    /// Get an apostle by id.
    pub fn get_apostle(&self, apostle_id: &str) -> Result<Option<Apostle>> {
        self.with_conn(|conn| {
            let result = conn.query_row(
                "SELECT id, name, description, tone, virtue_id, created_at
                 FROM apostles WHERE id = ?1",
                params![apostle_id],
                parse_apostle_row,
            );

            match result {
                Ok(apostle) => Ok(Some(apostle)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Create static task content.
    pub fn create_task(&self, name: &str, description: Option<&str>) -> Result<Task> {
        let id = Uuid::now_v7().to_string();
        let now = now_ms();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![&id, name, description, now],
            )?;
            Ok(Task {
                id: id.clone(),
                name: name.to_string(),
                description: description.map(str::to_string),
                created_at: now,
            })
        })
    }

    /// Create a challenge owned by an apostle.
    pub fn create_challenge(
        &self,
        apostle_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Challenge> {
        let id = Uuid::now_v7().to_string();
        let now = now_ms();
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT 1 FROM apostles WHERE id = ?1",
                params![apostle_id],
                |_| Ok(()),
            );
            match exists {
                Ok(()) => {}
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    return Err(ApiError::apostle_not_found(apostle_id).into());
                }
                Err(e) => return Err(e.into()),
            }

            conn.execute(
                "INSERT INTO challenges (id, apostle_id, name, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![&id, apostle_id, name, description, now],
            )?;
            Ok(Challenge {
                id: id.clone(),
                apostle_id: apostle_id.to_string(),
                name: name.to_string(),
                description: description.map(str::to_string),
                created_at: now,
            })
        })
    }

    /// Append a task to the end of a challenge's ordered sequence.
    pub fn add_task_to_challenge(
        &self,
        challenge_id: &str,
        task_id: &str,
        apostle_override: Option<&str>,
    ) -> Result<TaskWrapper> {
        let id = Uuid::now_v7().to_string();
        let now = now_ms();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let position: i32 = tx.query_row(
                "SELECT COUNT(*) FROM task_wrappers WHERE challenge_id = ?1",
                params![challenge_id],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO task_wrappers (id, task_id, challenge_id, position, apostle_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![&id, task_id, challenge_id, position, apostle_override, now],
            )?;

            tx.commit()?;

            Ok(TaskWrapper {
                id: id.clone(),
                task_id: task_id.to_string(),
                challenge_id: challenge_id.to_string(),
                position,
                apostle_id: apostle_override.map(str::to_string),
                created_at: now,
            })
        })
    }

    /// Create a path (curriculum grouping).
    pub fn create_path(&self, name: &str, description: Option<&str>) -> Result<Path> {
        let id = Uuid::now_v7().to_string();
        let now = now_ms();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO paths (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![&id, name, description, now],
            )?;
            Ok(Path {
                id: id.clone(),
                name: name.to_string(),
                description: description.map(str::to_string),
                created_at: now,
            })
        })
    }

    /// Append a challenge to the end of a path's challenge sequence.
    pub fn add_challenge_to_path(&self, path_id: &str, challenge_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let position: i32 = tx.query_row(
                "SELECT COUNT(*) FROM path_challenges WHERE path_id = ?1",
                params![path_id],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO path_challenges (path_id, challenge_id, position) VALUES (?1, ?2, ?3)",
                params![path_id, challenge_id, position],
            )?;

            tx.commit()?;
            Ok(())
        })
    }

    /// Get a path by id.
    pub fn get_path(&self, path_id: &str) -> Result<Option<Path>> {
        self.with_conn(|conn| get_path_internal(conn, path_id))
    }

    /// List all paths, newest first.
    pub fn list_paths(&self) -> Result<Vec<Path>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, created_at FROM paths ORDER BY created_at DESC",
            )?;
            let paths = stmt
                .query_map([], parse_path_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(paths)
        })
    }

    /// Get a challenge by id.
    pub fn get_challenge(&self, challenge_id: &str) -> Result<Option<Challenge>> {
        self.with_conn(|conn| {
            let result = conn.query_row(
                "SELECT id, apostle_id, name, description, created_at
                 FROM challenges WHERE id = ?1",
                params![challenge_id],
                parse_challenge_row,
            );

            match result {
                Ok(challenge) => Ok(Some(challenge)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Get a task wrapper joined with its task content.
    pub fn get_task_wrapper(&self, task_wrapper_id: &str) -> Result<Option<TaskWrapperDetail>> {
        self.with_conn(|conn| get_detail_internal(conn, task_wrapper_id))
    }

    /// Ordered wrapper ids for a challenge.
    pub fn ordered_wrapper_ids(&self, challenge_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| ordered_wrapper_ids_internal(conn, challenge_id))
    }

    /// Ordered wrapper details for a challenge.
    pub fn challenge_task_details(&self, challenge_id: &str) -> Result<Vec<TaskWrapperDetail>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE tw.challenge_id = ?1 ORDER BY tw.position ASC",
                DETAIL_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let details = stmt
                .query_map(params![challenge_id], parse_detail_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(details)
        })
    }
}
