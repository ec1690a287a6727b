//! Core types for the guidepost backend.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A skill ("virtue") referenced by apostles. Static reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Virtue {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// A themed mentor persona. Owns challenges and supplies conversational tone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Apostle {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub tone: Option<String>,
    pub virtue_id: Option<String>,
    pub created_at: i64,
}

/// Static task content. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
}

/// A task instance positioned inside exactly one challenge.
/// Content is static; per-user status lives in the progress sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskWrapper {
    pub id: String,
    pub task_id: String,
    pub challenge_id: String,
    pub position: i32,
    /// Optional per-wrapper apostle override.
    pub apostle_id: Option<String>,
    pub created_at: i64,
}

/// A task wrapper joined with its task content, for confirmation messaging
/// and list views. `apostle_id` is the effective apostle (wrapper override
/// falling back to the challenge owner).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskWrapperDetail {
    pub id: String,
    pub task_id: String,
    pub challenge_id: String,
    pub position: i32,
    pub name: String,
    pub description: Option<String>,
    pub apostle_id: String,
}

/// An ordered sequence of task wrappers owned by one apostle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub apostle_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
}

/// A named curriculum grouping challenges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Path {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
}

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub streak: i64,
    pub last_active_at: Option<i64>,
    pub created_at: i64,
}

/// Per-user progression sets, read as one consistent snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub active_tasks: HashSet<String>,
    pub completed_tasks: HashSet<String>,
    pub active_paths: HashSet<String>,
    pub completed_paths: HashSet<String>,
}

/// Outcome kind recorded in the task results audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Completed,
    Skipped,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultKind::Completed => "completed",
            ResultKind::Skipped => "skipped",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(ResultKind::Completed),
            "skipped" => Some(ResultKind::Skipped),
            _ => None,
        }
    }
}

/// Append-only audit record of a completion or skip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskWrapperResult {
    pub id: i64,
    pub task_wrapper_id: String,
    pub user_id: String,
    pub content: Option<String>,
    pub result: ResultKind,
    pub created_at: i64,
}

/// Per-user, per-wrapper progression state. `Locked` and `Available` are
/// derived on read via the availability resolver, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Locked,
    Available,
    Active,
    Completed,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Locked => "locked",
            TaskState::Available => "available",
            TaskState::Active => "active",
            TaskState::Completed => "completed",
        }
    }
}

/// A wrapper with its derived per-user state, for challenge list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStateView {
    #[serde(flatten)]
    pub task: TaskWrapperDetail,
    pub state: TaskState,
}

/// Result of starting a path: the path plus the first unlocked task, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathStart {
    pub path: Path,
    pub first_task: Option<TaskWrapperDetail>,
}

/// Result of completing a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub task_wrapper_id: String,
    /// Successor activated by auto-advance or cross-challenge rollover.
    pub auto_activated: Option<TaskWrapperDetail>,
    /// True when the completed task was the last outstanding one in its challenge.
    pub challenge_complete: bool,
    /// Paths whose full wrapper set is now covered, moved to the completed set.
    pub completed_path_ids: Vec<String>,
}

/// Per-user completion ratio for a path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathProgress {
    pub path_id: String,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub percent: f64,
    pub complete: bool,
}
