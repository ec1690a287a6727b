//! Structured error types for API responses.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (4xx-like)
    InvalidInput,

    // Not found errors
    PathNotFound,
    TaskNotFound,
    UserNotFound,
    ApostleNotFound,

    // Progression conflicts
    AlreadyActive,
    AlreadyCompleted,
    NotActive,
    NotAvailable,

    // Auth
    Unauthenticated,

    // Internal errors
    StorageFailure,
    Internal,
}

impl ErrorCode {
    /// HTTP status the code maps to at the service surface.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::InvalidInput => 400,
            ErrorCode::Unauthenticated => 401,
            ErrorCode::PathNotFound
            | ErrorCode::TaskNotFound
            | ErrorCode::UserNotFound
            | ErrorCode::ApostleNotFound => 404,
            ErrorCode::AlreadyActive
            | ErrorCode::AlreadyCompleted
            | ErrorCode::NotActive
            | ErrorCode::NotAvailable => 409,
            ErrorCode::StorageFailure | ErrorCode::Internal => 500,
        }
    }
}

/// Structured error for API responses.
#[derive(Debug, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn invalid_input(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidInput, reason).with_field(field)
    }

    pub fn path_not_found(path_id: &str) -> Self {
        Self::new(
            ErrorCode::PathNotFound,
            format!("Path not found: {}", path_id),
        )
    }

    pub fn task_not_found(task_wrapper_id: &str) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_wrapper_id),
        )
    }

    pub fn user_not_found(user_id: &str) -> Self {
        Self::new(
            ErrorCode::UserNotFound,
            format!("User not found: {}", user_id),
        )
    }

    pub fn apostle_not_found(apostle_id: &str) -> Self {
        Self::new(
            ErrorCode::ApostleNotFound,
            format!("Apostle not found: {}", apostle_id),
        )
    }

    pub fn already_active(task_wrapper_id: &str) -> Self {
        Self::new(
            ErrorCode::AlreadyActive,
            format!("Task {} is already active", task_wrapper_id),
        )
    }

    pub fn another_task_active(active_id: &str) -> Self {
        Self::new(
            ErrorCode::AlreadyActive,
            format!("Another task is already active: {}", active_id),
        )
    }

    pub fn path_already_active(path_id: &str) -> Self {
        Self::new(
            ErrorCode::AlreadyActive,
            format!("Path {} is already active", path_id),
        )
    }

    pub fn already_completed(id: &str) -> Self {
        Self::new(
            ErrorCode::AlreadyCompleted,
            format!("{} is already completed", id),
        )
    }

    pub fn not_active(task_wrapper_id: &str) -> Self {
        Self::new(
            ErrorCode::NotActive,
            format!(
                "Task {} must be activated before completing",
                task_wrapper_id
            ),
        )
    }

    pub fn not_available(task_wrapper_id: &str, predecessor_id: &str) -> Self {
        Self::new(
            ErrorCode::NotAvailable,
            format!(
                "Task {} is locked until {} is completed",
                task_wrapper_id, predecessor_id
            ),
        )
    }

    pub fn unauthenticated() -> Self {
        Self::new(ErrorCode::Unauthenticated, "Authentication required")
    }

    pub fn storage(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::StorageFailure, "Internal storage error")
            .with_details(err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::Internal, err.to_string())
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        // Try to downcast to ApiError first
        match err.downcast::<ApiError>() {
            Ok(api_err) => api_err,
            Err(err) => match err.downcast::<rusqlite::Error>() {
                Ok(db_err) => ApiError::storage(db_err),
                Err(err) => ApiError::internal(err),
            },
        }
    }
}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
