//! HTTP API surface.
//!
//! Thin glue over the progression engines: routing, auth middleware, and
//! error mapping. All progression semantics live in the db layer.

pub mod auth;
mod handlers;

use crate::config::ActiveTaskPolicy;
use crate::conversation::Conversation;
use crate::db::Database;
use crate::error::ApiError;
use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use auth::Authenticator;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub policy: ActiveTaskPolicy,
    pub auth: Arc<dyn Authenticator>,
    pub conversation: Arc<dyn Conversation>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // StorageFailure surfaces as a generic internal error; the details
        // field stays in the server log, not the response.
        let body = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(code = ?self.code, details = ?self.details, "internal error");
            Json(serde_json::json!({
                "error": { "code": self.code, "message": "Internal error" }
            }))
        } else {
            Json(serde_json::json!({ "error": self }))
        };

        (status, body).into_response()
    }
}

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/paths", get(handlers::list_paths))
        .route("/api/paths/{path_id}/start", post(handlers::start_path))
        .route("/api/paths/{path_id}/progress", get(handlers::path_progress))
        .route("/api/tasks/{task_wrapper_id}/activate", post(handlers::activate_task))
        .route("/api/tasks/{task_wrapper_id}/complete", post(handlers::complete_task))
        .route("/api/tasks/{task_wrapper_id}/skip", post(handlers::skip_task))
        .route("/api/challenges/{challenge_id}/tasks", get(handlers::challenge_tasks))
        .route("/api/apostles/{apostle_id}/messages", post(handlers::apostle_message))
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/healthz", get(handlers::health))
        .route("/api/users", post(handlers::register_user))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

/// Serve the API until the process is stopped.
pub async fn serve(listen: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(listen, "guidepost API listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
