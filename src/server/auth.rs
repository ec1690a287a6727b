//! Bearer-token authentication middleware.
//!
//! Token mechanics stay behind the `Authenticator` trait; the middleware only
//! extracts the bearer credential and fails closed with 401.

use crate::db::Database;
use crate::error::ApiError;
use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

/// A verified user identity resolved from an opaque credential.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub name: String,
}

/// Resolves an opaque bearer credential to a verified identity.
/// Absence or invalidity yields `None`; the middleware maps that to 401.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<Option<Identity>>;
}

/// Authenticator backed by the sessions table.
pub struct SessionAuth {
    db: Database,
}

impl SessionAuth {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Authenticator for SessionAuth {
    async fn authenticate(&self, token: &str) -> Result<Option<Identity>> {
        let user = self.db.resolve_session(token)?;
        Ok(user.map(|u| Identity {
            user_id: u.id,
            email: u.email,
            name: u.name,
        }))
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Middleware requiring a valid bearer token; inserts `Identity` into
/// request extensions for handlers.
pub async fn require_auth(
    State(auth): State<Arc<dyn Authenticator>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request).ok_or_else(ApiError::unauthenticated)?;

    let identity = auth
        .authenticate(token)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(ApiError::unauthenticated)?;

    debug!(user_id = %identity.user_id, "request authenticated");
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
