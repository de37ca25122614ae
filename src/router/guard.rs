//! Access-control checks run before a generated handler.

use crate::error::AppError;
use crate::router::CrudRequest;
use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use std::sync::Arc;

#[async_trait]
pub trait Guard: Send + Sync {
    /// Err rejects the request with that error; the handler never runs.
    async fn check(&self, request: &CrudRequest) -> Result<(), AppError>;
}

pub type SharedGuard = Arc<dyn Guard>;

/// Run guards in registration order, stopping at the first rejection.
pub async fn run_guards(guards: &[SharedGuard], request: &CrudRequest) -> Result<(), AppError> {
    for guard in guards {
        guard.check(request).await?;
    }
    Ok(())
}

/// Requires `Authorization: Bearer <token>` matching a fixed token.
#[derive(Clone)]
pub struct BearerTokenGuard {
    token: String,
}

impl BearerTokenGuard {
    pub fn new(token: impl Into<String>) -> Self {
        BearerTokenGuard { token: token.into() }
    }

    pub fn shared(token: impl Into<String>) -> SharedGuard {
        Arc::new(Self::new(token))
    }
}

#[async_trait]
impl Guard for BearerTokenGuard {
    async fn check(&self, request: &CrudRequest) -> Result<(), AppError> {
        let presented = request
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;
        if presented != self.token {
            return Err(AppError::Forbidden("invalid token".into()));
        }
        Ok(())
    }
}
