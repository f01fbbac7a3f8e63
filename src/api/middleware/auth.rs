//! Authentication middleware.
//!
//! Two roles: the admin token may do everything, client tokens may only
//! generate and preview.

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use crate::api::state::AppState;
use crate::error::AppError;

/// Caller role resolved from the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// Holder of the admin token.
    Admin,
    /// Holder of a client token.
    Client,
}

/// Extract bearer token from Authorization header.
fn extract_bearer_token(req: &Request<Body>) -> Option<&str> {
    let auth_header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;

    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
}

/// Role of `token`, if it is known.
fn resolve_role(state: &AppState, token: &str) -> Option<Role> {
    let auth = &state.config.auth;
    if !auth.admin_token.is_empty() && token == auth.admin_token {
        return Some(Role::Admin);
    }
    auth.client_tokens
        .iter()
        .any(|t| !t.is_empty() && t == token)
        .then_some(Role::Client)
}

fn authenticate(state: &AppState, req: &Request<Body>) -> Result<Role, AppError> {
    extract_bearer_token(req)
        .and_then(|token| resolve_role(state, token))
        .ok_or(AppError::Unauthorized)
}

/// Middleware that requires the admin token.
///
/// # Errors
///
/// [`AppError::Unauthorized`] without a known token, [`AppError::Forbidden`]
/// for a client token.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    match authenticate(&state, &req)? {
        Role::Admin => Ok(next.run(req).await),
        Role::Client => Err(AppError::Forbidden),
    }
}

/// Middleware that requires a client or admin token.
///
/// # Errors
///
/// [`AppError::Unauthorized`] without a known token.
pub async fn require_client(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    authenticate(&state, &req)?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, AuthConfig, FileStorageConfig};
    use crate::service::SequenceEngine;
    use crate::storage::LockSettings;
    use crate::storage::file::FileStorage;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn state(temp: &TempDir) -> AppState {
        let config = AppConfig {
            auth: AuthConfig {
                admin_token: "admin-secret".to_string(),
                client_tokens: vec!["client-a".to_string(), String::new()],
            },
            ..AppConfig::default()
        };
        let storage = FileStorage::new(
            &FileStorageConfig {
                data_dir: temp.path().to_path_buf(),
            },
            LockSettings::default(),
        )
        .unwrap();
        AppState::new(
            Arc::new(config),
            SequenceEngine::builder(Arc::new(storage)).build(),
        )
    }

    #[test]
    fn test_resolve_role() {
        let temp = TempDir::new().unwrap();
        let state = state(&temp);
        assert_eq!(resolve_role(&state, "admin-secret"), Some(Role::Admin));
        assert_eq!(resolve_role(&state, "client-a"), Some(Role::Client));
        assert_eq!(resolve_role(&state, "client-b"), None);
        assert_eq!(resolve_role(&state, ""), None);
    }

    #[test]
    fn test_unknown_token_is_unauthorized() {
        let temp = TempDir::new().unwrap();
        let state = state(&temp);

        for header in [None, Some("Bearer client-b"), Some("Basic admin-secret")] {
            let mut builder = Request::builder();
            if let Some(value) = header {
                builder = builder.header(AUTHORIZATION, value);
            }
            let req = builder.body(Body::empty()).unwrap();
            assert!(matches!(authenticate(&state, &req), Err(AppError::Unauthorized)));
        }

        let req = Request::builder()
            .header(AUTHORIZATION, "bearer client-a")
            .body(Body::empty())
            .unwrap();
        assert_eq!(authenticate(&state, &req).unwrap(), Role::Client);
    }

    #[test]
    fn test_extract_bearer_token() {
        let req = Request::builder()
            .header(AUTHORIZATION, "Bearer abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_bearer_token(&req), Some("abc"));

        let req = Request::builder()
            .header(AUTHORIZATION, "Basic abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_bearer_token(&req), None);
    }
}
