//! Router setup and configuration.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::api::handlers::{health, sequences};
use crate::api::middleware::auth::{require_admin, require_client};
use crate::api::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    // Health and metrics routes (no auth required)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/metrics", get(health::metrics));

    // Configuration and administrative routes (admin auth required)
    let admin_routes = Router::new()
        .route("/", get(sequences::list_sequences))
        .route(
            "/{name}",
            get(sequences::get_sequence)
                .put(sequences::upsert_sequence)
                .delete(sequences::delete_sequence),
        )
        .route("/{name}/state", get(sequences::sequence_state))
        .route("/{name}/reset", post(sequences::reset))
        .route("/{name}/override", post(sequences::override_value))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Generation routes (client or admin auth required)
    let client_routes = Router::new()
        .route("/{name}/generate", post(sequences::generate))
        .route("/{name}/preview", post(sequences::preview))
        .layer(middleware::from_fn_with_state(state.clone(), require_client));

    Router::new()
        .merge(health_routes)
        .nest(
            "/v1/scopes/{scope}/sequences",
            admin_routes.merge(client_routes),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, AuthConfig, FileStorageConfig};
    use crate::service::SequenceEngine;
    use crate::storage::LockSettings;
    use crate::storage::file::FileStorage;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn router(temp: &TempDir) -> Router {
        let config = AppConfig {
            auth: AuthConfig {
                admin_token: "admin".to_string(),
                client_tokens: vec!["client".to_string()],
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
        let engine = SequenceEngine::builder(Arc::new(storage)).build();
        create_router(AppState::new(Arc::new(config), engine))
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let temp = TempDir::new().unwrap();
        let response = router(&temp)
            .oneshot(request(Method::GET, "/health", None, ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_route_roles() {
        let temp = TempDir::new().unwrap();
        let app = router(&temp);
        let config = r#"{"pattern":"INV-{COUNTER}"}"#;

        let cases = [
            (Method::PUT, "/v1/scopes/acme/sequences/inv", Some("client"), config, StatusCode::FORBIDDEN),
            (Method::PUT, "/v1/scopes/acme/sequences/inv", Some("admin"), config, StatusCode::OK),
            (Method::GET, "/v1/scopes/acme/sequences", None, "", StatusCode::UNAUTHORIZED),
            (Method::GET, "/v1/scopes/acme/sequences", Some("admin"), "", StatusCode::OK),
            (Method::POST, "/v1/scopes/acme/sequences/inv/generate", Some("client"), "{}", StatusCode::OK),
            (Method::POST, "/v1/scopes/acme/sequences/inv/preview", Some("client"), "{}", StatusCode::OK),
            (Method::GET, "/v1/scopes/acme/sequences/inv/state", Some("client"), "", StatusCode::FORBIDDEN),
            (Method::GET, "/v1/scopes/acme/sequences/inv/state", Some("admin"), "", StatusCode::OK),
        ];

        for (method, uri, token, body, expected) in cases {
            let response = app
                .clone()
                .oneshot(request(method.clone(), uri, token, body))
                .await
                .unwrap();
            assert_eq!(response.status(), expected, "{method} {uri} {token:?}");
        }
    }

    async fn error_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_errors_share_one_envelope() {
        let temp = TempDir::new().unwrap();
        let app = router(&temp);
        let uri = "/v1/scopes/acme/sequences/inv";

        let cases = [
            (Method::PUT, uri, Some("admin"), "{\"pattern\":", StatusCode::BAD_REQUEST, 3001),
            (Method::PUT, uri, Some("admin"), "{\"step_size\":2}", StatusCode::BAD_REQUEST, 3001),
            (Method::POST, "/v1/scopes/acme/sequences/inv/generate", Some("client"), "[1,", StatusCode::BAD_REQUEST, 3001),
            (Method::GET, uri, None, "", StatusCode::UNAUTHORIZED, 2001),
            (Method::GET, uri, Some("nobody"), "", StatusCode::UNAUTHORIZED, 2001),
            (Method::GET, uri, Some("client"), "", StatusCode::FORBIDDEN, 2002),
        ];

        for (method, uri, token, body, status, code) in cases {
            let response = app
                .clone()
                .oneshot(request(method.clone(), uri, token, body))
                .await
                .unwrap();
            assert_eq!(response.status(), status, "{method} {uri} {body}");

            let body = error_body(response).await;
            assert_eq!(body["code"], code, "{body}");
            assert_eq!(body["retryable"], false);
            assert!(body["data"].is_null());
            assert!(body["message"].is_string());
        }
    }
}
