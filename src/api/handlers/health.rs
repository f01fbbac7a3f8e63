//! Health, readiness and metrics handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::api::state::AppState;
use crate::error::ErrorCode;

/// Liveness check.
pub async fn health() -> Json<Value> {
    Json(json!({
        "code": 0,
        "message": "success",
        "data": {
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

/// Readiness check: whether the storage backend can serve requests.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let storage_ok = state.engine.storage().health_check().await.is_ok();

    let status_code = if storage_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = Json(json!({
        "code": if storage_ok { 0 } else { ErrorCode::SERVICE_UNAVAILABLE.as_i32() },
        "message": if storage_ok { "success" } else { "service unavailable" },
        "data": {
            "ready": storage_ok,
            "components": {
                "storage": {
                    "backend": state.engine.storage().backend_name(),
                    "healthy": storage_ok
                }
            }
        }
    }));

    (status_code, response)
}

/// Prometheus metrics endpoint.
pub async fn metrics(State(state): State<AppState>) -> String {
    let mut output = String::new();

    output.push_str("# HELP sequencing_up Whether the service is up\n");
    output.push_str("# TYPE sequencing_up gauge\n");
    output.push_str("sequencing_up 1\n");

    if let Some(handle) = &state.metrics {
        output.push_str(&handle.render());
    }

    output
}
