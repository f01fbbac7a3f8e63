//! Sequence handlers: configuration, generation, preview and admin changes.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::api::extractors::ApiJson;
use crate::api::state::AppState;
use crate::domain::{
    ApiResponse, ConfigSummary, CounterChangeResponse, GenerateRequest, GeneratedNumber,
    ListConfigResponse, OverrideRequest, PreviewResponse, ResetRequest, SequenceConfig,
    SequenceKey, SequenceStateResponse, UpsertConfigRequest,
};
use crate::error::{AppError, Result};

/// Query parameters for deleting a sequence.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    /// Who is deleting.
    pub actor: Option<String>,
}

fn sequence_key(scope: String, name: String) -> Result<SequenceKey> {
    SequenceKey::new(scope, name).map_err(AppError::Validation)
}

/// List the sequences of a scope.
///
/// # Errors
///
/// Returns an error if the scope id is invalid or storage fails.
pub async fn list_sequences(
    State(state): State<AppState>,
    Path(scope): Path<String>,
) -> Result<Json<ApiResponse<ListConfigResponse>>> {
    let configs = state.engine.list_configs(&scope).await?;
    let items = configs.iter().map(ConfigSummary::from).collect();

    Ok(Json(ApiResponse::success(ListConfigResponse {
        scope_id: scope,
        items,
    })))
}

/// Create or replace a sequence configuration.
///
/// # Errors
///
/// Returns an error if the pattern or a field is invalid, or storage fails.
pub async fn upsert_sequence(
    State(state): State<AppState>,
    Path((scope, name)): Path<(String, String)>,
    ApiJson(request): ApiJson<UpsertConfigRequest>,
) -> Result<Json<ApiResponse<SequenceConfig>>> {
    let key = sequence_key(scope, name)?;
    let config = state.engine.create_or_update_config(&key, request).await?;
    Ok(Json(ApiResponse::success(config)))
}

/// Get a sequence configuration.
///
/// # Errors
///
/// Returns an error if the sequence is not configured.
pub async fn get_sequence(
    State(state): State<AppState>,
    Path((scope, name)): Path<(String, String)>,
) -> Result<Json<ApiResponse<SequenceConfig>>> {
    let key = sequence_key(scope, name)?;
    let config = state.engine.get_config(&key).await?;
    Ok(Json(ApiResponse::success(config)))
}

/// Delete a sequence and its counter.
///
/// # Errors
///
/// Returns an error if the sequence is not configured.
pub async fn delete_sequence(
    State(state): State<AppState>,
    Path((scope, name)): Path<(String, String)>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<ApiResponse<()>>> {
    let key = sequence_key(scope, name)?;
    state.engine.delete_config(&key, query.actor).await?;
    Ok(Json(ApiResponse::ok()))
}

/// Current counter and reset status.
///
/// # Errors
///
/// Returns an error if the sequence is not configured.
pub async fn sequence_state(
    State(state): State<AppState>,
    Path((scope, name)): Path<(String, String)>,
) -> Result<Json<ApiResponse<SequenceStateResponse>>> {
    let key = sequence_key(scope, name)?;
    let response = state.engine.state(&key).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Issue the next number. The body is optional.
///
/// # Errors
///
/// Returns an error if the sequence is not configured, the row lock times
/// out, or the number cannot be formatted.
pub async fn generate(
    State(state): State<AppState>,
    Path((scope, name)): Path<(String, String)>,
    request: Option<ApiJson<GenerateRequest>>,
) -> Result<Json<ApiResponse<GeneratedNumber>>> {
    let key = sequence_key(scope, name)?;
    let context = request.map(|ApiJson(r)| r.context).unwrap_or_default();
    let number = state.engine.generate(&key, &context).await?;
    Ok(Json(ApiResponse::success(number)))
}

/// Preview the next number without consuming it. The body is optional.
///
/// # Errors
///
/// Returns an error if the sequence is not configured.
pub async fn preview(
    State(state): State<AppState>,
    Path((scope, name)): Path<(String, String)>,
    request: Option<ApiJson<GenerateRequest>>,
) -> Result<Json<ApiResponse<PreviewResponse>>> {
    let key = sequence_key(scope, name)?;
    let context = request.map(|ApiJson(r)| r.context).unwrap_or_default();
    let response = state.engine.preview(&key, &context).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Reset a counter to its base.
///
/// # Errors
///
/// Returns an error if the reason is empty or the sequence is not configured.
pub async fn reset(
    State(state): State<AppState>,
    Path((scope, name)): Path<(String, String)>,
    ApiJson(request): ApiJson<ResetRequest>,
) -> Result<Json<ApiResponse<CounterChangeResponse>>> {
    let key = sequence_key(scope, name)?;
    let transition = state
        .engine
        .reset(&key, &request.reason, request.actor)
        .await?;
    Ok(Json(ApiResponse::success(transition.into())))
}

/// Force a counter to a value.
///
/// # Errors
///
/// Returns an error if the reason is empty or the sequence is not configured.
pub async fn override_value(
    State(state): State<AppState>,
    Path((scope, name)): Path<(String, String)>,
    ApiJson(request): ApiJson<OverrideRequest>,
) -> Result<Json<ApiResponse<CounterChangeResponse>>> {
    let key = sequence_key(scope, name)?;
    let transition = state
        .engine
        .override_value(&key, request.value, &request.reason, request.actor)
        .await?;
    Ok(Json(ApiResponse::success(transition.into())))
}
