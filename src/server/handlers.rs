//! Route handlers
//!
//! Anything that touches the filesystem, the model or a subprocess runs on
//! the blocking pool.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{McpError, Result};
use crate::inference::{PredictionOutcome, PredictionRequest};
use crate::tools::ToolDescriptor;

use super::AppState;
use super::response::ApiError;

/// Body of the generic invoke routes
#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    pub name: String,
    #[serde(default, alias = "arguments")]
    pub parameters: Value,
}

async fn run_blocking<T, F>(work: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| McpError::Internal(format!("worker task failed: {}", e)))?
        .map_err(ApiError::from)
}

pub async fn index() -> &'static str {
    "Welcome to MCP App"
}

pub async fn version(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "version": state.version }))
}

pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolDescriptor>> {
    Json(state.dispatcher.list_tools().to_vec())
}

pub async fn invoke(
    State(state): State<AppState>,
    payload: std::result::Result<Json<InvokeRequest>, JsonRejection>,
) -> std::result::Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    tracing::info!(tool = %request.name, "invoke");
    let dispatcher = Arc::clone(&state.dispatcher);
    let result = run_blocking(move || dispatcher.invoke(&request.name, &request.parameters)).await?;
    Ok(Json(result))
}

/// `POST /tool/{name}` with the parameter object as the whole body
pub async fn invoke_named(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> std::result::Result<Json<Value>, ApiError> {
    let params = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| McpError::InvalidParameters(format!("malformed JSON body: {}", e)))?
    };
    tracing::info!(tool = %name, "invoke");
    let dispatcher = Arc::clone(&state.dispatcher);
    let result = run_blocking(move || dispatcher.invoke(&name, &params)).await?;
    Ok(Json(result))
}

pub async fn predict(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PredictionRequest>, JsonRejection>,
) -> std::result::Result<Json<PredictionOutcome>, ApiError> {
    let Json(request) = payload?;
    run_predict(state, request).await
}

/// `POST /inference/{token}`, only for the configured token
pub async fn predict_for_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
    payload: std::result::Result<Json<PredictionRequest>, JsonRejection>,
) -> std::result::Result<Json<PredictionOutcome>, ApiError> {
    if !token.eq_ignore_ascii_case(&state.token) {
        return Err(McpError::InvalidParameters(format!(
            "unsupported token '{}', this service predicts {}",
            token, state.token
        ))
        .into());
    }
    let Json(request) = payload?;
    run_predict(state, request).await
}

async fn run_predict(state: AppState, request: PredictionRequest) -> std::result::Result<Json<PredictionOutcome>, ApiError> {
    let inference = Arc::clone(&state.inference);
    let outcome = run_blocking(move || inference.predict(&request)).await?;
    tracing::debug!(
        prediction = outcome.prediction,
        low_variance = outcome.low_variance,
        "prediction served"
    );
    Ok(Json(outcome))
}

pub async fn reload(State(state): State<AppState>) -> std::result::Result<Json<Value>, ApiError> {
    let inference = Arc::clone(&state.inference);
    let loaded = run_blocking(move || inference.reload()).await?;
    tracing::info!(generation = loaded.generation, "model reloaded on request");
    Ok(Json(json!({
        "status": "reloaded",
        "generation": loaded.generation,
        "features": loaded.features,
    })))
}

pub async fn health(State(state): State<AppState>) -> std::result::Result<Json<Value>, ApiError> {
    let inference = Arc::clone(&state.inference);
    let model = run_blocking(move || Ok(inference.status())).await?;
    Ok(Json(json!({ "status": "ok", "version": state.version, "model": model })))
}
