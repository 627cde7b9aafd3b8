//! HTTP surface
//!
//! Routes:
//! - `GET /`, `GET /tools`, `GET /version`, `GET /mcp/version`, `GET /health`
//! - `POST /invoke`, `/invoke-tool`, `/call_tool` with `{name, parameters}`
//! - `POST /tool/{name}` with the parameters as the body
//! - `POST /predict`, `POST /inference/{token}`, `POST /reload`

mod handlers;
mod response;

pub use handlers::InvokeRequest;
pub use response::ApiError;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use tokio::net::TcpListener;

use crate::config::Config;
use crate::error::Result;
use crate::inference::InferenceService;
use crate::tools::ToolDispatcher;
use crate::version::current_version_tag;

/// Shared handles passed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub dispatcher: Arc<ToolDispatcher>,
    pub inference: Arc<InferenceService>,
    pub version: String,
    /// Asset this instance predicts, compared case-insensitively
    pub token: String,
}

impl AppState {
    pub fn new(
        dispatcher: Arc<ToolDispatcher>,
        inference: Arc<InferenceService>,
        version: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            inference,
            version: version.into(),
            token: token.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(ToolDispatcher::from_config(config)),
            InferenceService::from_config(config),
            current_version_tag(&config.service),
            config.service.token.clone(),
        )
    }
}

/// Build the router over the given state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/tools", get(handlers::list_tools))
        .route("/invoke", post(handlers::invoke))
        .route("/invoke-tool", post(handlers::invoke))
        .route("/call_tool", post(handlers::invoke))
        .route("/tool/{name}", post(handlers::invoke_named))
        .route("/predict", post(handlers::predict))
        .route("/inference/{token}", post(handlers::predict_for_token))
        .route("/version", get(handlers::version))
        .route("/mcp/version", get(handlers::version))
        .route("/reload", post(handlers::reload))
        .route("/health", get(handlers::health))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        "{} {} -> {} in {:.1}ms",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64() * 1000.0
    );
    response
}

/// Bind the configured address and serve until ctrl-c
pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config);
    warm_up(&state).await;

    let listener = TcpListener::bind((config.service.bind_address.as_str(), config.service.port)).await?;
    tracing::info!("Listening on http://{} ({})", listener.local_addr()?, state.version);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

/// Try loading the model once so the first request does not pay for it
async fn warm_up(state: &AppState) {
    let inference = Arc::clone(&state.inference);
    match tokio::task::spawn_blocking(move || inference.cache().current()).await {
        Ok(Ok(loaded)) => tracing::info!(
            "Model generation {} ready with {} features",
            loaded.generation,
            loaded.features.len()
        ),
        Ok(Err(e)) => tracing::warn!("Model not loaded at startup: {}", e),
        Err(e) => tracing::warn!("Model warm-up task failed: {}", e),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
