//! HTTP surface integration tests
//!
//! Binds the router on an ephemeral port and drives it with reqwest and
//! `ServiceClient`. Tuning and git are left unconfigured, so these tests
//! need neither training data nor a remote.

use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;

use forecast_mcp::capability::Capability;
use forecast_mcp::client::{ClientError, ServiceClient};
use forecast_mcp::config::{InferenceConfig, SmoothingMode};
use forecast_mcp::error::Result;
use forecast_mcp::inference::{ArtifactPaths, FeatureInput, InferenceService, ModelCache, PredictionRequest};
use forecast_mcp::server::{AppState, router};
use forecast_mcp::tools::{CodeWriter, ToolCatalog, ToolDispatcher};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

const VERSION: &str = "allora-1-ETH-1d-2026-10-19";

struct TestService {
    dir: TempDir,
    base_url: String,
    http: reqwest::Client,
}

impl TestService {
    fn workspace(&self) -> std::path::PathBuf {
        self.dir.path().join("workspace")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.http.post(self.url(path)).json(&body).send().await.unwrap()
    }
}

async fn start() -> Result<TestService> {
    let dir = TempDir::new()?;
    let workspace = dir.path().join("workspace");
    fs::create_dir_all(&workspace)?;

    let model = dir.path().join("model.json");
    let features = dir.path().join("features.json");
    fs::write(&model, r#"{"kind": "linear", "intercept": 0.5, "coefficients": [2.0, -1.0]}"#)?;
    fs::write(&features, r#"["close_lag1", "volume_z"]"#)?;

    let dispatcher = ToolDispatcher::new(
        ToolCatalog::builtin(5),
        CodeWriter::new(&workspace),
        Capability::not_configured("tuning disabled by configuration"),
        Capability::not_configured("not a git repository"),
        "main",
    );
    let inference = InferenceService::new(
        ModelCache::new(ArtifactPaths::new(model, features)),
        Capability::not_configured("no lexicon"),
        InferenceConfig {
            smoothing: SmoothingMode::None,
            ..Default::default()
        },
    );
    let state = AppState::new(Arc::new(dispatcher), Arc::new(inference), VERSION, "ETH");

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.ok();
    });

    Ok(TestService {
        dir,
        base_url: format!("http://{}", addr),
        http: reqwest::Client::new(),
    })
}

#[tokio::test]
async fn test_index_and_version_routes() -> Result<()> {
    let service = start().await?;

    let body = service.http.get(service.url("/")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "Welcome to MCP App");

    for path in ["/version", "/mcp/version"] {
        let body: Value = service.http.get(service.url(path)).send().await.unwrap().json().await.unwrap();
        assert_eq!(body["version"], VERSION);
    }

    let client = ServiceClient::new(&service.base_url);
    assert_eq!(client.version().await.unwrap(), VERSION);
    Ok(())
}

#[tokio::test]
async fn test_list_tools_reports_all_three() -> Result<()> {
    let service = start().await?;
    let client = ServiceClient::new(&service.base_url);

    let tools = client.list_tools().await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["optimize", "write_code", "commit_to_github"]);

    let write_code = &tools[1];
    assert!(write_code.parameters["title"].required);
    assert!(write_code.parameters["content"].required);
    Ok(())
}

#[tokio::test]
async fn test_unknown_tool_is_not_found() -> Result<()> {
    let service = start().await?;

    let response = service.post("/invoke", json!({"name": "deploy", "parameters": {}})).await;
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "unknown_tool");
    assert!(body["error"].as_str().unwrap().contains("deploy"));
    Ok(())
}

#[tokio::test]
async fn test_write_code_rejects_invalid_python() -> Result<()> {
    let service = start().await?;

    let response = service
        .post(
            "/invoke-tool",
            json!({"name": "write_code", "parameters": {"title": "bad.py", "content": "def f(:\n    pass\n"}}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "syntax_error");
    assert!(!service.workspace().join("bad.py").exists());
    Ok(())
}

#[tokio::test]
async fn test_write_code_writes_valid_python() -> Result<()> {
    let service = start().await?;
    let content = "def add(a, b):\n    return a + b\n";

    let response = service
        .post(
            "/call_tool",
            json!({"name": "write_code", "arguments": {"title": "pkg/ok.py", "content": content}}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "written");
    assert_eq!(fs::read_to_string(service.workspace().join("pkg/ok.py"))?, content);
    Ok(())
}

#[tokio::test]
async fn test_tool_route_takes_parameters_as_body() -> Result<()> {
    let service = start().await?;

    let response = service
        .post("/tool/write_code", json!({"title": "settings.json", "content": "{\"a\": 1}"}))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    assert!(service.workspace().join("settings.json").exists());

    let response = service.post("/tool/write_code", json!({"title": "x.py"})).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "invalid_parameters");
    Ok(())
}

#[tokio::test]
async fn test_optimize_degrades_without_tuning() -> Result<()> {
    let service = start().await?;
    let client = ServiceClient::new(&service.base_url);

    let result = client.invoke("optimize", json!({"trials": 2})).await.unwrap();
    assert_eq!(result["status"], "unavailable");
    assert_eq!(result["result"], "Tuning not available");
    Ok(())
}

#[tokio::test]
async fn test_commit_without_repository_fails() -> Result<()> {
    let service = start().await?;
    let client = ServiceClient::new(&service.base_url);

    match client.invoke("commit_to_github", json!({"message": "update"})).await {
        Err(ClientError::Api { status, .. }) => assert_eq!(status, 502),
        other => panic!("expected api error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_predict_with_named_and_ordered_features() -> Result<()> {
    let service = start().await?;
    let client = ServiceClient::new(&service.base_url);

    let named = PredictionRequest::new(FeatureInput::named([("close_lag1", 3.0), ("volume_z", 1.0)]));
    let outcome = client.predict(&named).await.unwrap();
    assert!((outcome.prediction - 5.5).abs() < 1e-9);
    assert!(!outcome.low_variance);
    assert_eq!(outcome.generation, 1);

    let ordered = PredictionRequest::new(FeatureInput::ordered([1.0, 4.0]));
    let outcome = client.predict(&ordered).await.unwrap();
    assert!((outcome.prediction - (-1.5)).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_predict_low_variance_input() -> Result<()> {
    let service = start().await?;

    let response = service.post("/predict", json!({"features": [2.0, 2.0]})).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["prediction"], 0.0);
    assert_eq!(body["low_variance"], true);
    Ok(())
}

#[tokio::test]
async fn test_inference_route_checks_token() -> Result<()> {
    let service = start().await?;
    let body = json!({"features": {"close_lag1": 1.0, "volume_z": 0.0}});

    let response = service.post("/inference/eth", body.clone()).await;
    assert_eq!(response.status().as_u16(), 200);

    let response = service.post("/inference/BTC", body).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "invalid_parameters");
    Ok(())
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() -> Result<()> {
    let service = start().await?;

    let response = service
        .http
        .post(service.url("/invoke"))
        .header("content-type", "application/json")
        .body("{\"name\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "invalid_parameters");
    Ok(())
}

#[tokio::test]
async fn test_reload_and_health() -> Result<()> {
    let service = start().await?;

    let response = service.post("/reload", json!({})).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "reloaded");
    assert_eq!(body["generation"], 1);
    assert_eq!(body["features"], json!(["close_lag1", "volume_z"]));

    let client = ServiceClient::new(&service.base_url);
    let health = client.health().await.unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["version"], VERSION);
    assert_eq!(health["model"]["state"], "loaded");
    Ok(())
}

#[tokio::test]
async fn test_missing_model_is_unavailable() -> Result<()> {
    let service = start().await?;
    fs::remove_file(service.dir.path().join("model.json"))?;

    let response = service.post("/predict", json!({"features": [1.0, 2.0]})).await;
    assert_eq!(response.status().as_u16(), 503);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "model_load_error");
    Ok(())
}
