//! HTTP client for a running forecast-mcp service

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;

use crate::inference::{PredictionOutcome, PredictionRequest};
use crate::tools::ToolDescriptor;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Client for the service's REST routes
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: reqwest::Client,
    base_url: String,
}

impl ServiceClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List the advertised tools
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ClientError> {
        let resp = self.client.get(format!("{}/tools", self.base_url)).send().await?;
        decode(resp).await
    }

    /// Invoke a tool by name
    pub async fn invoke(&self, name: &str, parameters: Value) -> Result<Value, ClientError> {
        let resp = self
            .client
            .post(format!("{}/invoke", self.base_url))
            .json(&json!({ "name": name, "parameters": parameters }))
            .send()
            .await?;
        decode(resp).await
    }

    /// Request a prediction
    pub async fn predict(&self, request: &PredictionRequest) -> Result<PredictionOutcome, ClientError> {
        let resp = self
            .client
            .post(format!("{}/predict", self.base_url))
            .json(request)
            .send()
            .await?;
        decode(resp).await
    }

    /// Fetch the version tag
    pub async fn version(&self) -> Result<String, ClientError> {
        let resp = self.client.get(format!("{}/version", self.base_url)).send().await?;
        let body: Value = decode(resp).await?;
        Ok(body["version"].as_str().unwrap_or_default().to_string())
    }

    /// Fetch the health report
    pub async fn health(&self) -> Result<Value, ClientError> {
        let resp = self.client.get(format!("{}/health", self.base_url)).send().await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|body| body["error"].as_str().map(str::to_string))
            .unwrap_or(text);
        return Err(ClientError::Api { status, message });
    }
    Ok(resp.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trimmed() {
        assert_eq!(ServiceClient::new("http://localhost:8001/").base_url(), "http://localhost:8001");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        let client = ServiceClient::new("http://127.0.0.1:1");
        assert!(matches!(client.version().await, Err(ClientError::Http(_))));
    }
}
