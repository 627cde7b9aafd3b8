//! Error types for forecast-mcp
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur while serving tools and predictions
#[derive(Debug, Error)]
pub enum McpError {
    /// Tool name matched no descriptor in the catalog
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Missing or mistyped parameter, or malformed request body
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Content handed to write_code did not parse in its target format
    #[error("Syntax error: {0}")]
    SyntaxError(String),

    /// Model or feature artifact missing or corrupt
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// Stage, commit or push failed
    #[error("VCS error: {0}")]
    Vcs(String),

    /// Hyperparameter search cannot run
    #[error("Tuning unavailable: {0}")]
    TuningUnavailable(String),

    /// Unexpected failure inside the service (task join, poisoned lock)
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Stable snake_case identifier used in error payloads
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "unknown_tool",
            Self::InvalidParameters(_) => "invalid_parameters",
            Self::SyntaxError(_) => "syntax_error",
            Self::ModelLoad(_) => "model_load_error",
            Self::Vcs(_) => "vcs_error",
            Self::TuningUnavailable(_) => "tuning_unavailable",
            Self::Internal(_) => "internal",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }

    /// HTTP status code this error maps to at the request boundary
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnknownTool(_) => 404,
            Self::InvalidParameters(_) => 400,
            Self::SyntaxError(_) => 422,
            Self::ModelLoad(_) | Self::TuningUnavailable(_) => 503,
            Self::Vcs(_) => 502,
            Self::Internal(_) | Self::Io(_) | Self::Json(_) => 500,
        }
    }
}

/// Result type alias for forecast-mcp operations
pub type Result<T> = std::result::Result<T, McpError>;
