//! forecast-mcp - MCP tool surface and cached model inference
//!
//! Two components sit behind one HTTP service: a tool dispatcher for
//! `optimize`, `write_code` and `commit_to_github`, and an inference cache
//! that keeps the served model in step with the artifacts on disk.

mod atomic;
pub mod capability;
pub mod client;
pub mod config;
pub mod error;
pub mod inference;
pub mod server;
pub mod tools;
pub mod tuning;
pub mod vcs;
pub mod version;

pub use error::{McpError, Result};
