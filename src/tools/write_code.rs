//! Sandboxed file writer behind the write_code tool

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::atomic::write_atomic;
use crate::error::{McpError, Result};

use super::syntax::SourceFormat;

/// What a successful write produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteOutcome {
    pub status: &'static str,
    /// Path relative to the workspace root
    pub path: String,
    pub bytes: usize,
    pub format: SourceFormat,
}

/// Writes validated files under a fixed workspace root
#[derive(Debug, Clone)]
pub struct CodeWriter {
    root: PathBuf,
}

impl CodeWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative title inside the workspace.
    ///
    /// Absolute paths and `..` components are rejected.
    pub fn resolve(&self, title: &str) -> Result<PathBuf> {
        let relative = Path::new(title);
        let mut clean = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => clean.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(McpError::InvalidParameters(format!(
                        "title '{}' may not contain '..'",
                        title
                    )));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(McpError::InvalidParameters(format!(
                        "title '{}' must be a relative path",
                        title
                    )));
                }
            }
        }
        if clean.as_os_str().is_empty() {
            return Err(McpError::InvalidParameters("title must name a file".to_string()));
        }
        Ok(self.root.join(clean))
    }

    /// Validate `content` for its format and overwrite the file.
    ///
    /// Nothing touches the filesystem until validation has passed.
    pub fn write(&self, title: &str, content: &str, content_type: Option<&str>) -> Result<WriteOutcome> {
        let path = self.resolve(title)?;
        let format = SourceFormat::detect(content_type, &path);
        format.validate(content)?;

        write_atomic(&path, content.as_bytes())?;
        log::info!("Wrote {} bytes of {} to {}", content.len(), format.as_str(), path.display());

        let relative = path.strip_prefix(&self.root).unwrap_or(&path);
        Ok(WriteOutcome {
            status: "written",
            path: relative.display().to_string(),
            bytes: content.len(),
            format,
        })
    }
}
