//! Tool dispatch
//!
//! `ToolDispatcher::invoke` resolves the name to a `ToolKind`, checks the
//! parameters against the descriptor and runs the matching handler. An
//! unknown name or bad parameters fail before any handler runs.

use serde_json::{Map, Value, json};

use crate::capability::Capability;
use crate::config::Config;
use crate::error::{McpError, Result};
use crate::tuning::{Optimizer, optimizer_from_config};
use crate::vcs::{VersionControl, vcs_from_config};

use super::catalog::{ToolCatalog, ToolKind};
use super::definition::ToolDescriptor;
use super::write_code::CodeWriter;

/// Routes tool calls to their handlers
pub struct ToolDispatcher {
    catalog: ToolCatalog,
    writer: CodeWriter,
    optimizer: Capability<Optimizer>,
    vcs: Capability<Box<dyn VersionControl>>,
    default_branch: String,
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher")
            .field("tools", &self.catalog.list())
            .field("workspace", &self.writer.root())
            .field("optimizer", &self.optimizer.is_ready())
            .field("vcs", &self.vcs.is_ready())
            .field("default_branch", &self.default_branch)
            .finish()
    }
}

impl ToolDispatcher {
    pub fn new(
        catalog: ToolCatalog,
        writer: CodeWriter,
        optimizer: Capability<Optimizer>,
        vcs: Capability<Box<dyn VersionControl>>,
        default_branch: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            writer,
            optimizer,
            vcs,
            default_branch: default_branch.into(),
        }
    }

    /// Build the dispatcher and probe its capabilities once
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ToolCatalog::builtin(config.tuning.trials),
            CodeWriter::new(&config.storage.workspace_dir),
            optimizer_from_config(config),
            vcs_from_config(&config.git),
            config.git.default_branch.clone(),
        )
    }

    /// All tool descriptors
    pub fn list_tools(&self) -> &[ToolDescriptor] {
        self.catalog.all()
    }

    /// Run a tool by name
    pub fn invoke(&self, name: &str, params: &Value) -> Result<Value> {
        let kind = ToolKind::from_name(name).ok_or_else(|| McpError::UnknownTool(name.to_string()))?;
        let descriptor = self
            .catalog
            .get(name)
            .ok_or_else(|| McpError::UnknownTool(name.to_string()))?;
        let params = descriptor.validate(params)?;

        log::info!("Invoking tool {}", kind);
        let result = match kind {
            ToolKind::Optimize => self.optimize(&params),
            ToolKind::WriteCode => self.write_code(&params),
            ToolKind::CommitToGithub => self.commit(&params),
        };
        if let Err(e) = &result {
            log::warn!("Tool {} failed: {}", kind, e);
        }
        result
    }

    fn optimize(&self, params: &Map<String, Value>) -> Result<Value> {
        let trials = match params.get("trials").and_then(Value::as_i64) {
            Some(t) if t < 1 => {
                return Err(McpError::InvalidParameters(format!("'trials' must be positive, got {}", t)));
            }
            Some(t) => Some(t as usize),
            None => None,
        };
        let seed = params
            .get("seed")
            .and_then(|v| v.as_u64().or_else(|| v.as_i64().map(|s| s as u64)));

        let optimizer = match self.optimizer.as_result() {
            Ok(optimizer) => optimizer,
            Err(reason) => return Ok(tuning_unavailable(reason)),
        };
        match optimizer.run(trials, seed) {
            Ok(result) => Ok(json!({ "status": "ok", "result": result })),
            Err(McpError::TuningUnavailable(reason)) => {
                log::warn!("Tuning unavailable: {}", reason);
                Ok(tuning_unavailable(&reason))
            }
            Err(e) => Err(e),
        }
    }

    fn write_code(&self, params: &Map<String, Value>) -> Result<Value> {
        let title = str_param(params, "title").unwrap_or_default();
        let content = str_param(params, "content").unwrap_or_default();
        if let Some(artifact) = str_param(params, "artifact_id") {
            log::debug!(
                "write_code artifact {} version {}",
                artifact,
                str_param(params, "artifact_version_id").unwrap_or("-")
            );
        }
        let outcome = self.writer.write(title, content, str_param(params, "contentType"))?;
        Ok(serde_json::to_value(outcome)?)
    }

    fn commit(&self, params: &Map<String, Value>) -> Result<Value> {
        let message = str_param(params, "message").unwrap_or_default();
        if message.trim().is_empty() {
            return Err(McpError::InvalidParameters("'message' must not be empty".to_string()));
        }
        let files: Vec<String> = params
            .get("files")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|f| f.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        let branch = str_param(params, "branch")
            .filter(|b| !b.is_empty())
            .unwrap_or(self.default_branch.as_str());

        let vcs = self
            .vcs
            .as_result()
            .map_err(|reason| McpError::Vcs(format!("version control not configured: {}", reason)))?;
        vcs.stage(&files)?;
        vcs.commit(message)?;
        vcs.push(branch)?;
        log::info!("Committed {} file(s) and pushed to {}", files.len(), branch);

        Ok(json!({ "status": "committed", "branch": branch, "files": files }))
    }
}

fn tuning_unavailable(reason: &str) -> Value {
    json!({ "status": "unavailable", "result": "Tuning not available", "reason": reason })
}

fn str_param<'a>(params: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    params.get(name).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StorageConfig, TuningConfig};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingVcs {
        calls: Arc<Mutex<Vec<String>>>,
        fail_push: bool,
    }

    impl VersionControl for RecordingVcs {
        fn stage(&self, files: &[String]) -> Result<()> {
            self.calls.lock().unwrap().push(format!("stage {:?}", files));
            Ok(())
        }

        fn commit(&self, message: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("commit {}", message));
            Ok(())
        }

        fn push(&self, branch: &str) -> Result<()> {
            if self.fail_push {
                return Err(McpError::Vcs("remote rejected".to_string()));
            }
            self.calls.lock().unwrap().push(format!("push {}", branch));
            Ok(())
        }
    }

    fn dispatcher(dir: &TempDir) -> ToolDispatcher {
        ToolDispatcher::new(
            ToolCatalog::builtin(50),
            CodeWriter::new(dir.path()),
            Capability::not_configured("tuning disabled by configuration"),
            Capability::not_configured("no git repository"),
            "main",
        )
    }

    fn with_vcs(dir: &TempDir, vcs: RecordingVcs) -> ToolDispatcher {
        ToolDispatcher::new(
            ToolCatalog::builtin(50),
            CodeWriter::new(dir.path()),
            Capability::not_configured("tuning disabled by configuration"),
            Capability::Ready(Box::new(vcs)),
            "main",
        )
    }

    #[test]
    fn test_list_tools() {
        let dir = TempDir::new().unwrap();
        let names: Vec<_> = dispatcher(&dir).list_tools().iter().map(|t| t.name.clone()).collect();
        assert_eq!(names, vec!["optimize", "write_code", "commit_to_github"]);
    }

    #[test]
    fn test_unknown_tool_has_no_side_effects() {
        let dir = TempDir::new().unwrap();
        let err = dispatcher(&dir)
            .invoke("delete_everything", &json!({"title": "x.py", "content": "x"}))
            .unwrap_err();
        assert!(matches!(err, McpError::UnknownTool(name) if name == "delete_everything"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_write_code_success() {
        let dir = TempDir::new().unwrap();
        let result = dispatcher(&dir)
            .invoke("write_code", &json!({"title": "ok.py", "content": "def f(): return 1"}))
            .unwrap();
        assert_eq!(result["status"], "written");
        assert_eq!(result["path"], "ok.py");
        assert_eq!(result["format"], "python");
        assert_eq!(std::fs::read_to_string(dir.path().join("ok.py")).unwrap(), "def f(): return 1");
    }

    #[test]
    fn test_write_code_syntax_error() {
        let dir = TempDir::new().unwrap();
        let err = dispatcher(&dir)
            .invoke("write_code", &json!({"title": "bad.py", "content": "def f(:"}))
            .unwrap_err();
        assert!(matches!(err, McpError::SyntaxError(_)));
        assert!(!dir.path().join("bad.py").exists());
    }

    #[test]
    fn test_write_code_missing_content() {
        let dir = TempDir::new().unwrap();
        let err = dispatcher(&dir).invoke("write_code", &json!({"title": "a.py"})).unwrap_err();
        assert!(matches!(err, McpError::InvalidParameters(_)));
    }

    #[test]
    fn test_optimize_not_configured_is_degraded() {
        let dir = TempDir::new().unwrap();
        let result = dispatcher(&dir).invoke("optimize", &Value::Null).unwrap();
        assert_eq!(result["status"], "unavailable");
        assert_eq!(result["result"], "Tuning not available");
    }

    #[test]
    fn test_optimize_missing_data_is_degraded() {
        let dir = TempDir::new().unwrap();
        let storage = StorageConfig {
            data_dir: dir.path().join("data"),
            ..Default::default()
        };
        let dispatcher = ToolDispatcher::new(
            ToolCatalog::builtin(50),
            CodeWriter::new(dir.path()),
            Capability::Ready(Optimizer::new(TuningConfig::default(), storage, 0)),
            Capability::not_configured("no git repository"),
            "main",
        );
        let result = dispatcher.invoke("optimize", &json!({"trials": 2})).unwrap();
        assert_eq!(result["status"], "unavailable");
        assert!(result["reason"].as_str().unwrap().contains("training data"));
    }

    #[test]
    fn test_optimize_rejects_bad_trials() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir);
        assert!(matches!(d.invoke("optimize", &json!({"trials": 0})), Err(McpError::InvalidParameters(_))));
        assert!(matches!(
            d.invoke("optimize", &json!({"trials": "ten"})),
            Err(McpError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_commit_without_vcs() {
        let dir = TempDir::new().unwrap();
        let err = dispatcher(&dir)
            .invoke("commit_to_github", &json!({"message": "update"}))
            .unwrap_err();
        assert!(matches!(err, McpError::Vcs(msg) if msg.contains("not configured")));
    }

    #[test]
    fn test_commit_runs_stage_commit_push() {
        let dir = TempDir::new().unwrap();
        let vcs = RecordingVcs::default();
        let calls = Arc::clone(&vcs.calls);
        let result = with_vcs(&dir, vcs)
            .invoke(
                "commit_to_github",
                &json!({"message": "Add model", "files": ["model.py"], "branch": "dev"}),
            )
            .unwrap();

        assert_eq!(result, json!({"status": "committed", "branch": "dev", "files": ["model.py"]}));
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                "stage [\"model.py\"]".to_string(),
                "commit Add model".to_string(),
                "push dev".to_string()
            ]
        );
    }

    #[test]
    fn test_commit_defaults_branch() {
        let dir = TempDir::new().unwrap();
        let result = with_vcs(&dir, RecordingVcs::default())
            .invoke("commit_to_github", &json!({"message": "m"}))
            .unwrap();
        assert_eq!(result["branch"], "main");
        assert_eq!(result["files"], json!([]));
    }

    #[test]
    fn test_commit_push_failure() {
        let dir = TempDir::new().unwrap();
        let vcs = RecordingVcs {
            fail_push: true,
            ..Default::default()
        };
        let err = with_vcs(&dir, vcs)
            .invoke("commit_to_github", &json!({"message": "m"}))
            .unwrap_err();
        assert!(matches!(err, McpError::Vcs(msg) if msg.contains("rejected")));
    }
}
