//! Built-in tool catalog
//!
//! The catalog is fixed at process start: one descriptor per `ToolKind`,
//! listed in declaration order.

use std::fmt;

use serde_json::json;

use super::definition::{ParamSpec, ParamType, ToolDescriptor};

/// Every tool the service can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Optimize,
    WriteCode,
    CommitToGithub,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [Self::Optimize, Self::WriteCode, Self::CommitToGithub];

    /// Resolve a tool name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "optimize" => Some(Self::Optimize),
            "write_code" => Some(Self::WriteCode),
            "commit_to_github" => Some(Self::CommitToGithub),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Optimize => "optimize",
            Self::WriteCode => "write_code",
            Self::CommitToGithub => "commit_to_github",
        }
    }

    /// Descriptor advertised for this tool
    pub fn descriptor(&self, default_trials: usize) -> ToolDescriptor {
        match self {
            Self::Optimize => ToolDescriptor::new(
                self.name(),
                "Triggers model optimization using hyperparameter tuning and returns results.",
            )
            .with_param(
                "trials",
                ParamSpec::new(ParamType::Integer, "Number of search trials, capped by the configured maximum")
                    .with_default(json!(default_trials)),
            )
            .with_param(
                "seed",
                ParamSpec::new(ParamType::Integer, "Random seed for a reproducible search"),
            ),
            Self::WriteCode => ToolDescriptor::new(
                self.name(),
                "Writes complete source code to a specified file, overwriting existing content after syntax validation.",
            )
            .with_param(
                "title",
                ParamSpec::new(ParamType::String, "Filename, relative to the workspace (e.g. 'app.py')").required(),
            )
            .with_param(
                "content",
                ParamSpec::new(ParamType::String, "Complete source code content").required(),
            )
            .with_param("artifact_id", ParamSpec::new(ParamType::String, "Artifact identifier"))
            .with_param(
                "artifact_version_id",
                ParamSpec::new(ParamType::String, "Artifact version identifier"),
            )
            .with_param(
                "contentType",
                ParamSpec::new(ParamType::String, "Content type (e.g. 'text/python')"),
            ),
            Self::CommitToGithub => ToolDescriptor::new(self.name(), "Commits changes to GitHub repository.")
                .with_param("message", ParamSpec::new(ParamType::String, "Commit message").required())
                .with_param(
                    "files",
                    ParamSpec::new(ParamType::Array, "Files to commit, all changes when omitted")
                        .with_items(ParamType::String),
                )
                .with_param(
                    "branch",
                    ParamSpec::new(ParamType::String, "Branch to push, the configured default when omitted"),
                ),
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable list of tool descriptors
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    /// Catalog of the built-in tools
    pub fn builtin(default_trials: usize) -> Self {
        Self {
            tools: ToolKind::ALL.iter().map(|k| k.descriptor(default_trials)).collect(),
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// All descriptors in catalog order
    pub fn all(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// List all tool names
    pub fn list(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = ToolCatalog::builtin(50);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.list(), vec!["optimize", "write_code", "commit_to_github"]);
    }

    #[test]
    fn test_catalog_get() {
        let catalog = ToolCatalog::builtin(50);
        let tool = catalog.get("write_code").unwrap();
        assert_eq!(tool.required_params(), vec!["content", "title"]);
        assert!(tool.parameters.contains_key("contentType"));
        assert!(catalog.get("bash").is_none());
        assert!(catalog.get("read_file").is_none());
    }

    #[test]
    fn test_kind_name_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("Optimize"), None);
    }

    #[test]
    fn test_optimize_advertises_default_trials() {
        let catalog = ToolCatalog::builtin(12);
        let spec = &catalog.get("optimize").unwrap().parameters["trials"];
        assert_eq!(spec.default, Some(json!(12)));
        assert!(!spec.required);
    }

    #[test]
    fn test_commit_files_are_strings() {
        let catalog = ToolCatalog::builtin(50);
        let spec = &catalog.get("commit_to_github").unwrap().parameters["files"];
        assert_eq!(spec.param_type, ParamType::Array);
        assert_eq!(spec.items, Some(ParamType::String));
    }
}
