//! Version control capability used by commit_to_github
//!
//! `GitCli` shells out to `git` in the configured repository. Every spawn
//! failure or non-zero exit becomes `McpError::Vcs` carrying git's output.

use std::path::PathBuf;
use std::process::{Command, Output};

use crate::capability::Capability;
use crate::config::GitConfig;
use crate::error::{McpError, Result};

/// Stage, commit and push
pub trait VersionControl: Send + Sync {
    /// Stage the given paths, or every change when `files` is empty
    fn stage(&self, files: &[String]) -> Result<()>;

    fn commit(&self, message: &str) -> Result<()>;

    /// Push the current commit to `branch` on the remote
    fn push(&self, branch: &str) -> Result<()>;
}

/// `git` command line client bound to one repository
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_root: PathBuf,
    remote: String,
}

impl GitCli {
    pub fn new(repo_root: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            repo_root: repo_root.into(),
            remote: remote.into(),
        }
    }

    /// Check that the root is inside a git work tree
    pub fn is_repository(&self) -> bool {
        Command::new("git")
            .args(["rev-parse", "--is-inside-work-tree"])
            .current_dir(&self.repo_root)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn run(&self, action: &str, args: &[&str]) -> Result<Output> {
        log::debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_root)
            .output()
            .map_err(|e| McpError::Vcs(format!("Failed to execute git {}: {}", action, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.trim().is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(McpError::Vcs(format!("Failed to {}: {}", action, detail)));
        }
        Ok(output)
    }
}

impl VersionControl for GitCli {
    fn stage(&self, files: &[String]) -> Result<()> {
        if files.is_empty() {
            self.run("stage changes", &["add", "-A"])?;
        } else {
            let mut args = vec!["add", "--"];
            args.extend(files.iter().map(String::as_str));
            self.run("stage files", &args)?;
        }
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.run("commit changes", &["commit", "-m", message])?;
        Ok(())
    }

    fn push(&self, branch: &str) -> Result<()> {
        if branch.is_empty() || branch.starts_with('-') {
            return Err(McpError::InvalidParameters(format!("invalid branch name '{}'", branch)));
        }
        let refspec = format!("HEAD:refs/heads/{}", branch);
        self.run("push", &["push", &self.remote, &refspec])?;
        Ok(())
    }
}

/// Build the version control capability from configuration
pub fn vcs_from_config(git: &GitConfig) -> Capability<Box<dyn VersionControl>> {
    let cli = GitCli::new(&git.repo_root, &git.remote);
    if !cli.is_repository() {
        let reason = format!("no git repository at {}", git.repo_root.display());
        log::warn!("Version control not configured: {}", reason);
        return Capability::NotConfigured(reason);
    }
    log::info!("Version control ready at {}", git.repo_root.display());
    Capability::Ready(Box::new(cli))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) {
        let output = Command::new("git").args(args).current_dir(dir).output().unwrap();
        assert!(output.status.success(), "git {:?}: {}", args, String::from_utf8_lossy(&output.stderr));
    }

    /// Work repo with one commit and a bare `origin`
    fn setup_repo() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("origin.git");
        let repo = temp.path().join("repo");
        std::fs::create_dir(&origin).unwrap();
        std::fs::create_dir(&repo).unwrap();

        git(&origin, &["init", "--bare"]);
        git(&repo, &["init"]);
        git(&repo, &["config", "user.email", "test@test.com"]);
        git(&repo, &["config", "user.name", "Test"]);
        git(&repo, &["remote", "add", "origin", origin.to_str().unwrap()]);
        std::fs::write(repo.join("README.md"), "# Test").unwrap();
        git(&repo, &["add", "."]);
        git(&repo, &["commit", "-m", "Initial commit"]);

        (temp, repo, origin)
    }

    fn remote_log(origin: &Path, branch: &str) -> String {
        let output = Command::new("git")
            .args(["log", "--format=%s", branch])
            .current_dir(origin)
            .output()
            .unwrap();
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    #[test]
    fn test_stage_commit_push() {
        let (_temp, repo, origin) = setup_repo();
        let cli = GitCli::new(&repo, "origin");
        assert!(cli.is_repository());

        std::fs::write(repo.join("model.py"), "x = 1\n").unwrap();
        cli.stage(&["model.py".to_string()]).unwrap();
        cli.commit("Add model").unwrap();
        cli.push("main").unwrap();

        assert!(remote_log(&origin, "main").starts_with("Add model"));
    }

    #[test]
    fn test_stage_all_when_no_files() {
        let (_temp, repo, origin) = setup_repo();
        let cli = GitCli::new(&repo, "origin");

        std::fs::write(repo.join("a.txt"), "a").unwrap();
        std::fs::write(repo.join("b.txt"), "b").unwrap();
        cli.stage(&[]).unwrap();
        cli.commit("Add both").unwrap();
        cli.push("feature").unwrap();

        assert!(remote_log(&origin, "feature").starts_with("Add both"));
    }

    #[test]
    fn test_nothing_to_commit_is_vcs_error() {
        let (_temp, repo, _origin) = setup_repo();
        let cli = GitCli::new(&repo, "origin");
        let err = cli.commit("empty").unwrap_err();
        assert!(matches!(err, McpError::Vcs(msg) if msg.contains("commit")));
    }

    #[test]
    fn test_push_to_missing_remote_fails() {
        let (_temp, repo, _origin) = setup_repo();
        let cli = GitCli::new(&repo, "nowhere");
        assert!(matches!(cli.push("main"), Err(McpError::Vcs(_))));
    }

    #[test]
    fn test_option_like_branch_rejected() {
        let (_temp, repo, _origin) = setup_repo();
        let cli = GitCli::new(&repo, "origin");
        assert!(matches!(cli.push("--force"), Err(McpError::InvalidParameters(_))));
    }

    #[test]
    fn test_factory_without_repository() {
        let temp = TempDir::new().unwrap();
        let git = GitConfig {
            repo_root: temp.path().to_path_buf(),
            ..Default::default()
        };
        assert!(!vcs_from_config(&git).is_ready());
    }

    #[test]
    fn test_factory_with_repository() {
        let (_temp, repo, _origin) = setup_repo();
        let git = GitConfig {
            repo_root: repo,
            ..Default::default()
        };
        assert!(vcs_from_config(&git).is_ready());
    }
}
