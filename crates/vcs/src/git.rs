//! Git implementation of the [`Scm`] collaborator.

use crate::retry::{RetryConfig, with_retry};
use pinlock_core::{CommitRequest, Error, Result, Scm, ScmOutcome};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Duration;
use tracing::{debug, info};

/// Commits lock files with the `git` binary and pushes them to a remote.
#[derive(Debug, Clone)]
pub struct GitScm {
    root: PathBuf,
    remote: String,
    retry_delay: Duration,
}

impl GitScm {
    /// Use the repository rooted at (or containing) `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            remote: "origin".to_string(),
            retry_delay: RetryConfig::default().initial_delay,
        }
    }

    /// The repository containing `dir`, or `None` when `dir` is not inside a
    /// git work tree or git is unavailable.
    #[must_use]
    pub fn discover(dir: &Path) -> Option<Self> {
        let output = Command::new("git")
            .args(["rev-parse", "--is-inside-work-tree"])
            .current_dir(dir)
            .output()
            .ok()?;

        if output.status.success() && String::from_utf8_lossy(&output.stdout).trim() == "true" {
            Some(Self::new(dir))
        } else {
            debug!(dir = %dir.display(), "Not inside a git work tree");
            None
        }
    }

    /// Push to `remote` instead of `origin`.
    #[must_use]
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// Initial backoff between push attempts.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Repository directory commands run in.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn git<I, S>(&self, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| Error::scm(format!("Failed to run git: {e}"), 1))
    }

    /// Run git and fail unless it exits successfully.
    fn run(&self, what: &str, args: &[&str]) -> Result<()> {
        let output = self.git(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::scm(format!("git {what} failed: {}", stderr.trim()), 1));
        }
        debug!(command = what, "git succeeded");
        Ok(())
    }

    /// Whether any of `paths` has staged changes.
    fn has_staged_changes(&self, paths: &[String]) -> Result<bool> {
        let mut args = vec!["diff", "--cached", "--quiet", "--"];
        args.extend(paths.iter().map(String::as_str));
        let output = self.git(&args)?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(Error::scm(
                format!(
                    "git diff failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
                1,
            )),
        }
    }

    /// Number of local commits the upstream branch does not have yet.
    fn unpublished_commits(&self) -> Result<u32> {
        let output = self.git(["rev-list", "--count", "@{upstream}..HEAD"])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::scm(
                format!(
                    "Cannot tell whether lock commits were pushed: {}",
                    stderr.trim()
                ),
                1,
            ));
        }
        String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse()
            .map_err(|e| Error::scm(format!("Unexpected git rev-list output: {e}"), 1))
    }

    /// `paths` as pathspecs relative to the directory git runs in.
    ///
    /// Callers build lock paths against their own working directory, which
    /// need not be `root`.
    fn pathspecs(&self, paths: &[PathBuf]) -> Result<Vec<String>> {
        let root = self.root.canonicalize().map_err(|e| {
            Error::scm(format!("Cannot resolve {}: {e}", self.root.display()), 1)
        })?;
        paths
            .iter()
            .map(|path| {
                let file = path.canonicalize().map_err(|e| {
                    Error::scm(format!("Cannot resolve {}: {e}", path.display()), 1)
                })?;
                Ok(file
                    .strip_prefix(&root)
                    .map_or_else(|_| file.display().to_string(), |rel| rel.display().to_string()))
            })
            .collect()
    }

    fn push(&self, tag: Option<&str>) -> Result<()> {
        self.run("push", &["push", self.remote.as_str()])?;
        if let Some(tag) = tag {
            self.run("push tag", &["push", self.remote.as_str(), tag])?;
        }
        Ok(())
    }
}

impl Scm for GitScm {
    fn commit(&self, request: &CommitRequest) -> Result<ScmOutcome> {
        let paths = self.pathspecs(&request.paths)?;

        let mut add = vec!["add", "--"];
        add.extend(paths.iter().map(String::as_str));
        self.run("add", &add)?;

        let outcome = if self.has_staged_changes(&paths)? {
            let mut commit = vec!["commit", "-m", request.message.as_str(), "--"];
            commit.extend(paths.iter().map(String::as_str));
            self.run("commit", &commit)?;
            ScmOutcome::Committed
        } else if self.unpublished_commits()? > 0 {
            info!(remote = %self.remote, "Lock files unchanged, publishing earlier lock commits");
            ScmOutcome::Published
        } else {
            info!("Lock files unchanged, nothing to commit");
            return Ok(ScmOutcome::Unchanged);
        };

        if let Some(tag) = &request.tag {
            self.run("tag", &["tag", "-f", tag.as_str()])?;
        }

        let config = RetryConfig::from_retries(request.retries).with_initial_delay(self.retry_delay);
        with_retry(&config, |attempt| {
            if attempt > 1 {
                self.run("pull --rebase", &["pull", "--rebase", self.remote.as_str()])?;
                if let Some(tag) = &request.tag {
                    // The rebase rewrote the commit the tag points at.
                    self.run("tag", &["tag", "-f", tag.as_str()])?;
                }
            }
            self.push(request.tag.as_deref())
        })
        .map_err(|e| match e {
            Error::Scm { message, .. } => Error::scm(message, config.max_attempts),
            other => other,
        })?;

        info!(
            remote = %self.remote,
            files = paths.len(),
            tag = ?request.tag,
            ?outcome,
            "Pushed lock commit"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builder() {
        let scm = GitScm::new("/repo")
            .with_remote("upstream")
            .with_retry_delay(Duration::from_millis(1));
        assert_eq!(scm.root(), Path::new("/repo"));
        assert_eq!(scm.remote, "upstream");
        assert_eq!(scm.retry_delay, Duration::from_millis(1));
    }

    #[test]
    fn test_discover_outside_repository() {
        let temp = TempDir::new().unwrap();
        assert!(GitScm::discover(temp.path()).is_none());
    }
}
