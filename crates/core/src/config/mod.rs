//! Configuration for pinlock.
//!
//! A [`LockConfig`] is built once at the process boundary (from
//! `pinlock.toml` plus command-line flags) and passed by reference to the
//! components that need it.

use crate::coordinate::Coordinate;
use crate::error::{Error, Result};
use crate::lockfile::LOCKFILE_NAME;
use crate::overrides::OverrideSources;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Filename for the project configuration.
pub const CONFIG_FILE_NAME: &str = "pinlock.toml";

/// Main configuration structure for pinlock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct LockConfig {
    /// Project root. Relative paths below resolve against it.
    #[serde(skip)]
    pub root: PathBuf,

    /// Lock file name, relative to each project directory.
    pub lock_file: String,

    /// Directory receiving generated locks, relative to the project root.
    pub generated_dir: PathBuf,

    /// Dependency configurations (scopes) to include when generating.
    /// Empty means every configuration the resolver knows.
    pub configurations: BTreeSet<String>,

    /// Whether generated locks record transitive dependencies.
    pub include_transitive: bool,

    /// Override file in lock format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_file: Option<PathBuf>,

    /// Inline overrides (`group:artifact:version,...`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<String>,

    /// Disable all lock and override behavior.
    pub ignore: bool,

    /// Apply the generated lock instead of the canonical one.
    pub use_generated_lock: bool,

    /// Coordinates to re-resolve while the rest of the canonical lock stays pinned.
    pub update_dependencies: BTreeSet<Coordinate>,

    /// Coordinates left out of generated locks.
    pub skipped_dependencies: BTreeSet<Coordinate>,

    /// Sub-project directories whose locks are committed with the root lock.
    pub projects: Vec<PathBuf>,

    /// Commit stage settings.
    pub commit: CommitConfig,

    /// External resolver settings.
    pub resolver: ResolverConfig,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            lock_file: LOCKFILE_NAME.to_string(),
            generated_dir: PathBuf::from("build"),
            configurations: BTreeSet::new(),
            include_transitive: false,
            override_file: None,
            overrides: None,
            ignore: false,
            use_generated_lock: false,
            update_dependencies: BTreeSet::new(),
            skipped_dependencies: BTreeSet::new(),
            projects: Vec::new(),
            commit: CommitConfig::default(),
            resolver: ResolverConfig::default(),
        }
    }
}

impl LockConfig {
    /// Default configuration rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file and root it at `root`.
    ///
    /// Returns `None` if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path, root: impl Into<PathBuf>) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|source| Error::io(source, path, "reading configuration"))?;

        let mut config: Self = toml::from_str(&content).map_err(|e| Error::Configuration {
            message: format!("Failed to parse {}: {e}", path.display()),
            path: Some(path.to_path_buf()),
        })?;
        config.root = root.into();
        config.validate()?;

        Ok(Some(config))
    }

    /// Check invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.lock_file.trim().is_empty() {
            return Err(Error::configuration("lockFile must not be empty"));
        }
        if Path::new(&self.lock_file).is_absolute() {
            return Err(Error::configuration(format!(
                "lockFile must be relative to the project directory, got {}",
                self.lock_file
            )));
        }
        if self.commit.remote.trim().is_empty() {
            return Err(Error::configuration("commit.remote must not be empty"));
        }
        Ok(())
    }

    /// Resolve a possibly relative path against the project root.
    #[must_use]
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// The committed lock of the root project.
    #[must_use]
    pub fn canonical_lock_path(&self) -> PathBuf {
        self.root.join(&self.lock_file)
    }

    /// Where freshly generated locks are written.
    #[must_use]
    pub fn generated_lock_path(&self) -> PathBuf {
        self.resolve_path(&self.generated_dir).join(&self.lock_file)
    }

    /// The lock applied to builds: generated when `useGeneratedLock` is set,
    /// canonical otherwise.
    #[must_use]
    pub fn applied_lock_path(&self) -> PathBuf {
        if self.use_generated_lock {
            self.generated_lock_path()
        } else {
            self.canonical_lock_path()
        }
    }

    /// Canonical lock paths of the root project followed by every sub-project.
    #[must_use]
    pub fn project_lock_paths(&self) -> Vec<PathBuf> {
        std::iter::once(self.canonical_lock_path())
            .chain(
                self.projects
                    .iter()
                    .map(|project| self.resolve_path(project).join(&self.lock_file)),
            )
            .collect()
    }

    /// Override sources with the file path resolved against the root.
    #[must_use]
    pub fn override_sources(&self) -> OverrideSources {
        OverrideSources {
            file: self.override_file.as_deref().map(|p| self.resolve_path(p)),
            inline: self.overrides.clone(),
        }
    }
}

/// Commit stage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CommitConfig {
    /// Commit message.
    pub message: String,
    /// Whether to tag the lock commit.
    pub tag: bool,
    /// Explicit tag name. Defaults to `LockCommit-<timestamp>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    /// Additional attempts for the remote operation.
    pub retries: u32,
    /// Remote the lock commit is pushed to.
    pub remote: String,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            message: "Committing dependency lock files".to_string(),
            tag: false,
            tag_name: None,
            retries: 1,
            remote: "origin".to_string(),
        }
    }
}

impl CommitConfig {
    /// The tag to create for a commit made at `now`, if tagging is enabled.
    #[must_use]
    pub fn resolve_tag(&self, now: DateTime<Utc>) -> Option<String> {
        if !self.tag {
            return None;
        }
        Some(
            self.tag_name
                .clone()
                .unwrap_or_else(|| format!("LockCommit-{}", now.format("%Y%m%d%H%M%S"))),
        )
    }
}

/// External resolver configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolverConfig {
    /// Program and arguments of the resolver command.
    pub command: Vec<String>,
}
