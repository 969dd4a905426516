//! Lock lifecycle.
//!
//! Coordinates the three stages a lock goes through:
//!
//! 1. **Generate** - resolve the project with any overrides in force and
//!    write the result to the generated location.
//! 2. **Save** - promote the generated lock to the canonical location,
//!    skipping the write when nothing changed.
//! 3. **Commit** - hand the canonical locks to source control. Only offered
//!    when an [`Scm`] collaborator is available.
//!
//! Each stage can be run on its own. A failing stage aborts everything after it.

use crate::collaborators::{CommitRequest, ResolutionStrategy, Resolver, Scm, ScmOutcome};
use crate::config::LockConfig;
use crate::coordinate::ForceDirective;
use crate::error::{Error, Result};
use crate::force::{resolve_with_lock, resolve_without_lock};
use crate::lockfile::{Lock, LockStore, VIA_OVERRIDE_FIELD, write_atomic};
use crate::overrides::{OverrideLoader, Overrides};
use chrono::Utc;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// How directives are derived, decided once by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Force the lock (when present) with overrides on top.
    ApplyLock,
    /// Force overrides only. Used while (re)generating a lock.
    ApplyOverridesOnly,
    /// Force nothing.
    Ignore,
}

impl Mode {
    /// Mode for builds that consume an existing lock.
    #[must_use]
    pub const fn for_apply(config: &LockConfig) -> Self {
        if config.ignore {
            Self::Ignore
        } else {
            Self::ApplyLock
        }
    }

    /// Mode for lock generation.
    #[must_use]
    pub const fn for_generate(config: &LockConfig) -> Self {
        if config.ignore {
            Self::Ignore
        } else {
            Self::ApplyOverridesOnly
        }
    }
}

/// A lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Produce the generated lock.
    Generate,
    /// Promote the generated lock.
    Save,
    /// Commit canonical locks.
    Commit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate => write!(f, "generate"),
            Self::Save => write!(f, "save"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

/// Last stage completed by a [`LockLifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Nothing has run yet.
    Pending,
    /// A lock was generated.
    Generated,
    /// The generated lock was promoted (or already matched).
    Saved,
    /// Canonical locks were committed.
    Committed,
}

/// Result of the generate stage.
#[derive(Debug, Clone)]
pub struct GenerateReport {
    /// Where the lock was written.
    pub path: PathBuf,
    /// The lock as written.
    pub lock: Lock,
    /// Directives in force during resolution.
    pub forces: Vec<ForceDirective>,
}

/// Result of the save stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Canonical lock already had the generated content. Nothing was written.
    UpToDate {
        /// Canonical lock path.
        path: PathBuf,
    },
    /// Canonical lock was replaced.
    Saved {
        /// Canonical lock path.
        path: PathBuf,
    },
}

/// Result of the commit stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Locks were committed and pushed.
    Committed {
        /// Files committed.
        paths: Vec<PathBuf>,
        /// Tag created, if any.
        tag: Option<String>,
    },
    /// Locks were already committed by an earlier run whose push had failed.
    /// That commit was pushed now.
    Published {
        /// Files requested.
        paths: Vec<PathBuf>,
        /// Tag created, if any.
        tag: Option<String>,
    },
    /// Locks were already committed and pushed. Nothing was done.
    Unchanged {
        /// Files requested.
        paths: Vec<PathBuf>,
    },
    /// No canonical lock existed anywhere.
    NothingToCommit,
}

/// Results of a full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Generate stage result.
    pub generate: GenerateReport,
    /// Save stage result.
    pub save: SaveOutcome,
    /// Commit stage result, when source control is available.
    pub commit: Option<CommitOutcome>,
}

/// Drives the generate, save and commit stages for one project.
#[derive(Debug)]
pub struct LockLifecycle<'a> {
    config: &'a LockConfig,
    state: LifecycleState,
}

impl<'a> LockLifecycle<'a> {
    /// Create a lifecycle for the project described by `config`.
    #[must_use]
    pub const fn new(config: &'a LockConfig) -> Self {
        Self {
            config,
            state: LifecycleState::Pending,
        }
    }

    /// Last completed stage.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Stages on offer. Commit only appears when source control is present.
    #[must_use]
    pub fn available_stages(scm: Option<&dyn Scm>) -> Vec<Stage> {
        let mut stages = vec![Stage::Generate, Stage::Save];
        if scm.is_some() {
            stages.push(Stage::Commit);
        }
        stages
    }

    fn load_overrides(&self) -> Result<Overrides> {
        OverrideLoader::load(&self.config.override_sources(), self.config.ignore)
    }

    /// Directives to force under `mode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the override sources or the applied lock cannot be read.
    pub fn forces(&self, mode: Mode) -> Result<Vec<ForceDirective>> {
        match mode {
            Mode::Ignore => Ok(Vec::new()),
            Mode::ApplyOverridesOnly => Ok(resolve_without_lock(&self.load_overrides()?)),
            Mode::ApplyLock => {
                let overrides = self.load_overrides()?;
                let lock_path = self.config.applied_lock_path();
                if LockStore::exists(&lock_path) {
                    let lock = LockStore::read(&lock_path)?;
                    Ok(resolve_with_lock(&lock, &overrides))
                } else {
                    debug!(path = %lock_path.display(), "No lock present, applying overrides only");
                    Ok(resolve_without_lock(&overrides))
                }
            }
        }
    }

    /// Compute directives once and apply them to every resolution context.
    ///
    /// # Errors
    ///
    /// Returns an error if the directives cannot be computed. No context is
    /// touched in that case.
    pub fn apply<'c, S, I>(&self, mode: Mode, contexts: I) -> Result<Vec<ForceDirective>>
    where
        S: ResolutionStrategy + ?Sized + 'c,
        I: IntoIterator<Item = &'c mut S>,
    {
        let forces = self.forces(mode)?;
        for context in contexts {
            context.apply_forces(&forces);
        }
        debug!(forces = forces.len(), ?mode, "Applied forces");
        Ok(forces)
    }

    /// Resolve the project and write the generated lock.
    ///
    /// The canonical lock is only consulted for a partial update
    /// (`updateDependencies`), where every coordinate not being updated stays
    /// pinned to its canonical version.
    ///
    /// # Errors
    ///
    /// Resolver errors are returned unchanged and nothing is written.
    pub fn generate(&mut self, resolver: &dyn Resolver) -> Result<GenerateReport> {
        let mode = Mode::for_generate(self.config);
        let overrides = match mode {
            Mode::Ignore => Overrides::new(),
            _ => self.load_overrides()?,
        };
        let forces = self.generation_forces(mode, &overrides)?;

        let mut lock = resolver.resolve(
            &self.config.configurations,
            self.config.include_transitive,
            &forces,
        )?;

        let skipped = &self.config.skipped_dependencies;
        lock.retain(|coordinate, entry| {
            if skipped.contains(coordinate) {
                debug!(coordinate = %coordinate, "Skipping dependency");
                return false;
            }
            if let (Some(version), true) = (overrides.get(coordinate), entry.is_forceable()) {
                entry.extra.insert(
                    VIA_OVERRIDE_FIELD.to_string(),
                    serde_json::Value::String(version.to_string()),
                );
            }
            true
        });

        let path = self.config.generated_lock_path();
        LockStore::write(&path, &lock)?;
        info!(path = %path.display(), entries = lock.len(), "Generated lock");

        self.state = LifecycleState::Generated;
        Ok(GenerateReport { path, lock, forces })
    }

    fn generation_forces(&self, mode: Mode, overrides: &Overrides) -> Result<Vec<ForceDirective>> {
        let updates = &self.config.update_dependencies;
        let canonical = self.config.canonical_lock_path();
        if mode == Mode::Ignore || updates.is_empty() || !LockStore::exists(&canonical) {
            return Ok(resolve_without_lock(overrides));
        }

        let mut pinned = LockStore::read(&canonical)?;
        pinned.retain(|coordinate, _| !updates.contains(coordinate));
        debug!(
            updating = updates.len(),
            pinned = pinned.len(),
            "Partial lock update"
        );
        Ok(resolve_with_lock(&pinned, overrides))
    }

    /// Promote the generated lock to the canonical location.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingGeneratedLock`] if no lock was generated, or an
    /// I/O error if either file cannot be read or the canonical one written.
    pub fn save(&mut self) -> Result<SaveOutcome> {
        let generated = self.config.generated_lock_path();
        if !LockStore::exists(&generated) {
            return Err(Error::MissingGeneratedLock { path: generated });
        }
        let canonical = self.config.canonical_lock_path();

        let content = fs::read(&generated)
            .map_err(|source| Error::io(source, &generated, "reading generated lock"))?;

        let unchanged = LockStore::exists(&canonical)
            && fs::read(&canonical)
                .map_err(|source| Error::io(source, &canonical, "reading canonical lock"))?
                == content;

        let outcome = if unchanged {
            info!(path = %canonical.display(), "Lock is up to date");
            SaveOutcome::UpToDate { path: canonical }
        } else {
            write_atomic(&canonical, &content)?;
            info!(path = %canonical.display(), "Saved lock");
            SaveOutcome::Saved { path: canonical }
        };

        self.state = LifecycleState::Saved;
        Ok(outcome)
    }

    /// Commit the canonical locks of the root project and its sub-projects.
    ///
    /// Sub-projects without a canonical lock are left out.
    ///
    /// # Errors
    ///
    /// Returns whatever the source control collaborator reports after its retries.
    pub fn commit(&mut self, scm: &dyn Scm) -> Result<CommitOutcome> {
        let paths: Vec<PathBuf> = self
            .config
            .project_lock_paths()
            .into_iter()
            .filter(|path| {
                let exists = LockStore::exists(path);
                if !exists {
                    debug!(path = %path.display(), "No lock to commit");
                }
                exists
            })
            .collect();

        if paths.is_empty() {
            info!("No lock files to commit");
            return Ok(CommitOutcome::NothingToCommit);
        }

        let request = CommitRequest {
            paths,
            message: self.config.commit.message.clone(),
            tag: self.config.commit.resolve_tag(Utc::now()),
            retries: self.config.commit.retries,
        };
        let outcome = scm.commit(&request)?;
        info!(files = request.paths.len(), ?outcome, "Commit stage finished");

        self.state = LifecycleState::Committed;
        let CommitRequest { paths, tag, .. } = request;
        Ok(match outcome {
            ScmOutcome::Committed => CommitOutcome::Committed { paths, tag },
            ScmOutcome::Published => CommitOutcome::Published { paths, tag },
            ScmOutcome::Unchanged => CommitOutcome::Unchanged { paths },
        })
    }

    /// Generate, save and, when source control is available, commit.
    ///
    /// # Errors
    ///
    /// Stops at the first failing stage and returns its error.
    pub fn run(&mut self, resolver: &dyn Resolver, scm: Option<&dyn Scm>) -> Result<PipelineReport> {
        let generate = self.generate(resolver)?;
        let save = self.save()?;
        let commit = match scm {
            Some(scm) => Some(self.commit(scm)?),
            None => None,
        };
        Ok(PipelineReport {
            generate,
            save,
            commit,
        })
    }
}
