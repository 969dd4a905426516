//! Seams to the components pinlock drives but does not implement.

use crate::coordinate::ForceDirective;
use crate::error::Result;
use crate::lockfile::Lock;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Resolves a full dependency graph and reports it as a lock.
pub trait Resolver {
    /// Resolve the given configurations, honoring `forces`.
    ///
    /// # Errors
    ///
    /// Implementations report failures as [`crate::Error::Resolution`]; they
    /// are propagated to the caller unchanged.
    fn resolve(
        &self,
        configurations: &BTreeSet<String>,
        include_transitive: bool,
        forces: &[ForceDirective],
    ) -> Result<Lock>;
}

/// A dependency-resolution context that accepts forced versions.
pub trait ResolutionStrategy {
    /// Pin the given coordinates for this context.
    fn apply_forces(&mut self, forces: &[ForceDirective]);
}

/// What to hand to source control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    /// Lock files to commit.
    pub paths: Vec<PathBuf>,
    /// Commit message.
    pub message: String,
    /// Tag to create on the commit.
    pub tag: Option<String>,
    /// Additional attempts allowed for the remote operation.
    pub retries: u32,
}

/// What source control did with a [`CommitRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScmOutcome {
    /// A new commit was created and published.
    Committed,
    /// The files were already committed, but earlier commits had not reached
    /// the remote yet and were published now.
    Published,
    /// The files were already committed and published.
    Unchanged,
}

/// Source control integration.
pub trait Scm {
    /// Commit the requested files, tag if asked, and publish the result.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Scm`] once the retries are exhausted.
    fn commit(&self, request: &CommitRequest) -> Result<ScmOutcome>;
}
