//! Dependency lock files, overrides and their lifecycle.
//!
//! pinlock records the resolved versions of a project's external dependencies
//! in a lock file and replays them as forced versions so repeated builds
//! resolve identical graphs. Operators can force individual versions through
//! an override file or inline overrides without regenerating the lock.
//!
//! # Architecture
//!
//! - [`lockfile`] - the lock file format and [`LockStore`]
//! - [`overrides`] - [`OverrideLoader`] and the merge of file and inline overrides
//! - [`force`] - the precedence engine producing [`ForceDirective`]s
//! - [`lifecycle`] - the generate, save and commit stages ([`LockLifecycle`])
//! - [`collaborators`] - traits for the resolver, resolution contexts and source control
//!
//! Dependency resolution and source control are not implemented here. The
//! lifecycle drives them through the [`Resolver`], [`ResolutionStrategy`] and
//! [`Scm`] traits.
//!
//! # Example
//!
//! ```rust,ignore
//! use pinlock_core::{LockConfig, LockLifecycle, Mode};
//!
//! let config = LockConfig::new(".");
//! let lifecycle = LockLifecycle::new(&config);
//! for directive in lifecycle.forces(Mode::for_apply(&config))? {
//!     println!("{directive}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod collaborators;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod force;
pub mod lifecycle;
pub mod lockfile;
pub mod overrides;

pub use collaborators::{CommitRequest, ResolutionStrategy, Resolver, Scm, ScmOutcome};
pub use config::{CONFIG_FILE_NAME, CommitConfig, LockConfig, ResolverConfig};
pub use coordinate::{Coordinate, ForceDirective};
pub use error::{Error, Result};
pub use force::{resolve_with_lock, resolve_without_lock};
pub use lifecycle::{
    CommitOutcome, GenerateReport, LifecycleState, LockLifecycle, Mode, PipelineReport,
    SaveOutcome, Stage,
};
pub use lockfile::{LOCKFILE_NAME, Lock, LockEntry, LockStore};
pub use overrides::{OverrideLoader, OverrideSources, Overrides};
