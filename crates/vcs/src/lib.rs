//! Source control for pinlock.
//!
//! [`GitScm`] implements the [`pinlock_core::Scm`] collaborator on top of the
//! `git` binary. Remote operations are retried with exponential backoff
//! ([`retry`]).

pub mod git;
pub mod retry;

pub use git::GitScm;
pub use retry::{RetryConfig, with_retry};
