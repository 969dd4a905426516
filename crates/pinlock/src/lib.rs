//! pinlock - reproducible dependency resolution through lock files
//!
//! This crate is the command-line front end. The lock store, override
//! precedence and lifecycle live in [`pinlock_core`]; source control lives in
//! [`pinlock_vcs`]. Here they are wired to an external resolver command and
//! to the terminal.

// CLI output goes to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

/// CLI argument parsing and exit codes.
pub mod cli;
/// Command implementations.
pub mod commands;
/// External resolver command.
pub mod resolver;
/// Tracing setup.
pub mod tracing;

pub use cli::{Cli, CliError};
pub use resolver::CommandResolver;
