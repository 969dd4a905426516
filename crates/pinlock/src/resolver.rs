//! External resolver command.
//!
//! pinlock does not resolve dependency graphs itself. The configured
//! `resolver.command` receives a JSON request on stdin and prints a lock
//! document on stdout:
//!
//! ```json
//! {"configurations": ["runtime"], "includeTransitive": false,
//!  "forces": [{"coordinate": "com.example:foo", "version": "1.2.0"}]}
//! ```

use pinlock_core::{Error, ForceDirective, Lock, Resolver, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

/// Request written to the resolver's stdin.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest<'a> {
    /// Configurations to resolve.
    pub configurations: &'a BTreeSet<String>,
    /// Whether to record transitive dependencies.
    pub include_transitive: bool,
    /// Versions to force.
    pub forces: &'a [ForceDirective],
}

/// Runs a resolver program in the project root.
#[derive(Debug, Clone)]
pub struct CommandResolver {
    program: String,
    args: Vec<String>,
    cwd: PathBuf,
}

impl CommandResolver {
    /// Build a resolver from `resolver.command`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the command is empty.
    pub fn new(command: &[String], cwd: impl Into<PathBuf>) -> Result<Self> {
        let Some((program, args)) = command.split_first() else {
            return Err(Error::configuration(
                "No resolver command configured; set resolver.command in pinlock.toml",
            ));
        };
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            cwd: cwd.into(),
        })
    }
}

impl Resolver for CommandResolver {
    fn resolve(
        &self,
        configurations: &BTreeSet<String>,
        include_transitive: bool,
        forces: &[ForceDirective],
    ) -> Result<Lock> {
        let request = serde_json::to_vec(&ResolveRequest {
            configurations,
            include_transitive,
            forces,
        })
        .map_err(|e| Error::resolution(format!("Failed to encode resolver request: {e}")))?;

        debug!(program = %self.program, forces = forces.len(), "Running resolver");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::resolution(format!("Failed to start '{}': {e}", self.program)))?;

        // Feed stdin from its own thread so stdout and stderr are drained
        // while a large request is still being written.
        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || {
                // A resolver may exit without reading its input; its exit status decides.
                if let Err(e) = stdin.write_all(&request) {
                    debug!(error = %e, "Resolver closed stdin early");
                }
            })
        });

        let output = child.wait_with_output().map_err(|e| {
            Error::resolution(format!("Failed to wait for '{}': {e}", self.program))
        })?;

        if writer.is_some_and(|writer| writer.join().is_err()) {
            return Err(Error::resolution(format!(
                "Writing the request to '{}' panicked",
                self.program
            )));
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::resolution(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            Error::resolution(format!("'{}' printed an invalid lock: {e}", self.program))
        })
    }
}
