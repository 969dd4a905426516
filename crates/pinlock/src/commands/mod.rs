//! Command implementations.

pub mod forces;
pub mod lifecycle;

use crate::cli::{CliError, Commands};
use pinlock_core::LockConfig;
use serde_json::Value;

/// What a command produced, in both renderings.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Human-readable output.
    pub text: String,
    /// Payload of the JSON envelope.
    pub data: Value,
}

/// Run `command` against the project described by `config`.
///
/// # Errors
///
/// Returns the command's error mapped for the CLI.
pub fn execute(command: &Commands, config: &LockConfig) -> Result<CommandOutput, CliError> {
    let span = crate::command_span!(command.name());
    let _guard = span.enter();

    match command {
        Commands::Generate => lifecycle::execute_generate(config),
        Commands::Save => lifecycle::execute_save(config),
        Commands::Commit => lifecycle::execute_commit(config),
        Commands::Lock { no_commit } => lifecycle::execute_lock(config, *no_commit),
        Commands::Forces {
            generate,
            output_format,
        } => forces::execute_forces(config, *generate, *output_format),
    }
}
