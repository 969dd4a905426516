//! Lock lifecycle commands.
//!
//! - `pinlock generate` - resolve and write the generated lock
//! - `pinlock save` - promote the generated lock
//! - `pinlock commit` - commit canonical locks
//! - `pinlock lock` - all of the above

use super::CommandOutput;
use crate::cli::CliError;
use crate::resolver::CommandResolver;
use pinlock_core::{CommitOutcome, GenerateReport, LockConfig, LockLifecycle, SaveOutcome, Scm};
use pinlock_vcs::GitScm;
use serde_json::json;
use std::fmt::Write;

fn resolver(config: &LockConfig) -> Result<CommandResolver, CliError> {
    CommandResolver::new(&config.resolver.command, &config.root).map_err(|e| {
        CliError::from(e).with_help(
            "Add a [resolver] section with command = [\"<program>\", ...] to pinlock.toml",
        )
    })
}

fn generate_output(report: &GenerateReport) -> (String, serde_json::Value) {
    let text = format!(
        "Generated {} ({} entries, {} forced)",
        report.path.display(),
        report.lock.len(),
        report.forces.len()
    );
    let data = json!({
        "path": report.path,
        "entries": report.lock.len(),
        "forces": report.forces.iter().map(ToString::to_string).collect::<Vec<_>>(),
    });
    (text, data)
}

fn save_output(outcome: &SaveOutcome) -> (String, serde_json::Value) {
    match outcome {
        SaveOutcome::UpToDate { path } => (
            format!("{} is up to date", path.display()),
            json!({ "path": path, "changed": false }),
        ),
        SaveOutcome::Saved { path } => (
            format!("Saved {}", path.display()),
            json!({ "path": path, "changed": true }),
        ),
    }
}

fn commit_output(outcome: &CommitOutcome) -> (String, serde_json::Value) {
    match outcome {
        CommitOutcome::NothingToCommit => (
            "No lock files to commit".to_string(),
            json!({ "committed": [], "changed": false }),
        ),
        CommitOutcome::Unchanged { paths } => (
            format!("{} lock file(s) already committed and pushed", paths.len()),
            json!({ "committed": paths, "changed": false }),
        ),
        CommitOutcome::Committed { paths, tag } | CommitOutcome::Published { paths, tag } => {
            let mut text = if matches!(outcome, CommitOutcome::Committed { .. }) {
                format!("Committed {} lock file(s)", paths.len())
            } else {
                format!("Pushed earlier commit of {} lock file(s)", paths.len())
            };
            if let Some(tag) = tag {
                let _ = write!(text, ", tagged {tag}");
            }
            (
                text,
                json!({ "committed": paths, "changed": true, "tag": tag }),
            )
        }
    }
}

fn discover_scm(config: &LockConfig) -> Option<GitScm> {
    GitScm::discover(&config.root).map(|scm| scm.with_remote(config.commit.remote.as_str()))
}

/// Execute `pinlock generate`.
///
/// # Errors
///
/// Returns an error if no resolver is configured, overrides cannot be loaded
/// or the resolver fails.
pub fn execute_generate(config: &LockConfig) -> Result<CommandOutput, CliError> {
    let resolver = resolver(config)?;
    let mut lifecycle = LockLifecycle::new(config);
    let report = lifecycle.generate(&resolver)?;
    let (text, data) = generate_output(&report);
    Ok(CommandOutput { text, data })
}

/// Execute `pinlock save`.
///
/// # Errors
///
/// Returns an error if no lock was generated or the canonical lock cannot be written.
pub fn execute_save(config: &LockConfig) -> Result<CommandOutput, CliError> {
    let mut lifecycle = LockLifecycle::new(config);
    let outcome = lifecycle.save()?;
    let (text, data) = save_output(&outcome);
    Ok(CommandOutput { text, data })
}

/// Execute `pinlock commit`.
///
/// # Errors
///
/// Returns an error outside a git work tree or when source control fails.
pub fn execute_commit(config: &LockConfig) -> Result<CommandOutput, CliError> {
    let Some(scm) = discover_scm(config) else {
        return Err(CliError::config_with_help(
            format!(
                "Commit is not available: {} is not inside a git work tree",
                config.root.display()
            ),
            "Run 'pinlock lock --no-commit' or initialise a git repository",
        ));
    };
    let mut lifecycle = LockLifecycle::new(config);
    let outcome = lifecycle.commit(&scm)?;
    let (text, data) = commit_output(&outcome);
    Ok(CommandOutput { text, data })
}

/// Execute `pinlock lock`: generate, save and commit when possible.
///
/// # Errors
///
/// Returns the error of the first failing stage.
pub fn execute_lock(config: &LockConfig, no_commit: bool) -> Result<CommandOutput, CliError> {
    let resolver = resolver(config)?;
    let scm = if no_commit {
        None
    } else {
        discover_scm(config)
    };
    let scm_ref = scm.as_ref().map(|s| s as &dyn Scm);

    let stages = LockLifecycle::available_stages(scm_ref);
    tracing::debug!(
        stages = %stages.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
        "Running lock pipeline"
    );

    let mut lifecycle = LockLifecycle::new(config);
    let report = lifecycle.run(&resolver, scm_ref)?;

    let (generate_text, generate_data) = generate_output(&report.generate);
    let (save_text, save_data) = save_output(&report.save);
    let mut text = format!("{generate_text}\n{save_text}");
    let mut data = json!({
        "stages": stages.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "generate": generate_data,
        "save": save_data,
    });

    if let Some(commit) = &report.commit {
        let (commit_text, commit_data) = commit_output(commit);
        let _ = write!(text, "\n{commit_text}");
        data["commit"] = commit_data;
    }

    Ok(CommandOutput { text, data })
}
