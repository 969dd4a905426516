//! `pinlock forces`: report the forced versions for each configuration.

use super::CommandOutput;
use crate::cli::{CliError, OutputFormat};
use pinlock_core::{ForceDirective, LockConfig, LockLifecycle, Mode, ResolutionStrategy};
use serde::Serialize;
use std::fmt::Write;

/// Label used when no configurations are named.
const ALL_CONFIGURATIONS: &str = "*";

/// Resolution context for a single dependency configuration.
///
/// Records the directives applied to it so they can be reported.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigurationForces {
    /// Configuration name.
    pub name: String,
    /// Directives applied, in application order.
    pub forces: Vec<String>,
}

impl ConfigurationForces {
    /// An empty context for `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            forces: Vec::new(),
        }
    }
}

impl ResolutionStrategy for ConfigurationForces {
    fn apply_forces(&mut self, forces: &[ForceDirective]) {
        self.forces.extend(forces.iter().map(ToString::to_string));
    }
}

fn configuration_contexts(config: &LockConfig) -> Vec<ConfigurationForces> {
    if config.configurations.is_empty() {
        vec![ConfigurationForces::new(ALL_CONFIGURATIONS)]
    } else {
        config
            .configurations
            .iter()
            .map(|name| ConfigurationForces::new(name.clone()))
            .collect()
    }
}

/// Execute `pinlock forces`.
///
/// With `generate` set, shows the directives in force while a lock is
/// generated (overrides only) instead of those applied to builds.
///
/// # Errors
///
/// Returns an error if the applied lock or the override sources cannot be read.
pub fn execute_forces(
    config: &LockConfig,
    generate: bool,
    format: OutputFormat,
) -> Result<CommandOutput, CliError> {
    let mode = if generate {
        Mode::for_generate(config)
    } else {
        Mode::for_apply(config)
    };

    let lifecycle = LockLifecycle::new(config);
    let mut contexts = configuration_contexts(config);
    let forces = lifecycle.apply(mode, contexts.iter_mut())?;

    let mode_name = match mode {
        Mode::ApplyLock => "lock",
        Mode::ApplyOverridesOnly => "overrides",
        Mode::Ignore => "ignore",
    };
    let data = serde_json::json!({
        "mode": mode_name,
        "forces": forces.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "configurations": contexts,
    });

    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&data)
            .map_err(|e| CliError::other(format!("JSON serialization failed: {e}")))?,
        OutputFormat::Text => {
            let mut text = String::new();
            for directive in &forces {
                let _ = writeln!(text, "{directive}");
            }
            text.trim_end().to_string()
        }
    };

    Ok(CommandOutput { text, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_every_configuration_receives_the_directives() {
        let temp = TempDir::new().unwrap();
        let mut config = LockConfig::new(temp.path());
        config.configurations = ["compile".to_string(), "runtime".to_string()]
            .into_iter()
            .collect();
        config.overrides = Some("g:b:2.0".to_string());
        fs::write(
            config.canonical_lock_path(),
            r#"{"g:a": {"locked": "1.0"}}"#,
        )
        .unwrap();

        let output = execute_forces(&config, false, OutputFormat::Text).unwrap();
        assert_eq!(output.text, "g:a:1.0\ng:b:2.0");
        assert_eq!(output.data["mode"], "lock");

        let configurations = output.data["configurations"].as_array().unwrap();
        assert_eq!(configurations.len(), 2);
        for configuration in configurations {
            assert_eq!(
                configuration["forces"],
                serde_json::json!(["g:a:1.0", "g:b:2.0"])
            );
        }
    }

    #[test]
    fn test_generate_mode_ignores_the_lock() {
        let temp = TempDir::new().unwrap();
        let mut config = LockConfig::new(temp.path());
        config.overrides = Some("g:b:2.0".to_string());
        fs::write(
            config.canonical_lock_path(),
            r#"{"g:a": {"locked": "1.0"}}"#,
        )
        .unwrap();

        let output = execute_forces(&config, true, OutputFormat::Text).unwrap();
        assert_eq!(output.text, "g:b:2.0");
        assert_eq!(output.data["mode"], "overrides");
        assert_eq!(output.data["configurations"][0]["name"], "*");
    }

    #[test]
    fn test_ignore_reports_nothing() {
        let temp = TempDir::new().unwrap();
        let mut config = LockConfig::new(temp.path());
        config.ignore = true;

        let output = execute_forces(&config, false, OutputFormat::Json).unwrap();
        assert_eq!(output.data["mode"], "ignore");
        assert!(output.text.contains("\"forces\": []"));
    }
}
