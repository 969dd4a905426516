use crate::tracing::{LogLevel, TracingFormat};
use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::{Diagnostic, Report};
use pinlock_core::{CONFIG_FILE_NAME, LockConfig};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// CLI, configuration or input error exit code
pub const EXIT_CLI: i32 = 2;
/// Resolution, source control or I/O failure exit code
pub const EXIT_FAILURE: i32 = 3;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI, configuration or input file error (exit code 2)
    #[error("CLI/configuration error: {message}")]
    #[diagnostic(code(pinlock::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// A collaborator (resolver or source control) failed (exit code 3)
    #[error("{message}")]
    #[diagnostic(code(pinlock::cli::failed))]
    Failed {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Other unexpected error (exit code 3)
    #[error("Unexpected error: {message}")]
    #[diagnostic(code(pinlock::cli::other))]
    Other {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new other error with help text
    #[must_use]
    pub fn other_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Add help text to an existing error, returning a new error with the help text set.
    #[must_use]
    pub fn with_help(self, help_text: impl Into<String>) -> Self {
        let help = Some(help_text.into());
        match self {
            Self::Config { message, .. } => Self::Config { message, help },
            Self::Failed { message, .. } => Self::Failed { message, help },
            Self::Other { message, .. } => Self::Other { message, help },
        }
    }
}

/// Convert `pinlock_core::Error` to the matching `CliError` variant.
///
/// Bad lock files, overrides and configuration are input errors (exit code 2).
/// Resolver and source control failures are collaborator failures and I/O
/// problems are unexpected (both exit code 3).
impl From<pinlock_core::Error> for CliError {
    fn from(err: pinlock_core::Error) -> Self {
        let help = err.help().map(|h| h.to_string());
        match err {
            // Extract just the message to avoid "Configuration error: Configuration error:"
            pinlock_core::Error::Configuration { message, .. } => Self::Config { message, help },
            pinlock_core::Error::Resolution { .. } | pinlock_core::Error::Scm { .. } => {
                Self::Failed {
                    message: err.to_string(),
                    help,
                }
            }
            pinlock_core::Error::Io {
                source,
                path,
                operation,
            } => {
                let path_str = path
                    .as_ref()
                    .map_or(String::new(), |p| format!(" on {}", p.display()));
                Self::other_with_help(
                    format!("I/O {operation} failed{path_str}: {source}"),
                    "Check file permissions and ensure the path exists",
                )
            }
            other if other.is_input_error() => Self::Config {
                message: other.to_string(),
                help,
            },
            other => Self::Other {
                message: other.to_string(),
                help,
            },
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Failed { .. } | CliError::Other { .. } => EXIT_FAILURE,
    }
}

/// Render error appropriately based on JSON flag
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let error_envelope = ErrorEnvelope::new(serde_json::json!({
            "code": match err {
                CliError::Config { .. } => "config",
                CliError::Failed { .. } => "failed",
                CliError::Other { .. } => "other",
            },
            "message": err.to_string()
        }));

        match serde_json::to_string(&error_envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        let _ = io::stderr().flush();
    }
}

/// Output format for command results
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, ValueEnum, Serialize, Deserialize, Default)]
#[must_use]
pub enum OutputFormat {
    /// JSON output format
    Json,
    /// Plain text format
    #[default]
    Text,
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkEnvelope<T> {
    /// Status indicator - always "ok" for success
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Main CLI entry point for pinlock.
///
/// Generates, saves and commits dependency locks, and reports the versions a
/// build would be forced to.
#[derive(Parser, Debug)]
#[command(name = "pinlock")]
#[command(about = "Reproducible dependency resolution through lock files and overrides")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Log output format.
    #[arg(
        long,
        global = true,
        env = "PINLOCK_LOG_FORMAT",
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,

    /// Emit JSON envelope regardless of format.
    #[arg(long, global = true, help = "Emit JSON envelope regardless of format")]
    pub json: bool,

    /// Project and lock settings.
    #[command(flatten)]
    pub project: ProjectArgs,
}

/// Flags that locate the project and adjust its lock configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Project root directory.
    #[arg(
        long,
        short = 'p',
        global = true,
        env = "PINLOCK_PROJECT",
        help = "Project root directory",
        default_value = "."
    )]
    pub project: PathBuf,

    /// Configuration file. Defaults to pinlock.toml in the project root.
    #[arg(
        long,
        global = true,
        env = "PINLOCK_CONFIG",
        help = "Configuration file (default: <project>/pinlock.toml)"
    )]
    pub config: Option<PathBuf>,

    /// Override file in lock format.
    #[arg(
        long,
        global = true,
        env = "PINLOCK_OVERRIDE_FILE",
        help = "Override file in lock format"
    )]
    pub override_file: Option<PathBuf>,

    /// Inline overrides.
    #[arg(
        long,
        global = true,
        env = "PINLOCK_OVERRIDES",
        help = "Inline overrides (group:artifact:version,...)",
        value_name = "OVERRIDES"
    )]
    pub overrides: Option<String>,

    /// Disable lock and override behavior.
    #[arg(
        long,
        global = true,
        env = "PINLOCK_IGNORE",
        help = "Ignore the lock and all overrides"
    )]
    pub ignore: bool,

    /// Apply the generated lock instead of the canonical one.
    #[arg(
        long,
        global = true,
        env = "PINLOCK_USE_GENERATED_LOCK",
        help = "Apply the generated lock instead of the canonical one"
    )]
    pub use_generated_lock: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Resolve the project and write the generated lock.
    #[command(about = "Resolve the project and write the generated lock")]
    Generate,
    /// Promote the generated lock to the canonical location.
    #[command(about = "Promote the generated lock to the canonical location")]
    Save,
    /// Commit canonical lock files to source control.
    #[command(about = "Commit canonical lock files to source control")]
    Commit,
    /// Generate, save and commit in one go.
    #[command(about = "Generate, save and (inside a git work tree) commit")]
    Lock {
        /// Stop after saving.
        #[arg(long, help = "Skip the commit stage")]
        no_commit: bool,
    },
    /// Print the forced versions a build would use.
    #[command(about = "Print the forced versions a build would use")]
    Forces {
        /// Show the directives used while generating instead.
        #[arg(long, help = "Show the directives used while generating a lock")]
        generate: bool,
        /// Output format.
        #[arg(
            long = "output",
            short = 'o',
            help = "Output format",
            value_enum,
            default_value_t = OutputFormat::Text
        )]
        output_format: OutputFormat,
    },
}

impl Commands {
    /// Name used for command spans.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Save => "save",
            Self::Commit => "commit",
            Self::Lock { .. } => "lock",
            Self::Forces { .. } => "forces",
        }
    }
}

impl ProjectArgs {
    /// Build the lock configuration from `pinlock.toml` overlaid with flags.
    ///
    /// A missing default configuration file is fine. A missing file named
    /// explicitly with `--config` is an error.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be loaded or the
    /// resulting configuration is invalid.
    pub fn load_config(&self) -> Result<LockConfig, CliError> {
        let project = if self.project.as_os_str().is_empty() {
            Path::new(".")
        } else {
            self.project.as_path()
        };
        // Lock paths are handed to git, which runs in the project directory.
        let root = std::path::absolute(project).map_err(|e| {
            CliError::config(format!(
                "Cannot resolve project directory {}: {e}",
                self.project.display()
            ))
        })?;
        let path = self
            .config
            .clone()
            .unwrap_or_else(|| root.join(CONFIG_FILE_NAME));

        let loaded = LockConfig::load(&path, root.clone())?;
        let mut config = match loaded {
            Some(config) => config,
            None if self.config.is_some() => {
                return Err(CliError::config_with_help(
                    format!("Configuration file not found: {}", path.display()),
                    "Check the --config path or omit it to use pinlock.toml in the project root",
                ));
            }
            None => {
                tracing::debug!(path = %path.display(), "No configuration file, using defaults");
                LockConfig::new(root)
            }
        };

        if let Some(file) = &self.override_file {
            config.override_file = Some(file.clone());
        }
        if let Some(overrides) = &self.overrides {
            config.overrides = Some(overrides.clone());
        }
        config.ignore |= self.ignore;
        config.use_generated_lock |= self.use_generated_lock;

        config.validate()?;
        Ok(config)
    }
}

/// Parse command line arguments
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pinlock",
            "forces",
            "--overrides",
            "g:a:1.0",
            "--ignore",
            "-o",
            "json",
        ])
        .unwrap();
        assert!(cli.project.ignore);
        assert_eq!(cli.project.overrides.as_deref(), Some("g:a:1.0"));
        assert!(matches!(
            cli.command,
            Some(Commands::Forces {
                generate: false,
                output_format: OutputFormat::Json
            })
        ));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&CliError::config("bad")), EXIT_CLI);
        assert_eq!(
            exit_code_for(&CliError::Failed {
                message: "bad".to_string(),
                help: None
            }),
            EXIT_FAILURE
        );
        assert_eq!(exit_code_for(&CliError::other("bad")), EXIT_FAILURE);
        assert_eq!(EXIT_OK, 0);
    }

    #[test]
    fn test_core_error_mapping() {
        let malformed: CliError = pinlock_core::Error::MalformedOverride {
            spec: "x".to_string(),
            entry: "x".to_string(),
        }
        .into();
        assert_eq!(exit_code_for(&malformed), EXIT_CLI);

        let resolution: CliError = pinlock_core::Error::resolution("boom").into();
        assert_eq!(exit_code_for(&resolution), EXIT_FAILURE);
        assert!(resolution.to_string().contains("boom"));

        let scm: CliError = pinlock_core::Error::scm("rejected", 2).into();
        assert_eq!(exit_code_for(&scm), EXIT_FAILURE);

        let config: CliError =
            pinlock_core::Error::configuration("lockFile must not be empty").into();
        assert_eq!(
            config.to_string(),
            "CLI/configuration error: lockFile must not be empty"
        );
    }

    #[test]
    fn test_load_config_overlays_flags() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "overrides = \"g:a:1.0\"\nincludeTransitive = true\n",
        )
        .unwrap();

        let args = ProjectArgs {
            project: temp.path().to_path_buf(),
            overrides: Some("g:b:2.0".to_string()),
            ignore: true,
            ..ProjectArgs::default()
        };
        let config = args.load_config().unwrap();
        assert_eq!(config.root, temp.path());
        assert!(config.include_transitive);
        assert_eq!(config.overrides.as_deref(), Some("g:b:2.0"));
        assert!(config.ignore);
    }

    #[test]
    fn test_load_config_roots_relative_project_absolutely() {
        let args = ProjectArgs {
            project: PathBuf::from("app"),
            ..ProjectArgs::default()
        };
        let config = args.load_config().unwrap();
        assert!(config.root.is_absolute());
        assert!(config.root.ends_with("app"));
        assert!(config.canonical_lock_path().is_absolute());

        let config = ProjectArgs::default().load_config().unwrap();
        assert!(config.root.is_absolute());
    }

    #[test]
    fn test_load_config_missing_explicit_file() {
        let temp = TempDir::new().unwrap();
        let args = ProjectArgs {
            project: temp.path().to_path_buf(),
            config: Some(temp.path().join("missing.toml")),
            ..ProjectArgs::default()
        };
        let err = args.load_config().unwrap_err();
        assert_eq!(exit_code_for(&err), EXIT_CLI);
    }

    #[test]
    fn test_ok_envelope_serialization() {
        let json = serde_json::to_value(OkEnvelope::new(serde_json::json!({"n": 1}))).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["data"]["n"], 1);
    }
}
