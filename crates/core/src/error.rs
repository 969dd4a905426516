//! Error types for lock and override operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for pinlock operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading locks, loading overrides or running
/// the lock lifecycle.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A lock or override file exists but is not a valid lock document.
    #[error("Malformed lock file {}: {message}", path.display())]
    #[diagnostic(
        code(pinlock::core::malformed_lock),
        help(
            "The file must be a JSON object mapping \"group:artifact\" to objects with optional string fields \"locked\" and \"requested\""
        )
    )]
    MalformedLock {
        /// Path of the offending file.
        path: PathBuf,
        /// Description of the parse failure.
        message: String,
    },

    /// An inline override entry is not a `group:artifact:version` triple.
    #[error("Malformed override '{entry}' in '{spec}': expected group:artifact:version")]
    #[diagnostic(
        code(pinlock::core::malformed_override),
        help("Inline overrides are comma separated, e.g. com.example:foo:1.2.0,com.example:bar:3.0.0")
    )]
    MalformedOverride {
        /// The complete inline override string.
        spec: String,
        /// The entry that failed to parse.
        entry: String,
    },

    /// A configured override file cannot be read.
    #[error("Cannot read override file {}: {source}", path.display())]
    #[diagnostic(
        code(pinlock::core::unreadable_override_file),
        help("Check the overrideFile setting or the --override-file flag")
    )]
    UnreadableOverrideFile {
        /// The configured override file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A dependency coordinate is not of the form `group:artifact`.
    #[error("Invalid coordinate '{value}': expected group:artifact")]
    #[diagnostic(code(pinlock::core::invalid_coordinate))]
    InvalidCoordinate {
        /// The rejected value.
        value: String,
    },

    /// Save was requested before a lock was generated.
    #[error("Generated lock not found at {}", path.display())]
    #[diagnostic(
        code(pinlock::core::missing_generated_lock),
        help("Run 'pinlock generate' before saving the lock")
    )]
    MissingGeneratedLock {
        /// Where the generated lock was expected.
        path: PathBuf,
    },

    /// The external resolver failed to produce a lock.
    #[error("Dependency resolution failed: {message}")]
    #[diagnostic(
        code(pinlock::core::resolution_failed),
        help("Check the resolver command output above for details")
    )]
    Resolution {
        /// Description of the failure.
        message: String,
    },

    /// A source control operation failed.
    #[error("Source control operation failed after {attempts} attempt(s): {message}")]
    #[diagnostic(
        code(pinlock::core::scm_failed),
        help("Ensure the repository has a reachable remote and that you may push to it")
    )]
    Scm {
        /// The last underlying error.
        message: String,
        /// Number of attempts made.
        attempts: u32,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(pinlock::core::config))]
    Configuration {
        /// Description of the problem.
        message: String,
        /// Configuration file involved, if any.
        path: Option<PathBuf>,
    },

    /// I/O error occurred.
    #[error("I/O error during {operation}{}: {source}", path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(pinlock::core::io_error),
        help("Check that the referenced paths exist and that you have permission to read or write them")
    )]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Optional path where the error occurred.
        path: Option<PathBuf>,
        /// Description of the operation being performed.
        operation: String,
    },
}

impl Error {
    /// Create a new configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            path: None,
        }
    }

    /// Create a new resolution error.
    #[must_use]
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution {
            message: message.into(),
        }
    }

    /// Create a new source control error.
    #[must_use]
    pub fn scm(message: impl Into<String>, attempts: u32) -> Self {
        Self::Scm {
            message: message.into(),
            attempts,
        }
    }

    /// Create an I/O error bound to a path.
    #[must_use]
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
            operation: operation.into(),
        }
    }

    /// Whether the error stems from bad user input (files, flags, configuration)
    /// rather than from a collaborator or the environment.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedLock { .. }
                | Self::MalformedOverride { .. }
                | Self::UnreadableOverrideFile { .. }
                | Self::InvalidCoordinate { .. }
                | Self::MissingGeneratedLock { .. }
                | Self::Configuration { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            path: None,
            operation: "file operation".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_lock_names_file() {
        let error = Error::MalformedLock {
            path: PathBuf::from("/project/dependencies.lock"),
            message: "expected value at line 1 column 1".to_string(),
        };

        let message = error.to_string();
        assert!(message.contains("Malformed lock file"));
        assert!(message.contains("/project/dependencies.lock"));
        assert!(message.contains("line 1 column 1"));
    }

    #[test]
    fn test_malformed_override_names_entry() {
        let error = Error::MalformedOverride {
            spec: "a:b:1,broken".to_string(),
            entry: "broken".to_string(),
        };

        let message = error.to_string();
        assert!(message.contains("'broken'"));
        assert!(message.contains("a:b:1,broken"));
    }

    #[test]
    fn test_io_error_no_path() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = Error::Io {
            source: io_error,
            path: None,
            operation: "writing lock".to_string(),
        };

        let message = error.to_string();
        assert!(message.contains("I/O error during writing lock"));
        assert!(!message.contains(" at "));
    }

    #[test]
    fn test_input_error_classification() {
        assert!(Error::configuration("bad").is_input_error());
        assert!(
            Error::MissingGeneratedLock {
                path: PathBuf::from("build/dependencies.lock"),
            }
            .is_input_error()
        );
        assert!(
            Error::UnreadableOverrideFile {
                path: PathBuf::from("override.lock"),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }
            .is_input_error()
        );
        assert!(!Error::resolution("boom").is_input_error());
        assert!(!Error::scm("rejected", 3).is_input_error());
    }

    #[test]
    fn test_diagnostic_codes() {
        use miette::Diagnostic;

        let error = Error::MissingGeneratedLock {
            path: PathBuf::from("/test"),
        };
        assert_eq!(
            error.code().map(|c| c.to_string()),
            Some("pinlock::core::missing_generated_lock".to_string())
        );
        assert!(error.help().is_some());

        let error = Error::scm("rejected", 2);
        assert!(error.code().is_some());
        assert!(error.to_string().contains("2 attempt(s)"));
    }
}
