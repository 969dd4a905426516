//! pinlock CLI Application
//!
//! Generates, saves and commits dependency lock files and reports the
//! versions a build is forced to.

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

use pinlock::cli::{self, CliError, EXIT_OK, OkEnvelope, exit_code_for, render_error};
use pinlock::commands;
use pinlock::tracing::{self, TracingConfig};

fn main() {
    // NOTE: Using eprintln! in panic hook is intentional - tracing infrastructure
    // may be corrupted during a panic, so we use the most reliable output method.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();
    std::process::exit(run(cli));
}

fn run(cli: cli::Cli) -> i32 {
    let tracing_config = TracingConfig {
        format: if cli.json {
            tracing::TracingFormat::Json
        } else {
            cli.log_format
        },
        level: cli.level.into(),
        ..Default::default()
    };
    // Ignore error if tracing already initialized (e.g., in tests)
    let _ = tracing::init_tracing(tracing_config);

    let Some(command) = cli.command else {
        render_error(
            &CliError::config_with_help(
                "No subcommand provided",
                "Run 'pinlock --help' for usage information",
            ),
            cli.json,
        );
        return exit_code_for(&CliError::config("No subcommand provided"));
    };

    let result = cli
        .project
        .load_config()
        .and_then(|config| commands::execute(&command, &config));

    match result {
        Ok(output) => {
            if cli.json {
                match serde_json::to_string(&OkEnvelope::new(output.data)) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        let err = CliError::other(format!("JSON serialization failed: {e}"));
                        render_error(&err, true);
                        return exit_code_for(&err);
                    }
                }
            } else if !output.text.is_empty() {
                println!("{}", output.text);
            }
            EXIT_OK
        }
        Err(err) => {
            render_error(&err, cli.json);
            exit_code_for(&err)
        }
    }
}
