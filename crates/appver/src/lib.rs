//! Library interface for the `appver` CLI.
//!
//! This crate exposes the CLI's argument parser, renderers, and command
//! implementations as a library, primarily for documentation generation and
//! testing. The actual entry point is in `main.rs`.
//!
//! # Structure
//!
//! - [`Cli`] - The root argument parser (clap derive)
//! - [`Commands`] - Available subcommands
//! - [`commands`] - Command implementations
//! - [`render`] - Result renderers
//! - [`exit`] - Error reporting and exit codes
//!
//! # Documentation Generation
//!
//! The [`command()`] function returns the clap `Command` for generating man pages
//! and shell completions via `xtask`.

pub mod commands;

pub mod exit;

pub mod render;

use appver_core::OutputFormat;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// Color output preference.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect terminal capabilities automatically.
    #[default]
    Auto,
    /// Always emit colors.
    Always,
    /// Never emit colors.
    Never,
}

impl ColorChoice {
    /// Configure global color output based on this choice.
    ///
    /// Call this once at startup to set the color mode.
    pub fn apply(self) {
        match self {
            Self::Auto => {}
            Self::Always => owo_colors::set_override(true),
            Self::Never => owo_colors::set_override(false),
        }
    }
}

const ENV_HELP: &str = "\
ENVIRONMENT VARIABLES:
    PACKAGE_REPO_STAGE  Default for --stage (fallback: config `stage`, then DEV)
    RUST_LOG            Log filter (e.g., debug, appver=trace)
    APPVER_LOG_PATH     Explicit log file path
    APPVER_LOG_DIR      Log directory
";

/// Command-line interface definition for appver.
///
/// Without a subcommand, appver resolves versions using the top-level
/// flags.
#[derive(Parser)]
#[command(name = "appver")]
#[command(
    about = "Resolve the next application version and package tags for a CI build",
    long_about = None
)]
#[command(version)]
#[command(after_long_help = ENV_HELP)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Optional subcommand; omit to resolve versions.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Version resolution flags.
    #[command(flatten)]
    pub resolve: commands::resolve::ResolveArgs,

    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run as if started in DIR
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub chdir: Option<PathBuf>,

    /// Collaborator script to run (overrides config and discovery)
    #[arg(long, global = true, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Echo the collaborator command and its raw output; repeat for trace logs
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Colorize output
    #[arg(long, global = true, value_enum, default_value_t)]
    pub color: ColorChoice,

    /// How to print the result (default: config, then summary)
    #[arg(long, global = true, value_enum, value_name = "FORMAT")]
    pub output: Option<OutputFormat>,

    /// Output as JSON (shorthand for --output json)
    #[arg(long, global = true)]
    pub json: bool,
}

impl Cli {
    /// The output format after applying `--json`, `--output`, and config.
    pub fn output_format(&self, configured: OutputFormat) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.output.unwrap_or(configured)
        }
    }
}

/// Available subcommands for the CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Diagnose configuration and collaborator readiness
    Doctor(commands::doctor::DoctorArgs),
}

/// Returns the clap command for documentation generation
pub fn command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        command().debug_assert();
    }

    #[test]
    fn json_flag_wins_over_output() {
        let cli = Cli::parse_from(["appver", "--output", "raw", "--json"]);
        assert_eq!(cli.output_format(OutputFormat::Summary), OutputFormat::Json);
    }

    #[test]
    fn output_flag_wins_over_config() {
        let cli = Cli::parse_from(["appver", "--output", "raw"]);
        assert_eq!(cli.output_format(OutputFormat::Json), OutputFormat::Raw);

        let cli = Cli::parse_from(["appver"]);
        assert_eq!(cli.output_format(OutputFormat::Json), OutputFormat::Json);
    }

    #[test]
    fn resolve_flags_parse_at_top_level() {
        let cli = Cli::parse_from([
            "appver",
            "--application-key",
            "bookverse-web",
            "--packages",
            "web,worker",
            "-v",
        ]);
        assert!(cli.command.is_none());
        assert_eq!(cli.resolve.application_key.as_deref(), Some("bookverse-web"));
        assert_eq!(cli.resolve.packages.as_deref(), Some("web,worker"));
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn doctor_subcommand_parses() {
        let cli = Cli::parse_from(["appver", "doctor", "--json"]);
        assert!(matches!(cli.command, Some(Commands::Doctor(_))));
        assert!(cli.json);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = Cli::try_parse_from(["appver", "--bogus"]).err().unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
