//! Error reporting and exit codes.
//!
//! `0` for success, help and version; the collaborator's own exit code when
//! it fails; `1` for everything else.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use appver_core::CollaboratorError;
use clap::error::ErrorKind;
use owo_colors::{OwoColorize, Stream};

/// Exit code for local failures.
pub const FAILURE: u8 = 1;

/// Map an error to the process exit code.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<CollaboratorError>() {
        Some(CollaboratorError::Failure {
            exit_code: Some(code),
            ..
        }) => u8::try_from(*code)
            .ok()
            .filter(|&code| code != 0)
            .unwrap_or(FAILURE),
        _ => FAILURE,
    }
}

/// Print an error, with any collaborator output, to `out`.
pub fn report(err: &anyhow::Error, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        out,
        "{} {err:#}",
        "error:".if_supports_color(Stream::Stderr, |t| t.red().bold().to_string())
    )?;
    if let Some(CollaboratorError::Failure { output, .. }) = err.downcast_ref::<CollaboratorError>()
        && !output.trim().is_empty()
    {
        writeln!(out, "{}", output.trim_end())?;
    }
    Ok(())
}

/// Handle an argument parsing error.
///
/// Help and version requests exit 0. A help flag anywhere before `--` wins
/// over any other parse error. Everything else is printed with usage and
/// exits 1.
pub fn parse_failure(err: &clap::Error, argv: &[OsString]) -> ExitCode {
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            let _ = err.print();
            ExitCode::SUCCESS
        }
        _ if wants_help(argv) => {
            let _ = crate::command().print_help();
            ExitCode::SUCCESS
        }
        _ => {
            let _ = err.print();
            ExitCode::from(FAILURE)
        }
    }
}

fn wants_help(argv: &[OsString]) -> bool {
    argv.iter()
        .skip(1)
        .take_while(|arg| *arg != "--")
        .any(|arg| arg == "--help" || arg == "-h")
}
