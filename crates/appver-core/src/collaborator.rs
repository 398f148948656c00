//! The version collaborator boundary.
//!
//! The CLI never talks to a concrete transport. It hands a
//! [`VersionRequest`] to something implementing [`Collaborator`] and gets
//! back either the captured [`RawOutput`] or a structured
//! [`CollaboratorError`].
//!
//! [`ProcessCollaborator`] is the production implementation: it runs the
//! version-resolution script under an interpreter, once, with no timeout
//! and no retry.

use std::fmt;
use std::process::{Command, Stdio};

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::CollaboratorConfig;
use crate::detect;
use crate::request::VersionRequest;

/// Errors from locating or running the collaborator.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    /// No collaborator script exists at any candidate location.
    #[error("collaborator script not found (searched: {})", join_paths(.searched))]
    MissingScript {
        /// Locations that were checked, in order.
        searched: Vec<Utf8PathBuf>,
    },

    /// The interpreter or a module the script imports is unavailable.
    #[error("missing runtime dependency: {dependency} ({detail})")]
    MissingRuntimeDependency {
        /// The interpreter or module name.
        dependency: String,
        /// What is wrong with it.
        detail: String,
    },

    /// The collaborator ran and exited unsuccessfully.
    #[error("{}", failure_message(.exit_code))]
    Failure {
        /// Exit code, or `None` if the process was killed by a signal.
        exit_code: Option<i32>,
        /// Everything the collaborator printed.
        output: String,
    },

    /// The collaborator could not be spawned.
    #[error("failed to run collaborator: {0}")]
    Exec(#[from] std::io::Error),
}

/// Result alias for collaborator operations.
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

fn join_paths(paths: &[Utf8PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn failure_message(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("version collaborator failed with exit code {code}"),
        None => "version collaborator was terminated by a signal".to_string(),
    }
}

/// What the collaborator printed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    /// Captured standard output; carries the result document.
    pub stdout: String,
    /// Captured standard error; diagnostics only.
    pub stderr: String,
}

impl RawOutput {
    /// Stdout followed by stderr, each trimmed, blank parts skipped.
    pub fn combined(&self) -> String {
        [self.stdout.trim_end(), self.stderr.trim_end()]
            .into_iter()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A command line about to be run, printable with the token masked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program followed by its arguments, credentials masked.
    pub display_argv: Vec<String>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quoted: Vec<String> = self.display_argv.iter().map(|a| shell_quote(a)).collect();
        f.write_str(&quoted.join(" "))
    }
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,@+".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Something that turns a [`VersionRequest`] into collaborator output.
pub trait Collaborator {
    /// How the request would be executed, for display.
    fn invocation(&self, request: &VersionRequest) -> Invocation;

    /// Run the request to completion.
    ///
    /// # Errors
    ///
    /// [`CollaboratorError::Failure`] when the collaborator reports failure,
    /// [`CollaboratorError::MissingRuntimeDependency`] when that failure is
    /// an import error, [`CollaboratorError::Exec`] when it cannot be
    /// started.
    fn resolve(&self, request: &VersionRequest) -> CollaboratorResult<RawOutput>;
}

/// Runs the collaborator script as a child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCollaborator {
    interpreter: Utf8PathBuf,
    script: Utf8PathBuf,
    working_dir: Utf8PathBuf,
}

impl ProcessCollaborator {
    /// Create a collaborator from already-resolved paths.
    pub fn new(
        interpreter: impl Into<Utf8PathBuf>,
        script: impl Into<Utf8PathBuf>,
        working_dir: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
            working_dir: working_dir.into(),
        }
    }

    /// Find the script and the interpreter.
    ///
    /// Starts no processes. Module imports are only probed by
    /// [`crate::readiness::check_collaborator`]; a module missing at run
    /// time surfaces from [`Collaborator::resolve`].
    ///
    /// # Errors
    ///
    /// [`CollaboratorError::MissingScript`] when no candidate script exists,
    /// [`CollaboratorError::MissingRuntimeDependency`] when the interpreter
    /// is not on `PATH`.
    #[instrument(skip(config), fields(cwd = %cwd))]
    pub fn locate(
        config: &CollaboratorConfig,
        script_override: Option<&Utf8Path>,
        cwd: &Utf8Path,
    ) -> CollaboratorResult<Self> {
        let searched = detect::script_candidates(config, script_override, cwd);
        let script = detect::find_script(&searched)
            .ok_or(CollaboratorError::MissingScript { searched })?;

        let name = config.interpreter();
        let interpreter = detect::find_interpreter(name).ok_or_else(|| {
            CollaboratorError::MissingRuntimeDependency {
                dependency: name.to_string(),
                detail: "interpreter not found on PATH".to_string(),
            }
        })?;

        debug!(%script, %interpreter, "collaborator located");
        Ok(Self::new(interpreter, script, cwd))
    }

    /// The script this collaborator runs.
    pub fn script(&self) -> &Utf8Path {
        &self.script
    }

    /// The interpreter that runs the script.
    pub fn interpreter(&self) -> &Utf8Path {
        &self.interpreter
    }
}

impl Collaborator for ProcessCollaborator {
    fn invocation(&self, request: &VersionRequest) -> Invocation {
        let mut display_argv = vec![self.interpreter.to_string(), self.script.to_string()];
        display_argv.extend(request.redacted_args());
        Invocation { display_argv }
    }

    #[instrument(name = "collaborator", skip_all, fields(app = %request.application_key, stage = %request.stage))]
    fn resolve(&self, request: &VersionRequest) -> CollaboratorResult<RawOutput> {
        info!(invocation = %self.invocation(request), "invoking collaborator");

        let output = Command::new(self.interpreter.as_std_path())
            .arg(self.script.as_std_path())
            .args(request.args())
            .current_dir(self.working_dir.as_std_path())
            .stdin(Stdio::null())
            .output()?;

        let raw = RawOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !output.status.success() {
            let exit_code = output.status.code();
            if let Some((module, line)) = missing_module(&raw.stderr) {
                warn!(module, "collaborator cannot import a module");
                return Err(CollaboratorError::MissingRuntimeDependency {
                    dependency: module.to_string(),
                    detail: line.to_string(),
                });
            }
            warn!(?exit_code, "collaborator failed");
            return Err(CollaboratorError::Failure {
                exit_code,
                output: raw.combined(),
            });
        }

        debug!(stdout_bytes = raw.stdout.len(), "collaborator succeeded");
        Ok(raw)
    }
}

/// The module named by an interpreter's import error, with the line it
/// came from.
fn missing_module(stderr: &str) -> Option<(&str, &str)> {
    const MARKER: &str = "No module named ";
    stderr.lines().rev().find_map(|line| {
        let at = line.find(MARKER)?;
        let module = line[at + MARKER.len()..]
            .trim()
            .trim_matches(|c| c == '\'' || c == '"');
        (!module.is_empty()).then_some((module, line.trim()))
    })
}
