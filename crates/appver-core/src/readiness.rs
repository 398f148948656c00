//! Collaborator readiness checks.
//!
//! Runs the same lookups as [`ProcessCollaborator::locate`] but records each
//! step as a [`CheckResult`] instead of stopping at the first failure, so
//! the `doctor` command can show everything that is wrong at once. It also
//! probes the interpreter for the required modules, which `locate` never
//! does.
//!
//! [`ProcessCollaborator::locate`]: crate::collaborator::ProcessCollaborator::locate

use camino::Utf8Path;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::CollaboratorConfig;
use crate::detect;

/// A single readiness check result.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Human-readable name of the check.
    pub name: String,
    /// Whether the check passed.
    pub passed: bool,
    /// Description of the result.
    pub message: String,
}

impl CheckResult {
    fn pass(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: message.into(),
        }
    }

    fn fail(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            message: message.into(),
        }
    }
}

/// Full readiness report.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessReport {
    /// Individual check results.
    pub checks: Vec<CheckResult>,
    /// Whether all checks passed.
    pub all_passed: bool,
}

/// Check that the collaborator could be located and started.
#[instrument(skip(config), fields(cwd = %cwd))]
pub fn check_collaborator(
    config: &CollaboratorConfig,
    script_override: Option<&Utf8Path>,
    cwd: &Utf8Path,
) -> ReadinessReport {
    let mut checks = Vec::new();

    let candidates = detect::script_candidates(config, script_override, cwd);
    checks.push(match detect::find_script(&candidates) {
        Some(script) => CheckResult::pass("Collaborator script", script.as_str()),
        None => CheckResult::fail(
            "Collaborator script",
            format!(
                "not found (searched: {})",
                candidates
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ),
    });

    let name = config.interpreter();
    match detect::find_interpreter(name) {
        Some(interpreter) => {
            checks.push(CheckResult::pass("Interpreter", interpreter.as_str()));
            checks.push(check_modules(&interpreter, &config.required_modules()));
        }
        None => {
            checks.push(CheckResult::fail(
                "Interpreter",
                format!("{name} not found on PATH"),
            ));
        }
    }

    let all_passed = checks.iter().all(|c| c.passed);
    debug!(all_passed, check_count = checks.len(), "readiness complete");

    ReadinessReport { checks, all_passed }
}

fn check_modules(interpreter: &Utf8Path, modules: &[String]) -> CheckResult {
    if modules.is_empty() {
        return CheckResult::pass("Runtime modules", "none required");
    }
    let missing = detect::missing_modules(interpreter, modules);
    if missing.is_empty() {
        CheckResult::pass("Runtime modules", modules.join(", "))
    } else {
        CheckResult::fail(
            "Runtime modules",
            format!("cannot import: {}", missing.join(", ")),
        )
    }
}
