//! Runtime detection for the process collaborator.
//!
//! Finds the collaborator script among candidate locations, resolves the
//! interpreter on `PATH`, and probes the interpreter for the modules the
//! script imports.

use std::process::{Command, Stdio};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, instrument};

use crate::config::CollaboratorConfig;

/// File name of the collaborator script when no path is configured.
pub const DEFAULT_SCRIPT_NAME: &str = "semver_versioning.py";

/// Directory under the working directory searched for the default script.
pub const DEFAULT_SCRIPT_DIR: &str = "scripts";

/// Candidate script locations, in search order.
///
/// An explicit override (the `--script` flag) beats the configured path.
/// With neither, the default script is looked up under `scripts/` in the
/// working directory and then next to the running executable.
pub fn script_candidates(
    config: &CollaboratorConfig,
    script_override: Option<&Utf8Path>,
    cwd: &Utf8Path,
) -> Vec<Utf8PathBuf> {
    if let Some(explicit) = script_override.or(config.script.as_deref()) {
        return vec![anchor(explicit, cwd)];
    }

    let mut candidates = vec![cwd.join(DEFAULT_SCRIPT_DIR).join(DEFAULT_SCRIPT_NAME)];
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| Utf8PathBuf::from_path_buf(exe).ok())
        .and_then(|exe| exe.parent().map(Utf8Path::to_path_buf))
    {
        candidates.push(exe_dir.join(DEFAULT_SCRIPT_NAME));
    }
    candidates
}

/// First candidate that exists as a file.
pub fn find_script(candidates: &[Utf8PathBuf]) -> Option<Utf8PathBuf> {
    let found = candidates.iter().find(|c| c.is_file()).cloned();
    debug!(?found, searched = candidates.len(), "script lookup");
    found
}

/// Resolve an interpreter name (or path) to an executable on `PATH`.
pub fn find_interpreter(name: &str) -> Option<Utf8PathBuf> {
    which::which(name)
        .ok()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

/// Modules from `modules` that `interpreter` cannot import.
///
/// Each module is probed with `<interpreter> -c "import <module>"`. Names
/// that are not dotted identifiers are reported as missing without being
/// run.
#[instrument(skip(modules), fields(count = modules.len()))]
pub fn missing_modules(interpreter: &Utf8Path, modules: &[String]) -> Vec<String> {
    modules
        .iter()
        .filter(|module| !can_import(interpreter, module))
        .cloned()
        .collect()
}

fn can_import(interpreter: &Utf8Path, module: &str) -> bool {
    if !is_module_name(module) {
        debug!(module, "rejecting invalid module name");
        return false;
    }

    let status = Command::new(interpreter.as_std_path())
        .args(["-c", &format!("import {module}")])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    let ok = matches!(status, Ok(s) if s.success());
    debug!(module, ok, "module probe");
    ok
}

fn is_module_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            part.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
                && part.chars().all(|c| c.is_alphanumeric() || c == '_')
        })
}

fn anchor(path: &Utf8Path, cwd: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
