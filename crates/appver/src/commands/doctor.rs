//! Doctor command: diagnose configuration and collaborator readiness.

use std::io::Write;

use appver_core::config;
use appver_core::readiness::{self, ReadinessReport};
use appver_core::request::STAGE_ENV;
use clap::Args;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;
use tracing::{debug, instrument};

use super::RunContext;

/// Arguments for the `doctor` subcommand.
#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct DoctorReport {
    config: ConfigStatus,
    readiness: ReadinessReport,
    default_stage: String,
    environment: EnvironmentInfo,
}

#[derive(Serialize)]
struct ConfigStatus {
    /// Config files that were merged, lowest precedence first
    files: Vec<String>,
    /// Where a user-level config file would live
    user_dir: Option<String>,
}

#[derive(Serialize)]
struct EnvironmentInfo {
    cwd: String,
    env_vars: Vec<EnvVar>,
}

#[derive(Serialize)]
struct EnvVar {
    name: &'static str,
    value: Option<String>,
    description: &'static str,
}

const WATCHED_VARS: &[(&str, &str)] = &[
    (STAGE_ENV, "Default repository stage"),
    ("GITHUB_ENV", "File the collaborator exports variables to"),
    ("RUST_LOG", "Log filter directive"),
    ("APPVER_LOG_PATH", "Explicit log file path"),
    ("APPVER_LOG_DIR", "Log directory"),
];

impl DoctorReport {
    fn gather(ctx: &RunContext<'_>) -> Self {
        Self {
            config: ConfigStatus {
                files: ctx.config_sources.iter().map(ToString::to_string).collect(),
                user_dir: config::user_config_dir().map(|p| p.to_string()),
            },
            readiness: readiness::check_collaborator(
                &ctx.config.collaborator(),
                ctx.script,
                ctx.cwd,
            ),
            default_stage: ctx.defaults.stage(),
            environment: EnvironmentInfo {
                cwd: ctx.cwd.to_string(),
                env_vars: WATCHED_VARS
                    .iter()
                    .map(|&(name, description)| EnvVar {
                        name,
                        value: std::env::var(name).ok(),
                        description,
                    })
                    .collect(),
            },
        }
    }
}

/// Run diagnostics and report readiness.
///
/// Fails when any readiness check fails, after printing the report.
#[instrument(name = "cmd_doctor", skip_all, fields(json_output))]
pub fn cmd_doctor(_args: DoctorArgs, json: bool, ctx: &RunContext<'_>) -> anyhow::Result<()> {
    tracing::Span::current().record("json_output", json);

    let spinner = super::spinner("Gathering diagnostics...");
    let report = DoctorReport::gather(ctx);
    spinner.finish_and_clear();
    debug!(all_passed = report.readiness.all_passed, "diagnostics gathered");

    let mut stdout = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, &report)?;
        writeln!(stdout)?;
    } else {
        print_report(&report, &mut stdout)?;
    }

    if !report.readiness.all_passed {
        anyhow::bail!("collaborator is not ready");
    }
    Ok(())
}

fn print_report(report: &DoctorReport, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "{}", heading("Configuration"))?;
    if report.config.files.is_empty() {
        writeln!(out, "  {} No config file found", mark_neutral())?;
    } else {
        for file in &report.config.files {
            writeln!(out, "  {} Config file: {file}", mark(true))?;
        }
    }
    if let Some(ref dir) = report.config.user_dir {
        writeln!(out, "  User config dir: {dir}")?;
    }
    writeln!(out)?;

    writeln!(out, "{}", heading("Collaborator"))?;
    for check in &report.readiness.checks {
        writeln!(out, "  {} {}: {}", mark(check.passed), check.name, check.message)?;
    }
    writeln!(out)?;

    writeln!(out, "{}", heading("Environment"))?;
    writeln!(out, "  Working directory: {}", report.environment.cwd)?;
    writeln!(out, "  Default stage: {}", report.default_stage)?;
    let set_vars: Vec<_> = report
        .environment
        .env_vars
        .iter()
        .filter_map(|v| v.value.as_deref().map(|value| (v, value)))
        .collect();
    if set_vars.is_empty() {
        writeln!(out, "  {} No appver environment variables set", mark_neutral())?;
    } else {
        for (var, value) in set_vars {
            writeln!(out, "  {}: {value} ({})", var.name, var.description)?;
        }
    }
    Ok(())
}

fn heading(title: &str) -> String {
    title
        .if_supports_color(Stream::Stdout, |t| t.bold())
        .to_string()
}

fn mark(passed: bool) -> String {
    if passed {
        "✓".if_supports_color(Stream::Stdout, |t| t.green()).to_string()
    } else {
        "✗".if_supports_color(Stream::Stdout, |t| t.red()).to_string()
    }
}

fn mark_neutral() -> String {
    "○".if_supports_color(Stream::Stdout, |t| t.yellow()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use appver_core::Config;
    use appver_core::config::CollaboratorConfig;
    use appver_core::{OutputFormat, RequestDefaults};
    use camino::Utf8PathBuf;

    fn ready_config(dir: &Utf8PathBuf) -> Config {
        std::fs::write(dir.join("fake.sh"), "").unwrap();
        Config {
            collaborator: Some(CollaboratorConfig {
                script: Some("fake.sh".into()),
                interpreter: Some("sh".into()),
                required_modules: Some(Vec::new()),
            }),
            ..Default::default()
        }
    }

    static DEFAULTS: RequestDefaults = RequestDefaults {
        env_stage: None,
        configured_stage: None,
    };

    fn ctx<'a>(config: &'a Config, cwd: &'a Utf8PathBuf) -> RunContext<'a> {
        RunContext {
            config,
            defaults: &DEFAULTS,
            config_sources: &[],
            cwd,
            output: OutputFormat::Summary,
            verbose: 0,
            script: None,
        }
    }

    #[cfg(unix)]
    #[test]
    fn report_lists_checks_and_stage() {
        owo_colors::set_override(false);
        let tmp = tempfile::TempDir::new().unwrap();
        let cwd = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let config = ready_config(&cwd);

        let report = DoctorReport::gather(&ctx(&config, &cwd));
        assert!(report.readiness.all_passed);

        let mut buf = Vec::new();
        print_report(&report, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Collaborator script:"));
        assert!(text.contains("Interpreter:"));
        assert!(text.contains("No config file found"));
        assert!(text.contains("Default stage: DEV"));
    }

    #[test]
    fn missing_script_fails_doctor() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cwd = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let config = Config {
            collaborator: Some(CollaboratorConfig {
                script: Some("absent.py".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(cmd_doctor(DoctorArgs::default(), true, &ctx(&config, &cwd)).is_err());
    }

    #[test]
    fn report_serializes_to_json() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cwd = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let config = Config::default();
        let report = DoctorReport::gather(&ctx(&config, &cwd));
        let value = serde_json::to_value(&report).unwrap();
        assert!(value["readiness"]["checks"].is_array());
        assert_eq!(value["environment"]["env_vars"].as_array().unwrap().len(), 5);
    }
}
