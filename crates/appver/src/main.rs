//! appver CLI
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use appver::commands::RunContext;
use appver::{Cli, Commands, commands, exit};
use appver_core::RequestDefaults;
use appver_core::config::ConfigLoader;
use camino::Utf8PathBuf;
use clap::Parser;
use tracing::debug;

mod observability;

fn main() -> ExitCode {
    let argv: Vec<_> = std::env::args_os().collect();
    let cli = match Cli::try_parse_from(&argv) {
        Ok(cli) => cli,
        Err(err) => return exit::parse_failure(&err, &argv),
    };
    cli.color.apply();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "fatal error");
            let _ = exit::report(&err, &mut std::io::stderr());
            ExitCode::from(exit::exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(ref dir) = cli.chdir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("failed to change directory to {}", dir.display()))?;
    }

    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let cwd = utf8(cwd, "current directory")?;

    let mut loader = ConfigLoader::new().with_project_search(&cwd);
    if let Some(ref config_path) = cli.config {
        loader = loader.with_file(utf8(config_path.clone(), "config path")?);
    }
    let config_sources = loader.sources();
    let config = loader.load().context("failed to load configuration")?;

    let obs_config = observability::ObservabilityConfig::new(
        config
            .log_dir
            .as_ref()
            .map(|dir| dir.as_std_path().to_path_buf()),
    );
    let env_filter = observability::env_filter(cli.quiet, cli.verbose, config.log_level.as_str());
    let _guard = observability::init_observability(&obs_config, env_filter)
        .context("failed to initialize logging")?;

    let script = cli
        .script
        .clone()
        .map(|path| utf8(path, "script path"))
        .transpose()?;
    let output = cli.output_format(config.output_format());
    let defaults = RequestDefaults::from_env(&config);

    debug!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        ?output,
        ?defaults,
        color = ?cli.color,
        chdir = ?cli.chdir,
        "CLI initialized"
    );

    let ctx = RunContext {
        config: &config,
        defaults: &defaults,
        config_sources: &config_sources,
        cwd: &cwd,
        output,
        verbose: cli.verbose,
        script: script.as_deref(),
    };

    match cli.command {
        Some(Commands::Doctor(args)) => {
            commands::doctor::cmd_doctor(args, output == appver_core::OutputFormat::Json, &ctx)
        }
        None => commands::resolve::cmd_resolve(cli.resolve, &ctx),
    }
}

fn utf8(path: PathBuf, what: &str) -> anyhow::Result<Utf8PathBuf> {
    Utf8PathBuf::try_from(path)
        .map_err(|e| anyhow::anyhow!("{what} is not valid UTF-8: {}", e.into_path_buf().display()))
}
