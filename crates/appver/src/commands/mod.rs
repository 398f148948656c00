//! Command implementations

pub mod doctor;

pub mod resolve;

use std::time::Duration;

use appver_core::{Config, OutputFormat, RequestDefaults};
use camino::{Utf8Path, Utf8PathBuf};
use indicatif::{ProgressBar, ProgressStyle};

/// Everything a command needs from startup.
#[derive(Debug)]
pub struct RunContext<'a> {
    /// Merged configuration.
    pub config: &'a Config,
    /// Stage fallbacks read from the environment at startup.
    pub defaults: &'a RequestDefaults,
    /// Config files that fed `config`, lowest precedence first.
    pub config_sources: &'a [Utf8PathBuf],
    /// Working directory after `-C`.
    pub cwd: &'a Utf8Path,
    /// Selected output format.
    pub output: OutputFormat,
    /// `-v` count.
    pub verbose: u8,
    /// `--script` override, if any.
    pub script: Option<&'a Utf8Path>,
}

/// A stderr spinner; hidden automatically when stderr is not a terminal.
pub fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}
