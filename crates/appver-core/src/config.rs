//! Configuration loading and discovery.
//!
//! Configuration is resolved once at startup and passed down the call chain
//! as an immutable [`Config`]. Sources are layered with figment:
//!
//! 1. Built-in defaults
//! 2. User config: `~/.config/appver/config.<ext>`
//! 3. Project config: `.appver.<ext>` or `appver.<ext>` in the working
//!    directory or any parent, stopping at a `.git` boundary
//! 4. Explicit files passed with `--config`
//!
//! Later sources win. `<ext>` is one of `toml`, `yaml`, `yml`, `json`.
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use appver_core::config::ConfigLoader;
//!
//! let cwd = Utf8PathBuf::from(".");
//! let config = ConfigLoader::new()
//!     .with_project_search(&cwd)
//!     .load()
//!     .unwrap();
//! println!("{:?}", config.output_format());
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Interpreter used to run the collaborator script when none is configured.
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Modules `doctor` expects the default collaborator to import.
pub const DEFAULT_REQUIRED_MODULES: &[&str] = &["yaml"];

/// The configuration for appver.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// Repository stage used when neither `--stage` nor `PACKAGE_REPO_STAGE`
    /// is set.
    pub stage: Option<String>,
    /// How to locate and run the version collaborator.
    pub collaborator: Option<CollaboratorConfig>,
    /// Result rendering.
    pub output: Option<OutputConfig>,
}

impl Config {
    /// The configured output format, or the default summary rendering.
    pub fn output_format(&self) -> OutputFormat {
        self.output
            .as_ref()
            .and_then(|o| o.format)
            .unwrap_or_default()
    }

    /// The collaborator section, or an empty one when absent.
    pub fn collaborator(&self) -> CollaboratorConfig {
        self.collaborator.clone().unwrap_or_default()
    }
}

/// Collaborator location and runtime requirements.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CollaboratorConfig {
    /// Path to the collaborator script. Relative paths resolve against the
    /// working directory.
    pub script: Option<Utf8PathBuf>,
    /// Interpreter that runs the script (default: `python3`).
    pub interpreter: Option<String>,
    /// Modules `doctor` checks the interpreter can import (default:
    /// `["yaml"]`). Version resolution never probes them.
    pub required_modules: Option<Vec<String>>,
}

impl CollaboratorConfig {
    /// Interpreter name or path, falling back to [`DEFAULT_INTERPRETER`].
    pub fn interpreter(&self) -> &str {
        self.interpreter
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_INTERPRETER)
    }

    /// Modules to probe in readiness checks.
    pub fn required_modules(&self) -> Vec<String> {
        match &self.required_modules {
            Some(modules) => modules.clone(),
            None => DEFAULT_REQUIRED_MODULES
                .iter()
                .map(|m| (*m).to_string())
                .collect(),
        }
    }
}

/// Output section.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct OutputConfig {
    /// Rendering mode for the collaborator result.
    pub format: Option<OutputFormat>,
}

/// How the collaborator result is printed.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Parse the result and print a human-readable summary.
    #[default]
    Summary,
    /// Print the collaborator output verbatim.
    Raw,
    /// Print the parsed result as pretty JSON.
    Json,
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Supported configuration file extensions (in order of preference).
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "appver";

/// Builder for loading configuration from multiple sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    project_search_root: Option<Utf8PathBuf>,
    include_user_config: bool,
    boundary_marker: Option<String>,
    explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader that includes user config and stops
    /// project discovery at `.git`.
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
        }
    }

    /// Walk up from `path` looking for a project config file.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set whether to include user config from `~/.config/appver/`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Stop project discovery at a directory containing `marker`.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Search all the way to the filesystem root.
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add an explicit config file. Explicit files are merged last, in the
    /// order they were added.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Config files that [`load`](Self::load) would merge, lowest precedence
    /// first.
    pub fn sources(&self) -> Vec<Utf8PathBuf> {
        let mut sources = Vec::new();
        if self.include_user_config
            && let Some(user) = find_user_config()
        {
            sources.push(user);
        }
        if let Some(ref root) = self.project_search_root
            && let Some(project) = self.find_project_config(root)
        {
            sources.push(project);
        }
        sources.extend(self.explicit_files.iter().cloned());
        sources
    }

    /// Load configuration, merging all discovered sources over the defaults.
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        let sources = self.sources();
        tracing::debug!(count = sources.len(), "loading configuration");

        for file in &self.explicit_files {
            if !file.is_file() {
                return Err(ConfigError::MissingFile(file.clone()));
            }
        }

        let figment = sources.iter().fold(
            Figment::new().merge(Serialized::defaults(Config::default())),
            |figment, path| merge_file(figment, path),
        );

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            sources = ?sources,
            "configuration loaded"
        );
        Ok(config)
    }

    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        for dir in start.ancestors() {
            if let Some(found) = config_in_dir(dir) {
                return Some(found);
            }
            // The directory holding the marker is the last one searched.
            if let Some(ref marker) = self.boundary_marker
                && dir.join(marker).exists()
            {
                break;
            }
        }
        None
    }
}

/// Look for `.appver.<ext>` then `appver.<ext>` in a single directory.
fn config_in_dir(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    CONFIG_EXTENSIONS.iter().find_map(|ext| {
        [format!(".{APP_NAME}.{ext}"), format!("{APP_NAME}.{ext}")]
            .into_iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

fn find_user_config() -> Option<Utf8PathBuf> {
    let dir = user_config_dir()?;
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("config.{ext}")))
        .find(|path| path.is_file())
}

fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
    match path.extension() {
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
        Some("json") => figment.merge(Json::file_exact(path.as_str())),
        _ => figment.merge(Toml::file_exact(path.as_str())),
    }
}

/// Find the project config file path without loading it.
pub fn find_project_config<P: AsRef<Utf8Path>>(start: P) -> Option<Utf8PathBuf> {
    ConfigLoader::new().find_project_config(start.as_ref())
}

/// The user config directory (`~/.config/appver/` on Linux).
///
/// Returns `None` if the home directory cannot be determined.
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("", "", APP_NAME)?;
    Utf8PathBuf::from_path_buf(proj_dirs.config_dir().to_path_buf()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn utf8(path: std::path::PathBuf) -> Utf8PathBuf {
        Utf8PathBuf::try_from(path).unwrap()
    }

    fn load_file(contents: &str, name: &str) -> Config {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(name);
        fs::write(&path, contents).unwrap();
        ConfigLoader::new()
            .with_user_config(false)
            .with_file(utf8(path))
            .load()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.log_dir.is_none());
        assert!(config.stage.is_none());
        assert_eq!(config.output_format(), OutputFormat::Summary);
    }

    #[test]
    fn test_loader_builds_with_defaults() {
        let config = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .load()
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_collaborator_defaults() {
        let collab = Config::default().collaborator();
        assert_eq!(collab.interpreter(), "python3");
        assert_eq!(collab.required_modules(), vec!["yaml".to_string()]);
        assert!(collab.script.is_none());
    }

    #[test]
    fn test_blank_interpreter_falls_back() {
        let collab = CollaboratorConfig {
            interpreter: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(collab.interpreter(), DEFAULT_INTERPRETER);
    }

    #[test]
    fn test_toml_sections() {
        let config = load_file(
            r#"
log_level = "debug"
stage = "bookverse-QA"

[collaborator]
script = "tools/versions.py"
interpreter = "python3.12"
required_modules = []

[output]
format = "raw"
"#,
            "config.toml",
        );

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.stage.as_deref(), Some("bookverse-QA"));
        let collab = config.collaborator();
        assert_eq!(collab.script.as_deref(), Some(Utf8Path::new("tools/versions.py")));
        assert_eq!(collab.interpreter(), "python3.12");
        assert!(collab.required_modules().is_empty());
        assert_eq!(config.output_format(), OutputFormat::Raw);
    }

    #[test]
    fn test_yaml_and_json_formats() {
        let yaml = load_file("output:\n  format: json\n", "config.yaml");
        assert_eq!(yaml.output_format(), OutputFormat::Json);

        let json = load_file(r#"{"stage": "PROD"}"#, "config.json");
        assert_eq!(json.stage.as_deref(), Some("PROD"));
    }

    #[test]
    fn test_later_file_overrides_earlier() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("base.toml");
        fs::write(&base, r#"stage = "DEV""#).unwrap();
        let over = tmp.path().join("override.toml");
        fs::write(&over, r#"stage = "QA""#).unwrap();

        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_file(utf8(base))
            .with_file(utf8(over))
            .load()
            .unwrap();

        assert_eq!(config.stage.as_deref(), Some("QA"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let missing = utf8(tmp.path().join("nope.toml"));
        let result = ConfigLoader::new()
            .with_user_config(false)
            .with_file(&missing)
            .load();
        assert!(matches!(result, Err(ConfigError::MissingFile(p)) if p == missing));
    }

    #[test]
    fn test_invalid_value_is_deserialize_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        fs::write(&path, "[output]\nformat = \"fancy\"\n").unwrap();
        let result = ConfigLoader::new()
            .with_user_config(false)
            .with_file(utf8(path))
            .load();
        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn test_project_config_discovery() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("project");
        let deep = project.join("src").join("deep");
        fs::create_dir_all(&deep).unwrap();
        fs::write(project.join(".appver.toml"), r#"stage = "STAGING""#).unwrap();

        let config = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .with_project_search(utf8(deep))
            .load()
            .unwrap();

        assert_eq!(config.stage.as_deref(), Some("STAGING"));
    }

    #[test]
    fn test_dotfile_preferred_over_plain_name() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".appver.toml"), r#"stage = "A""#).unwrap();
        fs::write(tmp.path().join("appver.toml"), r#"stage = "B""#).unwrap();

        let found = find_project_config(utf8(tmp.path().to_path_buf())).unwrap();
        assert_eq!(found.file_name(), Some(".appver.toml"));
    }

    #[test]
    fn test_boundary_marker_stops_search() {
        let tmp = TempDir::new().unwrap();
        let parent = tmp.path().join("parent");
        let child = parent.join("child");
        let work = child.join("work");
        fs::create_dir_all(&work).unwrap();
        fs::write(parent.join(".appver.toml"), r#"stage = "QA""#).unwrap();
        fs::create_dir(child.join(".git")).unwrap();

        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_boundary_marker(".git")
            .with_project_search(utf8(work))
            .load()
            .unwrap();

        assert!(config.stage.is_none());
    }

    #[test]
    fn test_boundary_in_start_dir_is_searched_then_stops() {
        let tmp = TempDir::new().unwrap();
        let repo = tmp.path().join("repo");
        fs::create_dir_all(repo.join(".git")).unwrap();
        fs::write(tmp.path().join(".appver.toml"), r#"stage = "OUTER""#).unwrap();

        assert!(find_project_config(utf8(repo.clone())).is_none());

        fs::write(repo.join(".appver.toml"), r#"stage = "REPO""#).unwrap();
        assert_eq!(
            find_project_config(utf8(repo.clone())),
            Some(utf8(repo.join(".appver.toml")))
        );
    }

    #[test]
    fn test_sources_lists_project_then_explicit() {
        let tmp = TempDir::new().unwrap();
        let root = utf8(tmp.path().to_path_buf());
        fs::write(root.join("appver.yaml"), "stage: QA\n").unwrap();
        let explicit = root.join("extra.toml");
        fs::write(&explicit, "").unwrap();

        let sources = ConfigLoader::new()
            .with_user_config(false)
            .with_project_search(&root)
            .with_file(&explicit)
            .sources();

        assert_eq!(sources, vec![root.join("appver.yaml"), explicit]);
    }
}
