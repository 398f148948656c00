//! Collaborator request: flag validation and argument assembly.
//!
//! Raw flag values arrive as [`RequestFlags`]. [`VersionRequest::from_flags`]
//! validates them in a fixed order (required values first, then the
//! version-map file) and resolves the stage, producing the typed request the
//! collaborator consumes.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::Config;

/// Environment variable supplying the default repository stage.
pub const STAGE_ENV: &str = "PACKAGE_REPO_STAGE";

/// Stage used when neither the flag, the environment, nor config set one.
pub const DEFAULT_STAGE: &str = "DEV";

/// Errors from request validation.
#[derive(Error, Debug)]
pub enum RequestError {
    /// A required flag was absent or empty.
    #[error("missing required argument: {flag} is required")]
    MissingRequiredArgument {
        /// The flag, including its leading dashes.
        flag: &'static str,
    },

    /// The version-map path does not point at a file.
    #[error("version map file not found: {path}")]
    FileNotFound {
        /// The path as given on the command line.
        path: Utf8PathBuf,
    },
}

/// Result alias for request validation.
pub type RequestResult<T> = Result<T, RequestError>;

/// Flag values exactly as parsed, before validation.
#[derive(Debug, Clone, Default)]
pub struct RequestFlags {
    /// `--application-key`
    pub application_key: Option<String>,
    /// `--version-map`
    pub version_map: Option<Utf8PathBuf>,
    /// `--jfrog-url`
    pub jfrog_url: Option<String>,
    /// `--jfrog-token`
    pub jfrog_token: Option<String>,
    /// `--project-key`
    pub project_key: Option<String>,
    /// `--packages` (comma-separated)
    pub packages: Option<String>,
    /// `--stage`
    pub stage: Option<String>,
}

/// Stage fallbacks, captured once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDefaults {
    /// Value of [`STAGE_ENV`] at startup.
    pub env_stage: Option<String>,
    /// `stage` from configuration.
    pub configured_stage: Option<String>,
}

impl RequestDefaults {
    /// Read [`STAGE_ENV`] and combine it with the configured stage.
    ///
    /// This is the only place the process environment is consulted for
    /// request values.
    pub fn from_env(config: &Config) -> Self {
        Self {
            env_stage: std::env::var(STAGE_ENV).ok(),
            configured_stage: config.stage.clone(),
        }
    }

    /// The stage a request gets when `--stage` is omitted.
    pub fn stage(&self) -> String {
        resolve_stage(
            None,
            self.env_stage.as_deref(),
            self.configured_stage.as_deref(),
        )
    }
}

/// Resolve the repository stage: flag, then environment, then config,
/// then [`DEFAULT_STAGE`]. Blank values count as unset.
pub fn resolve_stage(flag: Option<&str>, env: Option<&str>, configured: Option<&str>) -> String {
    [flag, env, configured]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(DEFAULT_STAGE)
        .to_string()
}

/// A credential that never appears in `Debug` or `Display` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Placeholder shown wherever the secret would be printed.
    pub const MASK: &'static str = "***";

    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The underlying value, for handing to the collaborator.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", Self::MASK)
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::MASK)
    }
}

/// A validated request for the version collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRequest {
    /// Application whose version is being determined.
    pub application_key: String,
    /// Version-map file, as given (relative paths stay relative).
    pub version_map: Utf8PathBuf,
    /// JFrog platform base URL.
    pub jfrog_url: String,
    /// JFrog access token.
    pub jfrog_token: Secret,
    /// Optional JFrog project key.
    pub project_key: Option<String>,
    /// Packages to compute tags for, in the order given.
    pub packages: Vec<String>,
    /// Resolved repository stage.
    pub stage: String,
}

impl VersionRequest {
    /// Validate parsed flags and build a request.
    ///
    /// Required values are checked in the order application key, version
    /// map, JFrog URL, JFrog token; the version-map file is checked only
    /// after all four are present. `cwd` anchors relative version-map paths.
    ///
    /// # Errors
    ///
    /// [`RequestError::MissingRequiredArgument`] for the first absent or
    /// empty required flag, [`RequestError::FileNotFound`] when the version
    /// map is not a file.
    #[instrument(skip_all, fields(cwd = %cwd))]
    pub fn from_flags(
        flags: RequestFlags,
        defaults: &RequestDefaults,
        cwd: &Utf8Path,
    ) -> RequestResult<Self> {
        let application_key = required(flags.application_key, "--application-key")?;
        let version_map = required(
            flags.version_map.map(Utf8PathBuf::into_string),
            "--version-map",
        )
        .map(Utf8PathBuf::from)?;
        let jfrog_url = required(flags.jfrog_url, "--jfrog-url")?;
        let jfrog_token = required(flags.jfrog_token, "--jfrog-token").map(Secret::new)?;

        let on_disk = if version_map.is_absolute() {
            version_map.clone()
        } else {
            cwd.join(&version_map)
        };
        if !on_disk.is_file() {
            return Err(RequestError::FileNotFound { path: version_map });
        }

        let stage = resolve_stage(
            flags.stage.as_deref(),
            defaults.env_stage.as_deref(),
            defaults.configured_stage.as_deref(),
        );

        let request = Self {
            application_key,
            version_map,
            jfrog_url,
            jfrog_token,
            project_key: flags.project_key.filter(|k| !k.trim().is_empty()),
            packages: flags.packages.as_deref().map(split_packages).unwrap_or_default(),
            stage,
        };
        debug!(?request, "request validated");
        Ok(request)
    }

    /// Ordered collaborator arguments, token included.
    pub fn args(&self) -> Vec<String> {
        self.build_args(self.jfrog_token.expose())
    }

    /// Ordered collaborator arguments with the token masked, for display.
    pub fn redacted_args(&self) -> Vec<String> {
        self.build_args(Secret::MASK)
    }

    fn build_args(&self, token: &str) -> Vec<String> {
        let mut args = vec![
            "--application-key".to_string(),
            self.application_key.clone(),
            "--version-map".to_string(),
            self.version_map.to_string(),
            "--jfrog-url".to_string(),
            self.jfrog_url.clone(),
            "--jfrog-token".to_string(),
            token.to_string(),
        ];
        if let Some(ref key) = self.project_key {
            args.extend(["--project-key".to_string(), key.clone()]);
        }
        if !self.packages.is_empty() {
            args.extend(["--packages".to_string(), self.packages.join(",")]);
        }
        args.extend(["--stage".to_string(), self.stage.clone()]);
        args
    }
}

fn required(value: Option<String>, flag: &'static str) -> RequestResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(RequestError::MissingRequiredArgument { flag })
}

fn split_packages(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
