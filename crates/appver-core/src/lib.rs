//! Core library for appver.
//!
//! Everything the `appver` CLI does that is not argument parsing or
//! printing lives here: configuration, request validation, the collaborator
//! boundary, and the result document.
//!
//! # Modules
//!
//! - [`collaborator`] - Collaborator trait and the process-spawning implementation
//! - [`config`] - Configuration loading and management
//! - [`detect`] - Script, interpreter, and module discovery
//! - [`error`] - Configuration error types
//! - [`outcome`] - The collaborator's result document
//! - [`readiness`] - Collaborator readiness checks
//! - [`request`] - Flag validation and argument assembly
//!
//! # Quick Start
//!
//! ```no_run
//! use appver_core::{Collaborator, ConfigLoader, ProcessCollaborator, RequestDefaults,
//!     RequestFlags, VersionOutcome, VersionRequest};
//! use camino::Utf8PathBuf;
//!
//! let cwd = Utf8PathBuf::from(".");
//! let config = ConfigLoader::new().with_project_search(&cwd).load()?;
//! let flags = RequestFlags {
//!     application_key: Some("bookverse-web".into()),
//!     version_map: Some("version-map.yaml".into()),
//!     jfrog_url: Some("https://example.jfrog.io".into()),
//!     jfrog_token: Some("token".into()),
//!     ..Default::default()
//! };
//! let request = VersionRequest::from_flags(flags, &RequestDefaults::from_env(&config), &cwd)?;
//! let collaborator = ProcessCollaborator::locate(&config.collaborator(), None, &cwd)?;
//! let raw = collaborator.resolve(&request)?;
//! println!("{}", VersionOutcome::parse(&raw.stdout)?.app_version);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#![deny(unsafe_code)]

pub mod collaborator;

pub mod config;

pub mod detect;

pub mod error;

pub mod outcome;

pub mod readiness;

pub mod request;

pub use collaborator::{
    Collaborator, CollaboratorError, CollaboratorResult, Invocation, ProcessCollaborator,
    RawOutput,
};

pub use config::{Config, ConfigLoader, LogLevel, OutputFormat};

pub use error::{ConfigError, ConfigResult};

pub use outcome::{PackageTags, VersionOutcome};

pub use request::{RequestDefaults, RequestError, RequestFlags, VersionRequest};

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;
