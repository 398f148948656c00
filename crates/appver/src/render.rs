//! Result renderers.
//!
//! The output mode is resolved once at startup by [`select_renderer`].
//! Renderers that need a parsed [`VersionOutcome`] fall back to the raw
//! rendering when the collaborator's stdout is not a result document, so
//! rendering never fails on content, only on I/O.

use std::io::{self, Write};

use appver_core::{OutputFormat, RawOutput, VersionOutcome};
use owo_colors::{OwoColorize, Stream};
use tracing::{debug, warn};

/// Printed in place of a missing build number.
const NO_BUILD_NUMBER: &str = "n/a";

/// Turns collaborator output into what the user sees on stdout.
pub trait ResultRenderer {
    /// Write the rendered result.
    ///
    /// # Errors
    ///
    /// Only I/O errors from `out`.
    fn render(&self, raw: &RawOutput, out: &mut dyn Write) -> io::Result<()>;

    /// Whether stdout must stay free of informational lines.
    fn machine_readable(&self) -> bool {
        false
    }
}

/// Pick the renderer for an output format.
pub fn select_renderer(format: OutputFormat) -> Box<dyn ResultRenderer> {
    debug!(?format, "renderer selected");
    match format {
        OutputFormat::Summary => Box::new(SummaryRenderer),
        OutputFormat::Raw => Box::new(RawRenderer),
        OutputFormat::Json => Box::new(JsonRenderer),
    }
}

/// Human-readable summary: version, build number, package tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryRenderer;

impl ResultRenderer for SummaryRenderer {
    fn render(&self, raw: &RawOutput, out: &mut dyn Write) -> io::Result<()> {
        let outcome = match VersionOutcome::parse(&raw.stdout) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "collaborator output is not a result document");
                return RawRenderer.render(raw, out);
            }
        };

        if outcome.app_semver().is_none() {
            warn!(app_version = %outcome.app_version, "app version is not valid semver");
        }

        writeln!(
            out,
            "{} {}",
            "App Version:".if_supports_color(Stream::Stdout, |t| t.bold()),
            outcome.app_version
        )?;
        writeln!(
            out,
            "{} {}",
            "Build Number:".if_supports_color(Stream::Stdout, |t| t.bold()),
            outcome.build_number.as_deref().unwrap_or(NO_BUILD_NUMBER)
        )?;

        if !outcome.package_tags.is_empty() {
            writeln!(
                out,
                "{}",
                "Package Tags:".if_supports_color(Stream::Stdout, |t| t.bold())
            )?;
            for (package, tag) in outcome.package_tags.iter() {
                writeln!(
                    out,
                    "  {package}: {}",
                    tag.if_supports_color(Stream::Stdout, |t| t.cyan())
                )?;
            }
        }
        Ok(())
    }
}

/// Degraded mode: a success line and the output verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawRenderer;

impl ResultRenderer for RawRenderer {
    fn render(&self, raw: &RawOutput, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "{} Version resolution completed",
            "✓".if_supports_color(Stream::Stdout, |t| t.green())
        )?;
        out.write_all(raw.stdout.as_bytes())?;
        if !raw.stdout.is_empty() && !raw.stdout.ends_with('\n') {
            writeln!(out)?;
        }
        Ok(())
    }
}

/// Pretty-printed result document for scripting.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl ResultRenderer for JsonRenderer {
    fn render(&self, raw: &RawOutput, out: &mut dyn Write) -> io::Result<()> {
        match VersionOutcome::parse(&raw.stdout) {
            Ok(outcome) => {
                serde_json::to_writer_pretty(&mut *out, &outcome)?;
                writeln!(out)
            }
            Err(err) => {
                warn!(error = %err, "collaborator output is not a result document");
                write!(out, "{}", raw.stdout)
            }
        }
    }

    fn machine_readable(&self) -> bool {
        true
    }
}
