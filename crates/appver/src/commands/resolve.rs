//! Resolve command: validate flags, run the collaborator, print the result.

use std::io::Write;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Args;
use owo_colors::{OwoColorize, Stream};
use tracing::{debug, instrument};

use appver_core::{Collaborator, ProcessCollaborator, RawOutput, RequestFlags, VersionRequest};

use super::RunContext;
use crate::render::{self, ResultRenderer};

/// Printed after every successful run.
pub const EXPORT_NOTICE: &str = "Environment variables exported for GitHub Actions";

/// Version resolution flags (top-level).
#[derive(Args, Debug, Default)]
pub struct ResolveArgs {
    /// Application key to resolve a version for (required)
    #[arg(long, value_name = "KEY")]
    pub application_key: Option<String>,

    /// Version map file consumed by the collaborator (required)
    #[arg(long, value_name = "PATH")]
    pub version_map: Option<Utf8PathBuf>,

    /// JFrog platform URL (required)
    #[arg(long, value_name = "URL")]
    pub jfrog_url: Option<String>,

    /// JFrog access token (required)
    #[arg(long, value_name = "TOKEN")]
    pub jfrog_token: Option<String>,

    /// JFrog project key
    #[arg(long, value_name = "KEY")]
    pub project_key: Option<String>,

    /// Comma-separated package names to compute tags for
    #[arg(long, value_name = "LIST")]
    pub packages: Option<String>,

    /// Repository stage [default: $PACKAGE_REPO_STAGE, else DEV]
    #[arg(long, value_name = "STAGE")]
    pub stage: Option<String>,
}

impl From<ResolveArgs> for RequestFlags {
    fn from(args: ResolveArgs) -> Self {
        Self {
            application_key: args.application_key,
            version_map: args.version_map,
            jfrog_url: args.jfrog_url,
            jfrog_token: args.jfrog_token,
            project_key: args.project_key,
            packages: args.packages,
            stage: args.stage,
        }
    }
}

/// Validate, locate the collaborator, and run it.
#[instrument(name = "cmd_resolve", skip_all, fields(output = ?ctx.output))]
pub fn cmd_resolve(args: ResolveArgs, ctx: &RunContext<'_>) -> anyhow::Result<()> {
    let request = VersionRequest::from_flags(args.into(), ctx.defaults, ctx.cwd)?;
    debug!(stage = %request.stage, "request ready");
    let collaborator =
        ProcessCollaborator::locate(&ctx.config.collaborator(), ctx.script, ctx.cwd)?;

    let renderer = render::select_renderer(ctx.output);
    let (mut info, stream) = info_target(renderer.machine_readable());
    execute(
        &collaborator,
        &request,
        renderer.as_ref(),
        ctx.verbose,
        &mut std::io::stdout(),
        &mut InfoWriter {
            out: &mut info,
            stream,
        },
    )
}

// Keep stdout parseable in machine-readable modes.
fn info_target(machine_readable: bool) -> (Box<dyn Write>, Stream) {
    if machine_readable {
        (Box::new(std::io::stderr()), Stream::Stderr)
    } else {
        (Box::new(std::io::stdout()), Stream::Stdout)
    }
}

/// Where informational lines go, and the stream whose color support
/// decides how their markers are styled.
pub struct InfoWriter<'a> {
    /// Destination for the verbose echo and the export notice.
    pub out: &'a mut dyn Write,
    /// The stream `out` writes to.
    pub stream: Stream,
}

impl InfoWriter<'_> {
    fn arrow(&self) -> String {
        "→".if_supports_color(self.stream, |t| t.cyan()).to_string()
    }

    fn check(&self) -> String {
        "✓".if_supports_color(self.stream, |t| t.green()).to_string()
    }
}

/// Run one request through a collaborator and render the result.
///
/// `out` receives the rendered result; `info` receives the verbose echo and
/// the export notice.
pub fn execute(
    collaborator: &dyn Collaborator,
    request: &VersionRequest,
    renderer: &dyn ResultRenderer,
    verbose: u8,
    out: &mut dyn Write,
    info: &mut InfoWriter<'_>,
) -> anyhow::Result<()> {
    if verbose > 0 {
        let arrow = info.arrow();
        writeln!(
            info.out,
            "{arrow} Running: {}",
            collaborator.invocation(request)
        )?;
    }

    let spinner = super::spinner("Resolving versions...");
    let result = collaborator.resolve(request);
    spinner.finish_and_clear();
    let raw = result?;

    if verbose > 0 {
        echo_raw(&raw, info)?;
    }

    renderer
        .render(&raw, out)
        .context("failed to write result")?;

    let check = info.check();
    writeln!(info.out, "{check} {EXPORT_NOTICE}")?;
    Ok(())
}

fn echo_raw(raw: &RawOutput, info: &mut InfoWriter<'_>) -> std::io::Result<()> {
    let arrow = info.arrow();
    writeln!(info.out, "{arrow} Raw collaborator output:")?;
    writeln!(info.out, "{}", raw.stdout.trim_end())?;
    if !raw.stderr.trim().is_empty() {
        writeln!(info.out, "{arrow} Collaborator diagnostics:")?;
        writeln!(info.out, "{}", raw.stderr.trim_end())?;
    }
    Ok(())
}
