//! CLI entry point for the release mirror.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use clap::Parser;
use release_mirror_core::config::{load_mirrors, load_repos, write_example_configs};
use release_mirror_core::download::{AcquisitionEngine, HttpClient, MirrorRouter, RetryPolicy};
use release_mirror_core::logging::{self, LOG_RETENTION};
use release_mirror_core::orchestrator::{Orchestrator, RepoReport};
use release_mirror_core::resolver::{ReleaseResolver, ReleaseSelection};
use tracing::{debug, error, info, warn};

mod cli;
mod context;

use cli::Args;
use context::RunContext;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let target = args.single_target()?;
    let ctx = RunContext::from_env(&args, io::stderr().is_terminal())?;

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let session = logging::init(&ctx.log_dir, args.default_log_level())
        .context("failed to initialize logging")?;

    debug!(?args, "CLI arguments parsed");
    info!(
        top = %ctx.top.display(),
        mirrors_file = %ctx.mirrors_file.display(),
        log_file = %session.file().display(),
        "release mirror starting"
    );

    write_example_configs(&ctx.conf_dir());

    let mirrors = load_mirrors(&ctx.mirrors_file);
    let engine = AcquisitionEngine::new(
        HttpClient::new().with_progress(ctx.show_progress),
        MirrorRouter::new(mirrors),
        RetryPolicy::new(ctx.max_attempts, ctx.retry_delay),
    );
    let orchestrator = Orchestrator::new(ReleaseResolver::new()?, engine, &ctx.top, ctx.jobs)?;

    if let Some((spec, selection)) = target {
        info!(
            repository = %spec,
            provider = %spec.provider,
            all_releases = selection == ReleaseSelection::All,
            "processing single repository"
        );
        match orchestrator.process_repo(&spec, selection).await {
            Ok(RepoReport::Processed(releases)) => {
                let clean = releases.iter().filter(|r| r.is_clean()).count();
                info!(releases = releases.len(), clean, "repository finished");
            }
            Ok(RepoReport::NoReleases) => info!("repository finished without releases"),
            Err(e) => error!(repository = %spec, error = %e, "repository processing failed"),
        }
        return Ok(());
    }

    info!(repos_file = %ctx.repos_file.display(), "starting batch run");
    let list = match load_repos(&ctx.repos_file) {
        Ok(list) => list,
        Err(e) => {
            error!(error = %e, "cannot load repository list");
            return Err(e).context("failed to load repository list");
        }
    };

    if list.is_empty() {
        warn!(skipped = list.skipped.len(), "repository list contains no valid repository");
        return Ok(());
    }

    let stats = orchestrator
        .run_batch(list.repos, ReleaseSelection::Latest)
        .await?;

    info!(
        completed = stats.completed(),
        partial = stats.partial(),
        failed = stats.failed(),
        no_releases = stats.empty(),
        total = stats.total(),
        "all repositories processed"
    );

    match logging::clean_old_logs(session.dir(), LOG_RETENTION) {
        Ok(removed) => debug!(removed, "old log cleanup finished"),
        Err(e) => warn!(error = %e, "old log cleanup failed"),
    }

    Ok(())
}
