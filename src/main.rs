mod artifact;
mod cancel;
mod cli;
mod config;
mod error;
mod fetcher;
mod normalize;
mod poller;
mod remote;
mod report;
mod run;
mod session;
#[cfg(test)]
mod testing;
mod ui;
mod workflow;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cancel::{CancelHandle, Cancellation};
use cli::{Cli, Command};
use config::RoundtripConfig;
use report::{ResultAggregator, RunReport};
use run::{RunSettings, VerificationContext};
use session::Session;
use ui::RunProgress;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => RoundtripConfig::load_from(path)?,
        None => RoundtripConfig::load()?,
    };
    cli.apply(&mut config);

    let (handle, cancel) = Cancellation::new();
    tokio::spawn(cancel_on_ctrl_c(handle));

    let session = Session::open(&config)
        .await
        .with_context(|| format!("opening session on {}", config.server_url))?;
    let settings = RunSettings::from_config(&config);

    session
        .scoped(async |s| match &cli.command {
            Command::Verify {
                report, no_import, ..
            } => {
                let artifacts = if *no_import {
                    Vec::new()
                } else {
                    artifact::load_dir(&config.artifacts_dir)?
                };
                let ctx = VerificationContext::new(s.client(), s.client(), &settings);
                let progress = RunProgress::start("starting round-trip run");
                let outcome = match ctx.run(&artifacts, &progress, &cancel).await {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        progress.abandon();
                        return Err(err);
                    }
                };
                progress.finish(&outcome);
                if let Some(path) = report {
                    write_report(path, &outcome)?;
                }
                match outcome.verdict() {
                    Ok(()) => Ok(ExitCode::SUCCESS),
                    Err(failed) => {
                        eprintln!("{failed}");
                        Ok(ExitCode::FAILURE)
                    }
                }
            }
            Command::Import => {
                let artifacts = artifact::load_dir(&config.artifacts_dir)?;
                let ctx = VerificationContext::new(s.client(), s.client(), &settings);
                let progress = RunProgress::start("importing");
                let aggregator = ResultAggregator::new();
                let result = ctx
                    .import_artifacts(&artifacts, &aggregator, &progress, &cancel)
                    .await;
                progress.finish(&aggregator.report());
                for record in aggregator.imports() {
                    let phase = record
                        .phase
                        .map(|p| p.to_string())
                        .or(record.error)
                        .unwrap_or_default();
                    println!("{}\t{phase}", record.artifact);
                }
                result?;
                Ok(ExitCode::SUCCESS)
            }
            Command::List => {
                let ctx = VerificationContext::new(s.client(), s.client(), &settings);
                for candidate in ctx.candidates(&cancel).await? {
                    println!("{}", candidate.uri);
                }
                Ok(ExitCode::SUCCESS)
            }
        })
        .await
}

// RUST_LOG vence; senão --verbose liga debug.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "roundtrip=debug" } else { "roundtrip=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn cancel_on_ctrl_c(handle: CancelHandle) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupt received, cancelling in-flight work");
        handle.cancel();
    }
}

fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).context("serializing report")?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "report written");
    Ok(())
}
