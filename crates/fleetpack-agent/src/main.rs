//! fleetpack-agent daemon
//!
//! Runs reconciliation passes against a fleetpack server until interrupted,
//! or once with `--once`.

use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, bail};
use fleetpack_agent::{AgentArgs, AgentConfig, AgentSettings, PacketCache, Reconciler};
use fleetpack_api::format_labels;
use fleetpack_client::HttpClient;
use fleetpack_exec::LocalExecutor;
use fleetpack_pkg::FsInstaller;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = AgentArgs::parse();

    let file = match &args.config {
        Some(path) => AgentConfig::load(path)?,
        None => AgentConfig::load_default()?,
    };
    let settings = AgentSettings::resolve(args, file)?;
    init_tracing(&settings.log_level);

    let mut client = HttpClient::new(&settings.server)
        .wrap_err_with(|| format!("invalid server address {}", settings.server))?;
    if let Some(token) = &settings.token {
        client = client.with_token(token);
    }

    let cache = PacketCache::open(&settings.packets).await?;
    let installer = FsInstaller::new(Arc::new(LocalExecutor::new().inherit_stdio()));
    let reconciler = Reconciler::new(
        Arc::new(client),
        Arc::new(installer),
        cache,
        &settings.root,
        settings.labels.clone(),
    );

    info!(
        server = %settings.server,
        labels = %format_labels(reconciler.labels()),
        root = %settings.root.display(),
        packets = %settings.packets.display(),
        "fleetpack agent starting"
    );

    if settings.once {
        let report = reconciler.run_once().await?;
        if !report.is_clean() {
            for failure in &report.failed {
                warn!(hash = %failure.hash, error = %failure.error, "item failed");
            }
            bail!("{} packet(s) failed to apply", report.failed.len());
        }
        return Ok(());
    }

    reconciler
        .run_until(settings.interval, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await;
    Ok(())
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
