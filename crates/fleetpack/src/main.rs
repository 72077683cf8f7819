//! fleetpack server
//!
//! Stores packets and specs behind a kameo registry actor and serves the
//! REST surface agents and the management CLI talk to.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use fleetpack_core::{GetStats, RegistryActor, RegistryActorArgs};
use kameo::actor::Spawn;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod router;
mod state;

use crate::config::Config;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "fleetpack")]
#[command(about = "Label-matched packet distribution server", long_about = None)]
struct Args {
    /// Config file (default search path when unset)
    #[arg(short, long, env = "FLEETPACK_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let (mut config, source) = match args.config {
        Some(path) => {
            let config = Config::load(&path)
                .wrap_err_with(|| format!("failed to load config from {}", path.display()))?;
            (config, Some(path))
        }
        None => Config::load_default()?,
    };
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    init_tracing(&config.server.log_level);
    match &source {
        Some(path) => info!(path = %path.display(), "loaded config file"),
        None => tracing::warn!("no config file found, using defaults"),
    }

    let registry = RegistryActor::spawn(RegistryActorArgs {
        data_dir: config.server.data_dir.clone(),
    });
    // Surface snapshot load failures before accepting traffic
    let stats = registry
        .ask(GetStats)
        .await
        .map_err(|e| eyre!("registry failed to start: {e}"))?;
    info!(packets = stats.packets, specs = stats.specs, "registry ready");

    let bind = config.server.bind.clone();
    let state = Arc::new(AppState::new(registry.clone(), config));
    let app = router::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .wrap_err_with(|| format!("failed to bind {bind}"))?;
    info!(addr = %bind, "fleetpack server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down");
    if let Err(e) = registry.stop_gracefully().await {
        tracing::warn!(error = %e, "registry did not stop cleanly");
    }
    registry.wait_for_shutdown().await;
    Ok(())
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
