//! iowait-plugin: reports host CPU iowait/idle percentages to a topology
//! collector over a Unix socket and lets the collector toggle which of the
//! two metrics is active.

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use iowait_plugin::config::PluginConfig;
use iowait_plugin::http;
use iowait_plugin::plugin::spawn_plugin;
use iowait_plugin::sampler::{CpuField, CpuSampler, IostatSampler};
use iowait_plugin::socket;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("iowait_plugin=info".parse()?),
        )
        .init();

    let config = PluginConfig::load();
    info!(host_id = %config.host_id, "starting");

    // Startup probe: refuse to serve at all if iostat is unusable.
    let sampler = IostatSampler;
    sampler
        .measure(CpuField::Idle)
        .await
        .context("initial iostat probe failed")?;

    let plugin = spawn_plugin(config.host_id.clone(), sampler);
    let app = http::build_router(plugin);

    let listener = socket::bind(&config.socket_path)
        .with_context(|| format!("failed to bind {}", config.socket_path.display()))?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    socket::cleanup(&config.socket_path);
    served.context("server error")
}

async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
