mod config;
mod reconcile;
mod router;
mod topology;
mod trigger;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use config::Config;
use reconcile::Reconciler;
use router::{ProxySqlAdmin, RouterAdmin};
use topology::{OrchestratorClient, TopologySource};
use trigger::Coordinator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = config::load_config(&config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;
    validate(&config)?;

    let poll_interval = config.orchestrator.poll_interval();
    info!(
        config = %config_path,
        poll_interval_secs = poll_interval.as_secs(),
        routers = config.routers.len(),
        cluster = %config.orchestrator.cluster_alias,
        "starting proxysync",
    );

    let topology_timeout = Duration::from_millis(config.timeouts.topology_ms);
    let router_timeout = Duration::from_millis(config.timeouts.router_ms);

    let source: Arc<dyn TopologySource> = Arc::new(OrchestratorClient::new(
        config.orchestrator.clone(),
        topology_timeout,
    )?);
    let targets: Vec<Arc<dyn RouterAdmin>> = config
        .routers
        .iter()
        .map(|target| Arc::new(ProxySqlAdmin::new(target)) as Arc<dyn RouterAdmin>)
        .collect();

    let reconciler = Reconciler::new(source, targets, topology_timeout, router_timeout);
    let coordinator = Arc::new(Coordinator::new(reconciler));

    // One pass up front, before the timer and trigger endpoint come up.
    if let Err(e) = coordinator.run(false).await {
        error!(error = %e, "initial reconciliation failed");
    }

    let shutdown = CancellationToken::new();
    let timer = tokio::spawn(trigger::run_timer(
        coordinator.clone(),
        poll_interval,
        shutdown.clone(),
    ));

    let addr = format!("{}:{}", config.server.listen_addr, config.server.listen_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind trigger listener on {addr}"))?;
    info!(addr = %addr, "on-demand trigger listening");

    let app = trigger::trigger_router(coordinator.clone());
    let signal_shutdown = shutdown.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received, letting in-flight pass finish");
        signal_shutdown.cancel();
    })
    .await?;

    shutdown.cancel();
    let _ = timer.await;
    info!("proxysync stopped");
    Ok(())
}

/// Startup-fatal configuration checks.
fn validate(config: &Config) -> anyhow::Result<()> {
    anyhow::ensure!(
        !config.orchestrator.servers.is_empty(),
        "at least one orchestrator server must be configured",
    );
    anyhow::ensure!(
        !config.routers.is_empty(),
        "at least one router target must be configured",
    );
    Ok(())
}
