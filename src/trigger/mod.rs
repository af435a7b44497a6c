//! Trigger sources for reconciliation: a fixed-interval timer and an
//! on-demand HTTP endpoint.
//!
//! Both paths mutate the same router targets, so passes are serialized
//! through a single [`Coordinator`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::Router;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::reconcile::{ReconciliationReport, Reconciler, SyncError};

/// Serializes reconciliation passes across trigger sources.
///
/// Callers wait on the in-flight pass rather than coalescing with it, so
/// every caller gets a pass that started after its own request arrived.
pub struct Coordinator {
    reconciler: Reconciler,
    gate: Mutex<()>,
}

impl Coordinator {
    pub fn new(reconciler: Reconciler) -> Self {
        Self {
            reconciler,
            gate: Mutex::new(()),
        }
    }

    /// Run one pass, waiting for any in-flight pass to finish first.
    pub async fn run(&self, force: bool) -> Result<ReconciliationReport, SyncError> {
        let _guard = self.gate.lock().await;
        self.reconciler.reconcile(force).await
    }
}

/// Fire a non-forced pass every `poll_interval` until shutdown.
///
/// An in-flight pass always runs to completion; the token is only checked
/// between ticks.
pub async fn run_timer(
    coordinator: Arc<Coordinator>,
    poll_interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately and the startup pass already
    // ran, so consume it.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("timer trigger stopped");
                return;
            }
            _ = ticker.tick() => {}
        }
        if let Err(e) = coordinator.run(false).await {
            error!(error = %e, "scheduled reconciliation failed");
        }
    }
}

/// Router for the on-demand trigger endpoint.
///
/// Any request path triggers a forced pass; the response is a plaintext
/// acknowledgment that the attempt completed.
pub fn trigger_router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .fallback(handle_trigger)
        .with_state(coordinator)
}

async fn handle_trigger(
    State(coordinator): State<Arc<Coordinator>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> (StatusCode, &'static str) {
    debug!(peer = %peer, "web request triggered forced reconciliation");
    match coordinator.run(true).await {
        // Per-target failures are observability output, not part of the
        // acknowledgment contract.
        Ok(_) => (StatusCode::OK, "OK\n"),
        Err(e) => {
            error!(error = %e, "forced reconciliation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "reconciliation failed\n")
        }
    }
}
