//! The reconciliation engine.
//!
//! One pass re-derives ground truth from the topology authority, compares
//! it against every router target independently, and rewrites the targets
//! that differ. Nothing is carried over between passes.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::router::{DesiredAssignment, RouterAdmin};
use crate::topology::{classify, ClassificationError, TopologyError, TopologySource};

/// A failure that aborts the whole pass before any router is touched.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("topology source error: {0}")]
    Topology(#[from] TopologyError),
    #[error("classification error: {0}")]
    Classification(#[from] ClassificationError),
}

/// Result of one target within a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    /// Current state already matched the desired state.
    NoOp,
    /// Routing table replaced and committed.
    Updated,
    /// Read or write failed; the target keeps its prior state.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct TargetReport {
    pub target: String,
    pub outcome: TargetOutcome,
}

/// Aggregate result of one reconciliation pass.
///
/// Partial failure across targets is expected and non-fatal; callers decide
/// what to surface.
#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    pub masters: Vec<String>,
    pub replicas: Vec<String>,
    pub targets: Vec<TargetReport>,
}

impl ReconciliationReport {
    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, TargetOutcome::Updated))
    }

    pub fn noops(&self) -> usize {
        self.count(|o| matches!(o, TargetOutcome::NoOp))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TargetOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&TargetOutcome) -> bool) -> usize {
        self.targets.iter().filter(|t| pred(&t.outcome)).count()
    }
}

pub struct Reconciler {
    source: Arc<dyn TopologySource>,
    targets: Vec<Arc<dyn RouterAdmin>>,
    topology_timeout: Duration,
    router_timeout: Duration,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn TopologySource>,
        targets: Vec<Arc<dyn RouterAdmin>>,
        topology_timeout: Duration,
        router_timeout: Duration,
    ) -> Self {
        Self {
            source,
            targets,
            topology_timeout,
            router_timeout,
        }
    }

    /// Run one reconciliation pass.
    ///
    /// With `force` set, every target is rewritten regardless of whether a
    /// difference was detected.
    pub async fn reconcile(&self, force: bool) -> Result<ReconciliationReport, SyncError> {
        let facts = timeout(self.topology_timeout, self.source.fetch_facts())
            .await
            .map_err(|_| TopologyError::Timeout)??;
        let snapshot = classify(&facts)?;

        let desired = DesiredAssignment::from_snapshot(&snapshot);
        let desired_hosts = desired.sorted_hostnames();

        // Targets are independent resources; reconcile them concurrently,
        // each under its own timeout.
        let tasks = self.targets.iter().map(|admin| {
            let admin = admin.clone();
            let desired = desired.clone();
            let desired_hosts = desired_hosts.clone();
            async move {
                let outcome =
                    match timeout(self.router_timeout, reconcile_target(&admin, &desired, &desired_hosts, force))
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            error!(target = admin.addr(), "target reconciliation timed out");
                            TargetOutcome::Failed("timed out".to_string())
                        }
                    };
                TargetReport {
                    target: admin.addr().to_string(),
                    outcome,
                }
            }
        });
        let targets = join_all(tasks).await;

        let report = ReconciliationReport {
            masters: snapshot.masters.iter().cloned().collect(),
            replicas: snapshot.replicas.iter().cloned().collect(),
            targets,
        };
        info!(
            masters = ?report.masters,
            replicas = ?report.replicas,
            updated = report.updated(),
            noops = report.noops(),
            failed = report.failed(),
            force,
            "reconciliation pass complete",
        );
        Ok(report)
    }
}

/// Read-compare-write for a single target.
///
/// An unreadable target cannot be diffed, so the write is attempted as if a
/// change had been detected.
async fn reconcile_target(
    admin: &Arc<dyn RouterAdmin>,
    desired: &DesiredAssignment,
    desired_hosts: &[String],
    force: bool,
) -> TargetOutcome {
    let changed = match admin.current_hostnames().await {
        Ok(current) => {
            let changed = current != desired_hosts;
            if changed {
                debug!(target = admin.addr(), ?current, "detected changes");
            }
            changed
        }
        Err(e) => {
            warn!(target = admin.addr(), error = %e, "failed to read current state");
            true
        }
    };

    if !force && !changed {
        debug!(target = admin.addr(), "no changes detected");
        return TargetOutcome::NoOp;
    }
    if force {
        debug!(target = admin.addr(), "forcing write");
    }

    match admin.replace_servers(desired).await {
        Ok(()) => {
            info!(target = admin.addr(), "routing table updated");
            TargetOutcome::Updated
        }
        Err(e) => {
            error!(target = admin.addr(), error = %e, "routing table update failed");
            TargetOutcome::Failed(e.to_string())
        }
    }
}
