//! Cluster topology: raw per-host facts and their classification into
//! master/replica sets.
//!
//! Classification is a pure function over the facts reported by the
//! topology authority; fetching those facts lives in [`source`].

mod source;

pub use source::{OrchestratorClient, TopologyError, TopologySource};

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{debug, info};

/// One cluster member as reported by the topology authority.
///
/// An empty `master_hostname` means the host is itself a master.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFact {
    pub hostname: String,
    pub master_hostname: String,
    pub downtimed: bool,
    pub downtime_end: String,
    pub downtime_owner: String,
    pub downtime_reason: String,
    pub last_check_valid: bool,
    pub sql_thread_running: bool,
    pub io_thread_running: bool,
}

/// Deduplicated view of the cluster derived from one batch of facts.
///
/// `masters` and `replicas` are always disjoint; classification visits
/// exactly one branch per fact.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TopologySnapshot {
    pub masters: BTreeSet<String>,
    pub replicas: BTreeSet<String>,
}

#[derive(Debug, Error)]
pub enum ClassificationError {
    /// The same hostname was reported both as a master and as a replica.
    #[error("contradictory facts for host {hostname}: reported as both master and replica")]
    ContradictoryFact { hostname: String },
}

/// Classify raw facts into master and replica sets.
///
/// Per fact, in priority order:
/// 1. in scheduled downtime -> excluded (informational)
/// 2. last health check invalid -> excluded
/// 3. no master hostname -> master
/// 4. either replication thread stopped -> excluded
/// 5. otherwise -> replica
///
/// Duplicate hostnames deduplicate; a duplicate that lands in the other
/// set fails classification rather than silently picking a role.
pub fn classify(facts: &[HostFact]) -> Result<TopologySnapshot, ClassificationError> {
    let mut masters = BTreeSet::new();
    let mut replicas = BTreeSet::new();

    for fact in facts {
        if fact.downtimed {
            info!(
                host = %fact.hostname,
                until = %fact.downtime_end,
                owner = %fact.downtime_owner,
                reason = %fact.downtime_reason,
                "host in scheduled downtime, excluded",
            );
            continue;
        }
        if !fact.last_check_valid {
            debug!(host = %fact.hostname, "last check not valid, excluded");
            continue;
        }
        if fact.master_hostname.is_empty() {
            if replicas.contains(&fact.hostname) {
                return Err(ClassificationError::ContradictoryFact {
                    hostname: fact.hostname.clone(),
                });
            }
            debug!(host = %fact.hostname, "classified as master");
            masters.insert(fact.hostname.clone());
        } else if !fact.sql_thread_running || !fact.io_thread_running {
            debug!(host = %fact.hostname, "replica not replicating, excluded");
        } else {
            if masters.contains(&fact.hostname) {
                return Err(ClassificationError::ContradictoryFact {
                    hostname: fact.hostname.clone(),
                });
            }
            debug!(host = %fact.hostname, "classified as replica");
            replicas.insert(fact.hostname.clone());
        }
    }

    Ok(TopologySnapshot { masters, replicas })
}
