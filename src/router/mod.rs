//! Router targets: the ProxySQL instances whose `mysql_servers` table
//! must mirror the cluster topology.

mod admin;

pub use admin::ProxySqlAdmin;

use async_trait::async_trait;
use thiserror::Error;

use crate::topology::TopologySnapshot;

/// Hostgroup receiving writes (masters).
pub const WRITER_HOSTGROUP: u16 = 0;
/// Hostgroup receiving reads (replicas).
pub const READER_HOSTGROUP: u16 = 1;

#[derive(Debug, Error)]
pub enum RouterError {
    /// Connection or read-only query against the target failed.
    #[error("router unavailable: {0}")]
    Unavailable(String),
    /// The replace transaction failed and was rolled back.
    #[error("router write failed: {0}")]
    WriteFailed(String),
}

/// One row of the desired routing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEntry {
    pub hostgroup: u16,
    pub hostname: String,
}

/// The full desired content of a router's routing table, derived from one
/// topology snapshot. Masters land in hostgroup 0, replicas in hostgroup 1.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DesiredAssignment {
    entries: Vec<ServerEntry>,
}

impl DesiredAssignment {
    pub fn from_snapshot(snapshot: &TopologySnapshot) -> Self {
        let mut entries = Vec::with_capacity(snapshot.masters.len() + snapshot.replicas.len());
        for hostname in &snapshot.masters {
            entries.push(ServerEntry {
                hostgroup: WRITER_HOSTGROUP,
                hostname: hostname.clone(),
            });
        }
        for hostname in &snapshot.replicas {
            entries.push(ServerEntry {
                hostgroup: READER_HOSTGROUP,
                hostname: hostname.clone(),
            });
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[ServerEntry] {
        &self.entries
    }

    /// All assigned hostnames, sorted lexicographically.
    ///
    /// This is the list compared against each router's registered hosts.
    pub fn sorted_hostnames(&self) -> Vec<String> {
        let mut hostnames: Vec<String> =
            self.entries.iter().map(|e| e.hostname.clone()).collect();
        hostnames.sort();
        hostnames
    }
}

/// Administrative handle on one router target.
///
/// Implementations may pool connections internally; callers hold no state
/// across reconciliation passes.
#[async_trait]
pub trait RouterAdmin: Send + Sync {
    /// Target address for logs and reports.
    fn addr(&self) -> &str;

    /// Hostnames currently registered at the target, in sorted order.
    async fn current_hostnames(&self) -> Result<Vec<String>, RouterError>;

    /// Atomically replace the target's routing table with `desired`.
    ///
    /// Either every row reflects the new assignment or the prior state is
    /// left untouched.
    async fn replace_servers(&self, desired: &DesiredAssignment) -> Result<(), RouterError>;
}
