//! ProxySQL admin-interface implementation of [`RouterAdmin`].

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Opts, OptsBuilder, Pool, Transaction, TxOpts};
use tracing::{debug, warn};

use crate::config::RouterTargetConfig;

use super::{DesiredAssignment, RouterAdmin, RouterError};

/// Hostnames get interpolated into text-protocol statements, so anything
/// outside a plain DNS name or IP is rejected before a transaction starts.
fn valid_hostname(hostname: &str) -> bool {
    !hostname.is_empty()
        && hostname
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
}

/// One ProxySQL instance, reached over its MySQL-protocol admin port.
pub struct ProxySqlAdmin {
    addr: String,
    backend_port: u16,
    pool: Pool,
}

impl ProxySqlAdmin {
    pub fn new(config: &RouterTargetConfig) -> Self {
        let opts: Opts = OptsBuilder::default()
            .ip_or_hostname(config.host.clone())
            .tcp_port(config.port)
            .user(Some(config.user.clone()))
            .pass(Some(config.password.clone()))
            .db_name(Some("main".to_string()))
            .prefer_socket(false)
            .into();
        Self {
            addr: config.addr(),
            backend_port: config.backend_port,
            pool: Pool::new(opts),
        }
    }

    async fn apply(
        &self,
        tx: &mut Transaction<'_>,
        desired: &DesiredAssignment,
    ) -> Result<(), RouterError> {
        let wf = |e: mysql_async::Error| RouterError::WriteFailed(e.to_string());

        tx.query_drop("DELETE FROM mysql_servers").await.map_err(wf)?;
        debug!(target = %self.addr, "cleared routing table");

        for entry in desired.entries() {
            // The ProxySQL admin interface does not support prepared
            // statements; statements must go over the text protocol.
            let insert = format!(
                "INSERT INTO mysql_servers (hostgroup_id, hostname, port) \
                 VALUES ({}, '{}', {})",
                entry.hostgroup, entry.hostname, self.backend_port,
            );
            tx.query_drop(insert).await.map_err(wf)?;
            debug!(
                target = %self.addr,
                hostgroup = entry.hostgroup,
                host = %entry.hostname,
                "inserted routing row",
            );
        }

        tx.query_drop("LOAD MYSQL SERVERS FROM MEMORY")
            .await
            .map_err(wf)?;
        tx.query_drop("SAVE MYSQL SERVERS TO DISK")
            .await
            .map_err(wf)?;
        Ok(())
    }
}

#[async_trait]
impl RouterAdmin for ProxySqlAdmin {
    fn addr(&self) -> &str {
        &self.addr
    }

    async fn current_hostnames(&self) -> Result<Vec<String>, RouterError> {
        let mut conn = self
            .pool
            .get_conn()
            .await
            .map_err(|e| RouterError::Unavailable(e.to_string()))?;
        conn.query("SELECT hostname FROM mysql_servers ORDER BY hostname")
            .await
            .map_err(|e| RouterError::Unavailable(e.to_string()))
    }

    async fn replace_servers(&self, desired: &DesiredAssignment) -> Result<(), RouterError> {
        if let Some(entry) = desired.entries().iter().find(|e| !valid_hostname(&e.hostname)) {
            return Err(RouterError::WriteFailed(format!(
                "refusing to write invalid hostname {:?}",
                entry.hostname,
            )));
        }

        let mut conn = self
            .pool
            .get_conn()
            .await
            .map_err(|e| RouterError::Unavailable(e.to_string()))?;
        let mut tx = conn
            .start_transaction(TxOpts::default())
            .await
            .map_err(|e| RouterError::WriteFailed(e.to_string()))?;

        match self.apply(&mut tx, desired).await {
            Ok(()) => tx
                .commit()
                .await
                .map_err(|e| RouterError::WriteFailed(e.to_string())),
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(
                        target = %self.addr,
                        error = %rollback_err,
                        "rollback after failed write also failed",
                    );
                }
                Err(e)
            }
        }
    }
}
