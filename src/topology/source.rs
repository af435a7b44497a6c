//! Topology authority client.
//!
//! Fetches per-host facts for one cluster from an Orchestrator-style HTTP
//! API. The reconciler only depends on the [`TopologySource`] trait so
//! tests can substitute canned facts.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::OrchestratorConfig;

use super::HostFact;

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("topology request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("topology authority returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("failed to decode topology response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("topology request timed out")]
    Timeout,
}

/// Source of raw per-host facts for the cluster.
#[async_trait]
pub trait TopologySource: Send + Sync {
    async fn fetch_facts(&self) -> Result<Vec<HostFact>, TopologyError>;
}

/// HTTP client for the Orchestrator `cluster/alias` API.
pub struct OrchestratorClient {
    config: OrchestratorConfig,
    http: reqwest::Client,
}

impl OrchestratorClient {
    pub fn new(config: OrchestratorConfig, timeout: Duration) -> Result<Self, TopologyError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl TopologySource for OrchestratorClient {
    async fn fetch_facts(&self) -> Result<Vec<HostFact>, TopologyError> {
        // Spread load across the configured endpoints; any of them can
        // answer for the cluster.
        let index = rand::thread_rng().gen_range(0..self.config.servers.len());
        let endpoint = &self.config.servers[index];
        let url = format!(
            "{}/api/cluster/alias/{}",
            endpoint.url.trim_end_matches('/'),
            self.config.cluster_alias,
        );
        debug!(url = %url, "fetching cluster topology");

        let response = self
            .http
            .get(&url)
            .basic_auth(&endpoint.username, Some(&endpoint.password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TopologyError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        let instances: Vec<InstanceRecord> = serde_json::from_slice(&body)?;
        Ok(instances.into_iter().map(HostFact::from).collect())
    }
}

/// One instance record as serialized by the Orchestrator API.
///
/// Only the fields classification needs are decoded; the rest of the
/// (large) instance document is ignored.
#[derive(Debug, Deserialize)]
struct InstanceRecord {
    #[serde(rename = "Key")]
    key: InstanceKey,
    #[serde(rename = "MasterKey", default)]
    master_key: InstanceKey,
    #[serde(rename = "IsDowntimed", default)]
    is_downtimed: bool,
    #[serde(rename = "DowntimeEndTimestamp", default)]
    downtime_end_timestamp: String,
    #[serde(rename = "DowntimeOwner", default)]
    downtime_owner: String,
    #[serde(rename = "DowntimeReason", default)]
    downtime_reason: String,
    #[serde(rename = "IsLastCheckValid", default)]
    is_last_check_valid: bool,
    #[serde(rename = "Slave_SQL_Running", default)]
    slave_sql_running: bool,
    #[serde(rename = "Slave_IO_Running", default)]
    slave_io_running: bool,
}

#[derive(Debug, Deserialize, Default)]
struct InstanceKey {
    #[serde(rename = "Hostname", default)]
    hostname: String,
}

impl From<InstanceRecord> for HostFact {
    fn from(record: InstanceRecord) -> Self {
        HostFact {
            hostname: record.key.hostname,
            master_hostname: record.master_key.hostname,
            downtimed: record.is_downtimed,
            downtime_end: record.downtime_end_timestamp,
            downtime_owner: record.downtime_owner,
            downtime_reason: record.downtime_reason,
            last_check_valid: record.is_last_check_valid,
            sql_thread_running: record.slave_sql_running,
            io_thread_running: record.slave_io_running,
        }
    }
}
