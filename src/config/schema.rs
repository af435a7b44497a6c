use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    /// Topology authority (Orchestrator) configuration
    pub orchestrator: OrchestratorConfig,
    /// ProxySQL targets whose routing tables mirror the topology
    pub routers: Vec<RouterTargetConfig>,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Listen address for the on-demand trigger endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
}

fn default_listen_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    8080
}

// ============================================================================
// Orchestrator Configuration
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    /// Orchestrator API endpoints; one is picked at random per fetch
    pub servers: Vec<OrchestratorEndpoint>,
    /// Logical cluster identifier queried via `cluster/alias/<alias>`
    pub cluster_alias: String,
    /// Seconds between scheduled reconciliation passes
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl OrchestratorConfig {
    /// Poll interval, falling back to the default when unset or zero.
    pub fn poll_interval(&self) -> Duration {
        let secs = if self.poll_interval_secs == 0 {
            default_poll_interval_secs()
        } else {
            self.poll_interval_secs
        };
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorEndpoint {
    /// Base URL, e.g. `http://orchestrator-1:3000`
    pub url: String,
    pub username: String,
    pub password: String,
}

fn default_poll_interval_secs() -> u64 {
    10
}

// ============================================================================
// Router Target Configuration
// ============================================================================

/// One ProxySQL instance, addressed via its admin interface
#[derive(Debug, Clone, Deserialize)]
pub struct RouterTargetConfig {
    /// Hostname or IP of the ProxySQL admin interface
    pub host: String,
    /// Admin interface port
    #[serde(default = "default_admin_port")]
    pub port: u16,
    /// Admin username
    pub user: String,
    /// Admin password
    pub password: String,
    /// Port written into each `mysql_servers` row for the backends
    #[serde(default = "default_backend_port")]
    pub backend_port: u16,
}

impl RouterTargetConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_admin_port() -> u16 {
    6032
}

fn default_backend_port() -> u16 {
    3306
}

// ============================================================================
// Timeouts
// ============================================================================

/// Upper bounds on blocking network calls so one unresponsive peer
/// cannot stall a whole reconciliation pass
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
    /// Timeout for one topology fetch (milliseconds)
    #[serde(default = "default_topology_timeout_ms")]
    pub topology_ms: u64,
    /// Timeout for one router's read-then-write sequence (milliseconds)
    #[serde(default = "default_router_timeout_ms")]
    pub router_ms: u64,
}

fn default_topology_timeout_ms() -> u64 {
    5000
}

fn default_router_timeout_ms() -> u64 {
    10000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            topology_ms: default_topology_timeout_ms(),
            router_ms: default_router_timeout_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
listen_addr = "127.0.0.1"
listen_port = 9090

[orchestrator]
cluster_alias = "prod-cluster"
poll_interval_secs = 30

[[orchestrator.servers]]
url = "http://orchestrator-1:3000"
username = "orc"
password = "secret"

[[routers]]
host = "proxysql-1"
port = 6032
user = "admin"
password = "admin"

[[routers]]
host = "proxysql-2"
user = "admin"
password = "admin"
backend_port = 3307

[timeouts]
topology_ms = 2000
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1");
        assert_eq!(config.server.listen_port, 9090);
        assert_eq!(config.orchestrator.cluster_alias, "prod-cluster");
        assert_eq!(config.orchestrator.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.routers.len(), 2);
        assert_eq!(config.routers[0].addr(), "proxysql-1:6032");
        assert_eq!(config.routers[0].backend_port, 3306);
        assert_eq!(config.routers[1].backend_port, 3307);
        assert_eq!(config.timeouts.topology_ms, 2000);
        assert_eq!(config.timeouts.router_ms, 10000);
    }

    #[test]
    fn test_poll_interval_zero_falls_back_to_default() {
        let toml = r#"
routers = []

[server]

[orchestrator]
cluster_alias = "c"
poll_interval_secs = 0
servers = []
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.orchestrator.poll_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_poll_interval_defaults_when_unset() {
        let toml = r#"
routers = []

[server]

[orchestrator]
cluster_alias = "c"
servers = []
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.orchestrator.poll_interval_secs, 10);
    }
}
