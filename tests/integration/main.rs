//! Integration test entry point
//!
//! Run with: PROXYSYNC_RUN_INTEGRATION_TESTS=1 cargo test --test integration
//!
//! Environment variables:
//! - PROXYSYNC_RUN_INTEGRATION_TESTS: Set to "1" to enable integration tests
//! - PROXYSYNC_TEST_ROUTER_HOST: ProxySQL admin host (default: 127.0.0.1)
//! - PROXYSYNC_TEST_ROUTER_PORT: ProxySQL admin port (default: 6032)
//! - PROXYSYNC_TEST_ROUTER_USER: Admin user (default: admin)
//! - PROXYSYNC_TEST_ROUTER_PASS: Admin password (default: admin)
//! - PROXYSYNC_TEST_TRIGGER_ADDR: Running proxysync trigger address
//!   (e.g. 127.0.0.1:8080); trigger tests are skipped when unset

mod routing_table;
mod trigger_endpoint;

use mysql::{OptsBuilder, Pool, PooledConn};
use std::env;

/// Check if integration tests should run
pub fn should_run_integration_tests() -> bool {
    env::var("PROXYSYNC_RUN_INTEGRATION_TESTS")
        .map(|v| v == "1")
        .unwrap_or(false)
}

/// Skip test if integration tests are not enabled
#[macro_export]
macro_rules! skip_if_not_enabled {
    () => {
        if !crate::should_run_integration_tests() {
            eprintln!(
                "Skipping integration test (set PROXYSYNC_RUN_INTEGRATION_TESTS=1 to run)"
            );
            return;
        }
    };
}

/// Get router admin connection config from environment
pub fn get_router_config() -> RouterTestConfig {
    RouterTestConfig {
        host: env::var("PROXYSYNC_TEST_ROUTER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
        port: env::var("PROXYSYNC_TEST_ROUTER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(6032),
        user: env::var("PROXYSYNC_TEST_ROUTER_USER").unwrap_or_else(|_| "admin".to_string()),
        password: env::var("PROXYSYNC_TEST_ROUTER_PASS").unwrap_or_else(|_| "admin".to_string()),
    }
}

/// Trigger endpoint address, if a proxysync instance is running
pub fn get_trigger_addr() -> Option<String> {
    env::var("PROXYSYNC_TEST_TRIGGER_ADDR").ok()
}

/// ProxySQL admin connection config for tests
#[derive(Debug, Clone)]
pub struct RouterTestConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl RouterTestConfig {
    /// Create a connection pool to the ProxySQL admin interface
    pub fn pool(&self) -> Pool {
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(self.host.clone()))
            .tcp_port(self.port)
            .user(Some(self.user.clone()))
            .pass(Some(self.password.clone()))
            .db_name(Some("main"))
            .prefer_socket(false);
        Pool::new(opts).expect("failed to create admin pool")
    }

    /// Get a single admin connection
    pub fn conn(&self) -> PooledConn {
        self.pool().get_conn().expect("failed to connect to admin")
    }
}
