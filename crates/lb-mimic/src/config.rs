//! Simulator configuration

use crate::error::{LoadBalancerError, Result};
use crate::lifecycle::MAX_HOLD_SECS;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Simulator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub lifecycle: LifecycleConfig,
    pub defaults: DefaultsConfig,
    pub server: ServerConfig,
}

/// Lifecycle timer defaults, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// BUILD hold when `lb_building` carries no duration
    pub default_building_secs: u64,
    /// PENDING-UPDATE hold when `lb_pending_update` carries no duration
    pub default_pending_update_secs: u64,
    /// PENDING-DELETE hold when `lb_pending_delete` carries no duration
    pub default_pending_delete_secs: u64,
    /// Time a DELETED load balancer stays visible
    pub deleted_retention_secs: u64,
}

/// Values filled in when a create request leaves them out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub port: u16,
    pub algorithm: String,
    pub timeout: u32,
    pub cluster_name: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_address: String,
    pub listen_port: u16,
    pub log_level: String,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            default_building_secs: 10,
            default_pending_update_secs: 10,
            default_pending_delete_secs: 10,
            deleted_retention_secs: 3600,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            port: 80,
            algorithm: "RANDOM".to_string(),
            timeout: 30,
            cluster_name: "test-cluster".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1".to_string(),
            listen_port: 8900,
            log_level: "info".to_string(),
        }
    }
}

impl SimulatorConfig {
    /// Parse a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| LoadBalancerError::Configuration(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LoadBalancerError::Configuration(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Check the configuration for inconsistent values
    pub fn validate(&self) -> Result<()> {
        let lifecycle = &self.lifecycle;
        for (name, secs) in [
            ("default_building_secs", lifecycle.default_building_secs),
            ("default_pending_update_secs", lifecycle.default_pending_update_secs),
            ("default_pending_delete_secs", lifecycle.default_pending_delete_secs),
            ("deleted_retention_secs", lifecycle.deleted_retention_secs),
        ] {
            if secs > MAX_HOLD_SECS {
                return Err(LoadBalancerError::Configuration(format!(
                    "{} ({}) exceeds the maximum of {} seconds",
                    name, secs, MAX_HOLD_SECS
                )));
            }
        }
        let longest_hold = lifecycle
            .default_building_secs
            .max(lifecycle.default_pending_update_secs)
            .max(lifecycle.default_pending_delete_secs);
        if lifecycle.deleted_retention_secs < longest_hold {
            return Err(LoadBalancerError::Configuration(format!(
                "deleted_retention_secs ({}) must not be shorter than the longest default hold ({})",
                lifecycle.deleted_retention_secs, longest_hold
            )));
        }
        if self.defaults.port == 0 {
            return Err(LoadBalancerError::Configuration(
                "defaults.port must be non-zero".to_string(),
            ));
        }
        if self.defaults.algorithm.is_empty() {
            return Err(LoadBalancerError::Configuration(
                "defaults.algorithm must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Socket address string for the HTTP server
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.listen_address, self.server.listen_port)
    }
}
