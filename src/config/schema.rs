//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::engine::EngineConfig;

/// Root configuration of the control plane.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Control API listener.
    pub server: ServerConfig,

    /// Consul address and template/config directories.
    pub engine: EngineSection,

    /// Local proxy and consul-template binaries.
    pub proxy: ProxySection,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// The engine settings shared by every request.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(
            self.engine.consul_address.clone(),
            self.engine.templates_path.clone(),
            self.engine.configs_path.clone(),
        )
    }
}

/// Control API listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub ip: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EngineSection {
    /// Consul base address; a scheme is optional.
    pub consul_address: String,

    /// Where generated templates are written.
    pub templates_path: PathBuf,

    /// Where consul-template and the proxy write configs.
    pub configs_path: PathBuf,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            consul_address: "http://localhost:8500".to_string(),
            templates_path: PathBuf::from("/cfg/tmpl"),
            configs_path: PathBuf::from("/cfg"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProxySection {
    /// HAProxy binary.
    pub binary: String,

    /// HAProxy pid file, used for seamless reloads.
    pub pid_file: PathBuf,

    /// Base config looked up inside the templates directory.
    pub base_template: String,

    /// consul-template binary.
    pub consul_template_binary: String,
}

impl Default for ProxySection {
    fn default() -> Self {
        Self {
            binary: "haproxy".to_string(),
            pid_file: PathBuf::from("/var/run/haproxy.pid"),
            base_template: "haproxy.tmpl".to_string(),
            consul_template_binary: "consul-template".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Control API request timeout in seconds.
    pub request_secs: u64,

    /// Consul request timeout in seconds.
    pub kv_secs: u64,

    /// consul-template / haproxy run timeout in seconds.
    pub command_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            kv_secs: 10,
            command_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
