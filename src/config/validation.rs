//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, port non-zero)
//! - Reject empty addresses and directories
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.ip.trim().is_empty() {
        errors.push(ValidationError::new("server.ip", "must not be empty"));
    }
    if config.server.port == 0 {
        errors.push(ValidationError::new("server.port", "must be greater than 0"));
    }

    if config.engine.consul_address.trim().is_empty() {
        errors.push(ValidationError::new("engine.consul_address", "must not be empty"));
    }
    if config.engine.templates_path.as_os_str().is_empty() {
        errors.push(ValidationError::new("engine.templates_path", "must not be empty"));
    }
    if config.engine.configs_path.as_os_str().is_empty() {
        errors.push(ValidationError::new("engine.configs_path", "must not be empty"));
    }

    if config.proxy.binary.trim().is_empty() {
        errors.push(ValidationError::new("proxy.binary", "must not be empty"));
    }
    if config.proxy.consul_template_binary.trim().is_empty() {
        errors.push(ValidationError::new("proxy.consul_template_binary", "must not be empty"));
    }

    let timeouts = [
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.kv_secs", config.timeouts.kv_secs),
        ("timeouts.command_secs", config.timeouts.command_secs),
    ];
    for (field, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
