//! Routing intent and engine-wide configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// ACL match operator used for the service paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PathType {
    /// Prefix match (`path_beg`).
    #[default]
    PathBeg,
    /// Regular expression match (`path_reg`).
    PathReg,
}

impl PathType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathType::PathBeg => "path_beg",
            PathType::PathReg => "path_reg",
        }
    }
}

impl fmt::Display for PathType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown path type '{0}', expected path_beg or path_reg")]
pub struct ParsePathTypeError(pub String);

impl FromStr for PathType {
    type Err = ParsePathTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "path_beg" => Ok(PathType::PathBeg),
            "path_reg" => Ok(PathType::PathReg),
            other => Err(ParsePathTypeError(other.to_string())),
        }
    }
}

/// Desired proxy configuration for one service.
///
/// Empty strings stand for unset optional fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoutingIntent {
    pub service_name: String,
    pub service_color: String,
    pub service_path: Vec<String>,
    pub service_domain: String,
    pub path_type: PathType,
    pub skip_check: bool,
    pub consul_template_path: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntentError {
    #[error("serviceName parameter is mandatory")]
    MissingServiceName,

    #[error("servicePath parameter is mandatory")]
    MissingServicePath,

    #[error("serviceName '{0}' may only contain letters, digits, '_', '.' and '-'")]
    InvalidServiceName(String),
}

/// Check a service name usable as a KV segment, file name and HAProxy identifier.
pub fn validate_service_name(name: &str) -> Result<(), IntentError> {
    if name.is_empty() {
        return Err(IntentError::MissingServiceName);
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !valid || name == "." || name == ".." {
        return Err(IntentError::InvalidServiceName(name.to_string()));
    }
    Ok(())
}

impl RoutingIntent {
    /// Create an intent for `service_name` routed by prefix on `paths`.
    pub fn new(service_name: impl Into<String>, paths: Vec<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_path: paths,
            ..Self::default()
        }
    }

    /// Check that the intent names a service and can be rendered.
    pub fn validate(&self) -> Result<(), IntentError> {
        validate_service_name(&self.service_name)?;
        if self.consul_template_path.is_empty() && self.service_path.is_empty() {
            return Err(IntentError::MissingServicePath);
        }
        Ok(())
    }

    /// Name of the service-discovery entry the backend iterates over.
    pub fn discovery_name(&self) -> String {
        if self.service_color.is_empty() {
            self.service_name.clone()
        } else {
            format!("{}-{}", self.service_name, self.service_color)
        }
    }
}

/// Process-wide engine settings, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineConfig {
    /// Consul base address, with or without scheme.
    pub consul_address: String,
    /// Directory holding generated templates.
    pub templates_path: PathBuf,
    /// Directory holding rendered proxy configs.
    pub configs_path: PathBuf,
}

impl EngineConfig {
    pub fn new(
        consul_address: impl Into<String>,
        templates_path: impl Into<PathBuf>,
        configs_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            consul_address: consul_address.into(),
            templates_path: templates_path.into(),
            configs_path: configs_path.into(),
        }
    }
}
