//! Service removal.
//!
//! # Responsibilities
//! - Drop the service's rendered config fragment
//! - Rebuild and reload the proxy without it
//! - Delete the service's KV record so replay does not bring it back

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::engine::reconfigure::EngineDeps;
use crate::kv::{self, KvError};
use crate::observability::metrics;
use crate::proxy::ProxyError;

#[derive(Debug, Error)]
pub enum RemoveError {
    #[error("Failed to remove {path}: {source}")]
    FileRemove {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to rebuild proxy config: {0}")]
    ProxyRebuild(#[source] ProxyError),

    #[error("Failed to reload proxy: {0}")]
    ProxyReload(#[source] ProxyError),

    #[error("Failed to delete Consul record of {service}: {source}")]
    KvDelete {
        service: String,
        #[source]
        source: KvError,
    },
}

/// A removal bound to one service.
#[async_trait]
pub trait Removable: Send + Sync {
    async fn execute(&self) -> Result<(), RemoveError>;
}

/// Builds removals for incoming requests.
pub trait RemoveFactory: Send + Sync {
    fn create(&self, service_name: &str, configs_path: PathBuf, templates_path: PathBuf) -> Box<dyn Removable>;
}

pub struct Remove {
    pub service_name: String,
    pub configs_path: PathBuf,
    pub templates_path: PathBuf,
    consul_address: String,
    deps: EngineDeps,
}

impl Remove {
    pub fn new(
        service_name: impl Into<String>,
        configs_path: PathBuf,
        templates_path: PathBuf,
        consul_address: impl Into<String>,
        deps: EngineDeps,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            configs_path,
            templates_path,
            consul_address: consul_address.into(),
            deps,
        }
    }

    async fn run(&self) -> Result<(), RemoveError> {
        let _service = self.deps.locks.service(&self.service_name).await;

        let fragment = self.configs_path.join(format!("{}.cfg", self.service_name));
        match self.deps.fs.remove(&fragment).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %fragment.display(), "No config fragment to remove");
            }
            Err(source) => {
                return Err(RemoveError::FileRemove {
                    path: fragment.display().to_string(),
                    source,
                })
            }
        }

        {
            let _pipeline = self.deps.locks.pipeline().await;
            self.deps
                .proxy
                .create_config_from_templates(&self.templates_path, &self.configs_path)
                .await
                .map_err(RemoveError::ProxyRebuild)?;
            self.deps.proxy.reload().await.map_err(RemoveError::ProxyReload)?;
        }

        self.deps
            .kv
            .delete_tree(&self.consul_address, &kv::service_prefix(&self.service_name))
            .await
            .map_err(|source| RemoveError::KvDelete {
                service: self.service_name.clone(),
                source,
            })
    }
}

#[async_trait]
impl Removable for Remove {
    async fn execute(&self) -> Result<(), RemoveError> {
        let result = self.run().await;
        match &result {
            Ok(()) => tracing::info!(service = %self.service_name, "Service removed"),
            Err(e) => tracing::error!(service = %self.service_name, error = %e, "Removal failed"),
        }
        metrics::record_operation("remove", result.is_ok());
        result
    }
}

/// Default `RemoveFactory`, deleting KV records at a fixed Consul address.
#[derive(Clone)]
pub struct RemoveBuilder {
    consul_address: String,
    deps: EngineDeps,
}

impl RemoveBuilder {
    pub fn new(consul_address: impl Into<String>, deps: EngineDeps) -> Self {
        Self {
            consul_address: consul_address.into(),
            deps,
        }
    }
}

impl RemoveFactory for RemoveBuilder {
    fn create(&self, service_name: &str, configs_path: PathBuf, templates_path: PathBuf) -> Box<dyn Removable> {
        Box::new(Remove::new(
            service_name,
            configs_path,
            templates_path,
            self.consul_address.clone(),
            self.deps.clone(),
        ))
    }
}
