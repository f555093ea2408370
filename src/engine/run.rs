//! Startup step bringing the proxy up before the control API listens.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::proxy::{Proxy, ProxyError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to build initial proxy config: {0}")]
    Rebuild(#[source] ProxyError),

    #[error("Failed to start proxy: {0}")]
    Start(#[source] ProxyError),
}

/// A one-off step executed during server startup.
#[async_trait]
pub trait Executable: Send + Sync {
    async fn execute(&self) -> Result<(), RunError>;
}

/// Assembles whatever config already exists and (re)starts the proxy.
pub struct ProxyRun {
    proxy: Arc<dyn Proxy>,
    templates_path: PathBuf,
    configs_path: PathBuf,
}

impl ProxyRun {
    pub fn new(proxy: Arc<dyn Proxy>, templates_path: PathBuf, configs_path: PathBuf) -> Self {
        Self {
            proxy,
            templates_path,
            configs_path,
        }
    }
}

#[async_trait]
impl Executable for ProxyRun {
    async fn execute(&self) -> Result<(), RunError> {
        self.proxy
            .create_config_from_templates(&self.templates_path, &self.configs_path)
            .await
            .map_err(RunError::Rebuild)?;
        self.proxy.reload().await.map_err(RunError::Start)?;
        tracing::info!("Proxy started");
        Ok(())
    }
}
