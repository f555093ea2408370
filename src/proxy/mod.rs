//! Reverse-proxy capability.
//!
//! # Data Flow
//! ```text
//! <templates>/haproxy.tmpl (base, optional)
//!     + <configs>/*.cfg (per-service output of consul-template)
//!     → haproxy.rs create_config_from_templates
//!     → <configs>/haproxy.cfg
//!     → haproxy.rs reload (-sf <old pid>)
//! ```

pub mod haproxy;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::exec::CommandError;

pub use haproxy::{HaProxy, HaProxySettings};

#[derive(Debug, Error)]
pub enum ProxyError {
    /// Reading templates or writing the assembled config failed.
    #[error("Proxy config I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The proxy binary failed.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Operations the control plane needs from the proxy.
#[async_trait]
pub trait Proxy: Send + Sync {
    /// Assemble the live config from the templates and rendered fragments.
    async fn create_config_from_templates(
        &self,
        templates_path: &Path,
        configs_path: &Path,
    ) -> Result<(), ProxyError>;

    /// Make the running proxy pick up the assembled config.
    async fn reload(&self) -> Result<(), ProxyError>;
}
