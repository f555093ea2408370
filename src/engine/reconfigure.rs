//! Reconfiguration engine.
//!
//! # Responsibilities
//! - Render a service template and materialise it with consul-template
//! - Rebuild and reload the proxy
//! - Mirror the routing intent into the KV store
//! - Rebuild the whole fleet from the KV mirror (replay)
//!
//! # Design Decisions
//! - Steps run strictly in order; the first failure aborts the rest
//! - KV fields are written one by one and never rolled back; a failed
//!   write reports the key it stopped at
//! - Replay skips services it cannot read instead of failing the fleet
//! - Every service owns exactly one fragment, `<configs>/<service>.cfg`,
//!   whether it was written by `execute` or by replay

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::engine::intent::{validate_service_name, EngineConfig, PathType, RoutingIntent};
use crate::engine::locks::OperationLocks;
use crate::exec::{CommandError, ProcessRunner};
use crate::kv::{self, strip_scheme, with_scheme, KvError, KvStore};
use crate::observability::metrics;
use crate::proxy::{Proxy, ProxyError};
use crate::storage::FileSystem;
use crate::template::{self, TemplateError};

/// Template file shared by every reconfiguration and by replay.
pub const SERVICE_TEMPLATE_FILENAME: &str = "service-formatted.ctmpl";

/// Permission bits of the written template.
pub const TEMPLATE_MODE: u32 = 0o664;

#[derive(Debug, Error)]
pub enum ReconfigureError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Failed to write template {path}: {source}")]
    FileWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove stale config {path}: {source}")]
    FileRemove {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("consul-template failed: {0}")]
    Command(#[from] CommandError),

    #[error("Failed to rebuild proxy config: {0}")]
    ProxyRebuild(#[source] ProxyError),

    #[error("Failed to reload proxy: {0}")]
    ProxyReload(#[source] ProxyError),

    #[error("Failed to store {key} in Consul: {source}")]
    KvWrite {
        key: String,
        #[source]
        source: KvError,
    },

    #[error("Failed to read service catalog: {0}")]
    Catalog(#[source] KvError),
}

/// An engine bound to one routing intent.
#[async_trait]
pub trait Reconfigurable: Send + Sync {
    /// Apply the intent to the proxy and persist it.
    async fn execute(&self) -> Result<(), ReconfigureError>;

    /// The configuration and intent this engine was built with.
    fn data(&self) -> (&EngineConfig, &RoutingIntent);

    /// Rebuild the proxy config for every service persisted at `address`.
    async fn reload_all_services(&self, address: &str) -> Result<(), ReconfigureError>;
}

/// Builds engines for incoming requests.
pub trait ReconfigureFactory: Send + Sync {
    fn create(&self, config: EngineConfig, intent: RoutingIntent) -> Box<dyn Reconfigurable>;
}

/// Capabilities shared by every engine instance.
#[derive(Clone)]
pub struct EngineDeps {
    pub fs: Arc<dyn FileSystem>,
    pub runner: Arc<dyn ProcessRunner>,
    pub proxy: Arc<dyn Proxy>,
    pub kv: Arc<dyn KvStore>,
    pub locks: Arc<OperationLocks>,
    /// Program name or path of consul-template.
    pub consul_template: String,
}

pub struct Reconfigure {
    config: EngineConfig,
    intent: RoutingIntent,
    deps: EngineDeps,
}

impl Reconfigure {
    pub fn new(config: EngineConfig, intent: RoutingIntent, deps: EngineDeps) -> Self {
        Self { config, intent, deps }
    }

    fn template_file(&self) -> PathBuf {
        self.config.templates_path.join(SERVICE_TEMPLATE_FILENAME)
    }

    fn service_config_file(&self, service_name: &str) -> PathBuf {
        self.config.configs_path.join(format!("{}.cfg", service_name))
    }

    /// Arguments of a one-shot consul-template run writing `output`.
    pub fn consul_template_args(&self, consul_address: &str, output: &Path) -> Vec<String> {
        vec![
            "-consul".to_string(),
            strip_scheme(consul_address),
            "-template".to_string(),
            format!("{}:{}", self.template_file().display(), output.display()),
            "-once".to_string(),
        ]
    }

    /// Write the template and run consul-template into `output`.
    async fn materialise(
        &self,
        template: &str,
        consul_address: &str,
        output: &Path,
    ) -> Result<(), ReconfigureError> {
        let template_file = self.template_file();
        self.deps
            .fs
            .write(&template_file, template, TEMPLATE_MODE)
            .await
            .map_err(|source| ReconfigureError::FileWrite {
                path: template_file.display().to_string(),
                source,
            })?;

        let args = self.consul_template_args(consul_address, output);
        self.deps.runner.run(&self.deps.consul_template, &args).await?;
        Ok(())
    }

    async fn rebuild_and_reload(&self) -> Result<(), ReconfigureError> {
        self.deps
            .proxy
            .create_config_from_templates(&self.config.templates_path, &self.config.configs_path)
            .await
            .map_err(ReconfigureError::ProxyRebuild)?;

        self.deps
            .proxy
            .reload()
            .await
            .map_err(ReconfigureError::ProxyReload)
    }

    async fn persist(&self) -> Result<(), ReconfigureError> {
        let intent = &self.intent;
        let fields = [
            (kv::COLOR_KEY, intent.service_color.clone()),
            (kv::PATH_KEY, intent.service_path.join(",")),
            (kv::DOMAIN_KEY, intent.service_domain.clone()),
            (kv::PATH_TYPE_KEY, intent.path_type.to_string()),
            (kv::SKIP_CHECK_KEY, intent.skip_check.to_string()),
            (kv::CONSUL_TEMPLATE_PATH_KEY, intent.consul_template_path.clone()),
        ];

        for (field, value) in fields {
            let key = kv::service_key(&intent.service_name, field);
            self.deps
                .kv
                .put(&self.config.consul_address, &key, &value)
                .await
                .map_err(|source| ReconfigureError::KvWrite { key, source })?;
        }
        Ok(())
    }

    async fn run(&self) -> Result<(), ReconfigureError> {
        let _service = self.deps.locks.service(&self.intent.service_name).await;

        let template = template::render(&self.intent, self.deps.fs.as_ref()).await?;
        {
            let _pipeline = self.deps.locks.pipeline().await;
            let output = self.service_config_file(&self.intent.service_name);
            self.materialise(&template, &self.config.consul_address, &output)
                .await?;
            self.rebuild_and_reload().await?;
        }
        self.persist().await
    }

    async fn read_field(
        &self,
        address: &str,
        service_name: &str,
        field: &str,
    ) -> Result<String, KvError> {
        let key = kv::service_key(service_name, field);
        let value = self.deps.kv.get_raw(address, &key).await?;
        Ok(value.unwrap_or_default())
    }

    /// Rebuild one service's intent from its KV fields.
    ///
    /// Returns `None` when nothing routable is stored for the service.
    async fn read_intent(&self, address: &str, name: &str) -> Result<Option<RoutingIntent>, KvError> {
        let path = self.read_field(address, name, kv::PATH_KEY).await?;
        let consul_template_path = self
            .read_field(address, name, kv::CONSUL_TEMPLATE_PATH_KEY)
            .await?;
        let service_path: Vec<String> = path
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        if service_path.is_empty() && consul_template_path.is_empty() {
            return Ok(None);
        }

        let path_type = self.read_field(address, name, kv::PATH_TYPE_KEY).await?;
        let path_type: PathType = if path_type.is_empty() {
            Default::default()
        } else {
            path_type.parse().unwrap_or_else(|e| {
                tracing::warn!(service = %name, error = %e, "Falling back to path_beg");
                Default::default()
            })
        };

        let skip_check = self.read_field(address, name, kv::SKIP_CHECK_KEY).await?;

        Ok(Some(RoutingIntent {
            service_name: name.to_string(),
            service_color: self.read_field(address, name, kv::COLOR_KEY).await?,
            service_path,
            service_domain: self.read_field(address, name, kv::DOMAIN_KEY).await?,
            path_type,
            skip_check: skip_check.trim().eq_ignore_ascii_case("true"),
            consul_template_path,
        }))
    }

    async fn replay(&self, address: &str) -> Result<usize, ReconfigureError> {
        let address = with_scheme(address);
        let services = self
            .deps
            .kv
            .services(&address)
            .await
            .map_err(ReconfigureError::Catalog)?;

        let mut intents = Vec::new();
        for name in &services {
            if let Err(e) = validate_service_name(name) {
                tracing::warn!(service = %name, error = %e, "Unusable service name, skipping");
                continue;
            }
            match self.read_intent(&address, name).await {
                Ok(Some(intent)) => intents.push(intent),
                Ok(None) => tracing::debug!(service = %name, "No routing data stored, skipping"),
                Err(e) => tracing::warn!(service = %name, error = %e, "Failed to read routing data, skipping"),
            }
        }

        if intents.is_empty() {
            tracing::info!(catalog = services.len(), "No services to replay");
            return Ok(0);
        }

        let mut templates = Vec::with_capacity(intents.len());
        for intent in &intents {
            templates.push(template::render(intent, self.deps.fs.as_ref()).await?);
        }

        let _pipeline = self.deps.locks.pipeline().await;
        for (intent, template) in intents.iter().zip(&templates) {
            let output = self.service_config_file(&intent.service_name);
            self.materialise(template, &address, &output).await?;
            tracing::debug!(service = %intent.service_name, path = %output.display(), "Service replayed");
        }
        self.rebuild_and_reload().await?;
        Ok(intents.len())
    }
}

#[async_trait]
impl Reconfigurable for Reconfigure {
    async fn execute(&self) -> Result<(), ReconfigureError> {
        let result = self.run().await;
        match &result {
            Ok(()) => tracing::info!(
                service = %self.intent.service_name,
                paths = ?self.intent.service_path,
                "Service reconfigured"
            ),
            Err(e) => tracing::error!(
                service = %self.intent.service_name,
                error = %e,
                "Reconfiguration failed"
            ),
        }
        metrics::record_operation("reconfigure", result.is_ok());
        result
    }

    fn data(&self) -> (&EngineConfig, &RoutingIntent) {
        (&self.config, &self.intent)
    }

    async fn reload_all_services(&self, address: &str) -> Result<(), ReconfigureError> {
        match self.replay(address).await {
            Ok(count) => {
                tracing::info!(services = count, "Fleet replayed");
                metrics::record_replayed_services(count);
                metrics::record_operation("replay", true);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Fleet replay failed");
                metrics::record_operation("replay", false);
                Err(e)
            }
        }
    }
}

/// Default `ReconfigureFactory` handing out `Reconfigure` engines.
#[derive(Clone)]
pub struct EngineFactory {
    deps: EngineDeps,
}

impl EngineFactory {
    pub fn new(deps: EngineDeps) -> Self {
        Self { deps }
    }

    pub fn deps(&self) -> &EngineDeps {
        &self.deps
    }
}

impl ReconfigureFactory for EngineFactory {
    fn create(&self, config: EngineConfig, intent: RoutingIntent) -> Box<dyn Reconfigurable> {
        Box::new(Reconfigure::new(config, intent, self.deps.clone()))
    }
}
