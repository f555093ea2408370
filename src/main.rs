//! flow-proxy
//!
//! Control plane that turns service registrations into HAProxy config.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                  FLOW PROXY                  │
//!   GET /v1/...       │  ┌─────────┐    ┌─────────┐    ┌──────────┐  │
//!   ──────────────────┼─▶│  http   │───▶│ engine  │───▶│ template │  │
//!                     │  │ server  │    │         │    │ renderer │  │
//!                     │  └─────────┘    └────┬────┘    └──────────┘  │
//!                     │                      │                       │
//!                     │        ┌─────────────┼──────────────┐        │
//!                     │        ▼             ▼              ▼        │
//!                     │  ┌──────────┐  ┌──────────┐  ┌───────────┐   │
//!                     │  │ storage  │  │   exec   │  │    kv     │───┼──▶ Consul
//!                     │  │ (files)  │  │(consul-  │  │ (mirror)  │   │
//!                     │  └──────────┘  │ template)│  └───────────┘   │
//!                     │                └──────────┘                  │
//!                     │                      │                       │
//!                     │                ┌─────▼─────┐                 │
//!                     │                │   proxy   │─────────────────┼──▶ HAProxy
//!                     │                │ (haproxy) │                 │
//!                     │                └───────────┘                 │
//!                     └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use flow_proxy::config::{load_config, validate_config, AppConfig};
use flow_proxy::engine::{EngineDeps, EngineFactory, OperationLocks, ProxyRun, RemoveBuilder};
use flow_proxy::exec::CommandRunner;
use flow_proxy::http::{AppState, ControlServer, ServerSettings};
use flow_proxy::kv::ConsulKv;
use flow_proxy::observability::{logging, metrics};
use flow_proxy::proxy::{HaProxy, HaProxySettings};
use flow_proxy::storage::LocalFs;

#[derive(Parser, Debug)]
#[command(name = "flow-proxy", version, about = "Reconfigures HAProxy from service registrations")]
struct Args {
    /// TOML config file; defaults apply when omitted
    #[arg(short, long, env = "FLOW_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Control API bind IP
    #[arg(long, env = "IP")]
    ip: Option<String>,

    /// Control API port
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Consul address, scheme optional
    #[arg(long, env = "CONSUL_ADDRESS")]
    consul_address: Option<String>,

    /// Directory of generated templates
    #[arg(long)]
    templates_path: Option<PathBuf>,

    /// Directory of rendered proxy configs
    #[arg(long)]
    configs_path: Option<PathBuf>,
}

impl Args {
    fn apply(self, config: &mut AppConfig) {
        if let Some(ip) = self.ip {
            config.server.ip = ip;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(address) = self.consul_address {
            config.engine.consul_address = address;
        }
        if let Some(path) = self.templates_path {
            config.engine.templates_path = path;
        }
        if let Some(path) = self.configs_path {
            config.engine.configs_path = path;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    args.apply(&mut config);

    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            eprintln!("Invalid configuration: {}", error);
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }

    logging::init(&config.observability);
    tracing::info!("flow-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        ip = %config.server.ip,
        port = config.server.port,
        consul_address = %config.engine.consul_address,
        templates_path = %config.engine.templates_path.display(),
        configs_path = %config.engine.configs_path.display(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let fs = Arc::new(LocalFs);
    let runner = Arc::new(CommandRunner::new(Duration::from_secs(
        config.timeouts.command_secs,
    )));
    let proxy = Arc::new(HaProxy::new(
        HaProxySettings {
            binary: config.proxy.binary.clone(),
            pid_file: config.proxy.pid_file.clone(),
            base_template: config.proxy.base_template.clone(),
            configs_path: config.engine.configs_path.clone(),
        },
        fs.clone(),
        runner.clone(),
    ));
    let kv = Arc::new(ConsulKv::new(Duration::from_secs(config.timeouts.kv_secs))?);

    let engine = config.engine_config();
    let deps = EngineDeps {
        fs,
        runner,
        proxy: proxy.clone(),
        kv,
        locks: Arc::new(OperationLocks::new()),
        consul_template: config.proxy.consul_template_binary.clone(),
    };

    let state = AppState {
        engine: engine.clone(),
        reconfigure: Arc::new(EngineFactory::new(deps.clone())),
        remove: Arc::new(RemoveBuilder::new(engine.consul_address.clone(), deps)),
    };
    let startup = Arc::new(ProxyRun::new(
        proxy,
        engine.templates_path.clone(),
        engine.configs_path.clone(),
    ));

    let server = ControlServer::new(
        ServerSettings {
            ip: config.server.ip.clone(),
            port: config.server.port,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        },
        state,
        startup,
    );
    server.execute().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
