//! flow-proxy library: the reconfiguration control plane in front of HAProxy.

pub mod config;
pub mod engine;
pub mod exec;
pub mod http;
pub mod kv;
pub mod observability;
pub mod proxy;
pub mod storage;
pub mod template;

pub use config::AppConfig;
pub use engine::{EngineConfig, EngineDeps, EngineFactory, RemoveBuilder, RoutingIntent};
pub use http::{ControlServer, ServerSettings};
