//! Reconfiguration engine subsystem.
//!
//! # Data Flow
//! ```text
//! RoutingIntent + EngineConfig
//!     → reconfigure.rs  render → write template → consul-template
//!                       → proxy rebuild → proxy reload → KV mirror
//!
//! KV mirror (Consul catalog + docker-flow/<service>/*)
//!     → reconfigure.rs reload_all_services (fleet replay)
//!
//! service name
//!     → remove.rs  drop fragment → proxy rebuild → reload → KV delete
//! ```
//!
//! # Design Decisions
//! - Capabilities (fs, processes, proxy, KV) are injected via `EngineDeps`
//! - Each engine owns its config and intent; nothing is shared but locks
//! - `locks.rs` serialises same-service operations and the shared pipeline

pub mod intent;
pub mod locks;
pub mod reconfigure;
pub mod remove;
pub mod run;

pub use intent::{validate_service_name, EngineConfig, IntentError, PathType, RoutingIntent};
pub use locks::OperationLocks;
pub use reconfigure::{
    EngineDeps, EngineFactory, Reconfigurable, Reconfigure, ReconfigureError, ReconfigureFactory,
    SERVICE_TEMPLATE_FILENAME,
};
pub use remove::{Removable, Remove, RemoveBuilder, RemoveError, RemoveFactory};
pub use run::{Executable, ProxyRun, RunError};
