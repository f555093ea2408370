//! Consul KV store subsystem.
//!
//! # Data Flow
//! ```text
//! engine (persist intent / replay fleet)
//!     → client.rs (KvStore trait, ConsulKv over reqwest)
//!     → address.rs (scheme normalisation)
//!     → Consul HTTP API (/v1/kv, /v1/catalog)
//! ```
//!
//! # Key Layout
//! - `docker-flow/<service>/color`
//! - `docker-flow/<service>/path` (comma-joined)
//! - `docker-flow/<service>/domain`
//! - `docker-flow/<service>/pathtype`
//! - `docker-flow/<service>/skipcheck` (`"true"`/`"false"`)
//! - `docker-flow/<service>/consultemplatepath`

pub mod address;
pub mod client;

pub use address::{strip_scheme, with_scheme};
pub use client::{ConsulKv, KvError, KvStore};

/// Root of every key written by the control plane.
pub const KEY_PREFIX: &str = "docker-flow";

pub const COLOR_KEY: &str = "color";
pub const PATH_KEY: &str = "path";
pub const DOMAIN_KEY: &str = "domain";
pub const PATH_TYPE_KEY: &str = "pathtype";
pub const SKIP_CHECK_KEY: &str = "skipcheck";
pub const CONSUL_TEMPLATE_PATH_KEY: &str = "consultemplatepath";

/// Build the key of one persisted field of a service.
pub fn service_key(service_name: &str, field: &str) -> String {
    format!("{}/{}/{}", KEY_PREFIX, service_name, field)
}

/// Build the key prefix holding every field of a service.
pub fn service_prefix(service_name: &str) -> String {
    format!("{}/{}", KEY_PREFIX, service_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_key() {
        assert_eq!(service_key("myService", PATH_KEY), "docker-flow/myService/path");
        assert_eq!(
            service_key("myService", CONSUL_TEMPLATE_PATH_KEY),
            "docker-flow/myService/consultemplatepath"
        );
        assert_eq!(service_prefix("myService"), "docker-flow/myService");
    }
}
