//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! engine / http handlers produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (operation counters, replay gauge)
//!
//! Consumers:
//!     → stdout (tracing-subscriber fmt layer)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level
//! - Request ID flows through the control API via tower-http
//! - Metrics are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
