//! Consul-template fragment rendering.
//!
//! # Responsibilities
//! - Turn a `RoutingIntent` into a frontend + backend stanza
//! - Pass custom templates through verbatim
//!
//! # Design Decisions
//! - Rendering is a pure function of the intent (plus the custom file)
//! - Path order is preserved exactly as received
//! - The bind block is fixed; only ACLs and the backend vary

pub mod renderer;

pub use renderer::{render, render_generated, TemplateError};
