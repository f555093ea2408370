//! HTTP control API subsystem.
//!
//! # Data Flow
//! ```text
//! GET /v1/docker-flow-proxy/reconfigure?serviceName=...
//!     → server.rs (Axum router, request ID, trace, timeout)
//!     → request.rs (query → RoutingIntent, validation → 400)
//!     → handlers.rs (engine execute → 200 / 500)
//!     → response.rs (PascalCase JSON body)
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{ReconfigureParams, RemoveParams, RequestError, X_REQUEST_ID};
pub use response::ControlResponse;
pub use server::{AppState, ControlServer, ServerError, ServerSettings};
