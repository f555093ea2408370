//! HTTP control server setup.
//!
//! # Responsibilities
//! - Create the Axum Router with the control API routes
//! - Wire up middleware (tracing, timeout, request ID)
//! - Run the startup step and the fleet replay before listening
//! - Bind the listener and serve until shutdown

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::engine::{
    EngineConfig, Executable, ReconfigureError, ReconfigureFactory, RemoveFactory, RoutingIntent,
    RunError,
};
use crate::http::handlers;
use crate::http::request::{UuidRequestId, X_REQUEST_ID};

/// API versions served side by side.
const VERSIONS: [&str; 2] = ["v1", "v2"];

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Startup failed: {0}")]
    Startup(#[from] RunError),

    #[error("Initial fleet replay failed: {0}")]
    Replay(#[source] ReconfigureError),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: EngineConfig,
    pub reconfigure: Arc<dyn ReconfigureFactory>,
    pub remove: Arc<dyn RemoveFactory>,
}

/// Listener settings of the control server.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub ip: String,
    pub port: u16,
    pub request_timeout: Duration,
}

impl ServerSettings {
    /// `<ip>:<port>`, bracketing IPv6 literals.
    pub fn address(&self) -> String {
        if self.ip.contains(':') && !self.ip.starts_with('[') {
            format!("[{}]:{}", self.ip, self.port)
        } else {
            format!("{}:{}", self.ip, self.port)
        }
    }
}

/// HTTP server for the control API.
pub struct ControlServer {
    settings: ServerSettings,
    state: AppState,
    startup: Arc<dyn Executable>,
}

impl ControlServer {
    pub fn new(settings: ServerSettings, state: AppState, startup: Arc<dyn Executable>) -> Self {
        Self {
            settings,
            state,
            startup,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        let mut router = Router::new();
        for version in VERSIONS {
            router = router
                .route(
                    &format!("/{}/test", version),
                    get(handlers::test).fallback(handlers::not_found),
                )
                .route(
                    &format!("/{}/docker-flow-proxy/reconfigure", version),
                    get(handlers::reconfigure).fallback(handlers::not_found),
                )
                .route(
                    &format!("/{}/docker-flow-proxy/remove", version),
                    get(handlers::remove).fallback(handlers::not_found),
                );
        }

        router
            .fallback(handlers::not_found)
            .with_state(self.state.clone())
            .layer(TimeoutLayer::new(self.settings.request_timeout))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// Bring the proxy up and replay the fleet from Consul.
    pub async fn prepare(&self) -> Result<(), ServerError> {
        self.startup.execute().await?;

        let engine = self
            .state
            .reconfigure
            .create(self.state.engine.clone(), RoutingIntent::default());
        engine
            .reload_all_services(&self.state.engine.consul_address)
            .await
            .map_err(ServerError::Replay)
    }

    /// Prepare, bind and serve until Ctrl+C.
    pub async fn execute(self) -> Result<(), ServerError> {
        self.execute_until(shutdown_signal()).await
    }

    /// Prepare, bind and serve until `shutdown` completes.
    pub async fn execute_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.prepare().await?;

        let address = self.settings.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind { address, source })?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr().map_err(ServerError::Serve)?;
        tracing::info!(address = %addr, "Control server listening");

        let app = self.router().into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ServerError::Serve)?;

        tracing::info!("Control server stopped");
        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
