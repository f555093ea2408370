//! Control API handlers.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::Response,
};

use crate::http::request::{ReconfigureParams, RemoveParams};
use crate::http::response::ControlResponse;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Liveness probe.
pub async fn test() -> StatusCode {
    metrics::record_request("test", 200);
    StatusCode::OK
}

pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

pub async fn reconfigure(
    State(state): State<AppState>,
    query: Result<Query<ReconfigureParams>, QueryRejection>,
) -> Response {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => return rejected("reconfigure", rejection),
    };
    let intent = match params.to_intent() {
        Ok(intent) => intent,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected reconfigure request");
            metrics::record_request("reconfigure", 400);
            return ControlResponse::failure(params.service_name(), e.to_string())
                .with_status(StatusCode::BAD_REQUEST);
        }
    };

    tracing::info!(
        service = %intent.service_name,
        color = %intent.service_color,
        paths = ?intent.service_path,
        domain = %intent.service_domain,
        "Reconfigure requested"
    );

    // Runs to completion even when the request times out.
    let engine = state.reconfigure.create(state.engine.clone(), intent.clone());
    let outcome = tokio::spawn(async move { engine.execute().await.map_err(|e| e.to_string()) })
        .await
        .unwrap_or_else(|e| Err(format!("Reconfiguration task failed: {}", e)));
    match outcome {
        Ok(()) => {
            metrics::record_request("reconfigure", 200);
            params.echo(&intent).with_status(StatusCode::OK)
        }
        Err(e) => {
            metrics::record_request("reconfigure", 500);
            ControlResponse::failure(intent.service_name, e)
                .with_status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn remove(
    State(state): State<AppState>,
    query: Result<Query<RemoveParams>, QueryRejection>,
) -> Response {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => return rejected("remove", rejection),
    };
    let service_name = match params.service_name() {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected remove request");
            metrics::record_request("remove", 400);
            return ControlResponse::failure("", e.to_string()).with_status(StatusCode::BAD_REQUEST);
        }
    };

    tracing::info!(service = %service_name, "Remove requested");

    let removal = state.remove.create(
        &service_name,
        state.engine.configs_path.clone(),
        state.engine.templates_path.clone(),
    );
    let outcome = tokio::spawn(async move { removal.execute().await.map_err(|e| e.to_string()) })
        .await
        .unwrap_or_else(|e| Err(format!("Removal task failed: {}", e)));
    match outcome {
        Ok(()) => {
            metrics::record_request("remove", 200);
            ControlResponse::ok(service_name).with_status(StatusCode::OK)
        }
        Err(e) => {
            metrics::record_request("remove", 500);
            ControlResponse::failure(service_name, e)
                .with_status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Malformed query strings get the same JSON body as validation failures.
fn rejected(route: &'static str, rejection: QueryRejection) -> Response {
    tracing::warn!(route, error = %rejection.body_text(), "Rejected malformed query");
    metrics::record_request(route, 400);
    ControlResponse::failure("", rejection.body_text()).with_status(StatusCode::BAD_REQUEST)
}
