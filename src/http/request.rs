//! Request parsing for the control API.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) per request
//! - Turn reconfigure query parameters into a `RoutingIntent`
//! - Reject missing or malformed parameters before the engine runs

use axum::http::{HeaderName, Request};
use serde::Deserialize;
use thiserror::Error;
use tower_http::request_id::{MakeRequestId, RequestId};

use crate::engine::intent::{
    validate_service_name, IntentError, ParsePathTypeError, PathType, RoutingIntent,
};
use crate::http::response::ControlResponse;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request ID generator for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        uuid::Uuid::new_v4()
            .to_string()
            .parse()
            .ok()
            .map(RequestId::new)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error(transparent)]
    Intent(#[from] IntentError),

    #[error(transparent)]
    PathType(#[from] ParsePathTypeError),

    #[error("skipCheck must be true or false, got '{0}'")]
    SkipCheck(String),
}

/// Query parameters of `/v1/docker-flow-proxy/reconfigure`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconfigureParams {
    pub service_name: Option<String>,
    pub service_color: Option<String>,
    pub service_path: Option<String>,
    pub service_domain: Option<String>,
    pub path_type: Option<String>,
    pub skip_check: Option<String>,
    pub consul_template_path: Option<String>,
}

/// Query parameters of `/v1/docker-flow-proxy/remove`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveParams {
    pub service_name: Option<String>,
}

fn value(param: &Option<String>) -> String {
    param.as_deref().unwrap_or_default().to_string()
}

fn parse_bool(raw: &str) -> Result<bool, RequestError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(RequestError::SkipCheck(raw.to_string())),
    }
}

impl ReconfigureParams {
    pub fn service_name(&self) -> String {
        value(&self.service_name)
    }

    /// Build and validate the routing intent.
    pub fn to_intent(&self) -> Result<RoutingIntent, RequestError> {
        let service_path = self
            .service_path
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        let path_type = match self.path_type.as_deref() {
            None | Some("") => PathType::default(),
            Some(raw) => raw.parse()?,
        };

        let skip_check = match self.skip_check.as_deref() {
            None | Some("") => false,
            Some(raw) => parse_bool(raw)?,
        };

        let intent = RoutingIntent {
            service_name: self.service_name(),
            service_color: value(&self.service_color),
            service_path,
            service_domain: value(&self.service_domain),
            path_type,
            skip_check,
            consul_template_path: value(&self.consul_template_path),
        };
        intent.validate()?;
        Ok(intent)
    }

    /// Success body echoing the parameters that were set.
    pub fn echo(&self, intent: &RoutingIntent) -> ControlResponse {
        ControlResponse {
            service_color: intent.service_color.clone(),
            service_path: intent.service_path.clone(),
            service_domain: intent.service_domain.clone(),
            consul_template_path: intent.consul_template_path.clone(),
            path_type: value(&self.path_type),
            skip_check: intent.skip_check,
            ..ControlResponse::ok(intent.service_name.clone())
        }
    }
}

impl RemoveParams {
    pub fn service_name(&self) -> Result<String, RequestError> {
        let name = self.service_name.as_deref().unwrap_or_default();
        validate_service_name(name)?;
        Ok(name.to_string())
    }
}
