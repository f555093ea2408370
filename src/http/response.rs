//! JSON responses of the control API.
//!
//! # Design Decisions
//! - Field names are PascalCase (`Status`, `ServiceName`, ...)
//! - Unset optional fields are omitted rather than sent empty
//! - Every JSON response carries `Content-Type: application/json`

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

pub const STATUS_OK: &str = "OK";
pub const STATUS_NOK: &str = "NOK";

/// Body returned by the reconfigure and remove endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ControlResponse {
    pub status: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_color: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_path: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_domain: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub consul_template_path: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path_type: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip_check: bool,
}

impl ControlResponse {
    pub fn ok(service_name: impl Into<String>) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            service_name: service_name.into(),
            ..Self::default()
        }
    }

    pub fn failure(service_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: STATUS_NOK.to_string(),
            message: message.into(),
            service_name: service_name.into(),
            ..Self::default()
        }
    }

    /// Pair the body with a status code.
    pub fn with_status(self, status: StatusCode) -> Response {
        (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            Json(self),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_omits_unset_fields() {
        let json = serde_json::to_string(&ControlResponse::ok("myService")).unwrap();
        assert_eq!(json, r#"{"Status":"OK","ServiceName":"myService"}"#);
    }

    #[test]
    fn test_failure_carries_message() {
        let json = serde_json::to_string(&ControlResponse::failure("", "serviceName parameter is mandatory")).unwrap();
        assert_eq!(json, r#"{"Status":"NOK","Message":"serviceName parameter is mandatory"}"#);
    }

    #[test]
    fn test_full_body() {
        let response = ControlResponse {
            service_color: "pink".into(),
            service_path: vec!["/a".into(), "/b".into()],
            path_type: "path_reg".into(),
            skip_check: true,
            ..ControlResponse::ok("svc")
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["ServicePath"], serde_json::json!(["/a", "/b"]));
        assert_eq!(value["PathType"], "path_reg");
        assert_eq!(value["SkipCheck"], true);
        assert!(value.get("ServiceDomain").is_none());
    }
}
