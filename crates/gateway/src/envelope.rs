//! The API envelope: the header naming an endpoint, and the request/response payload wrappers.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Version used when a request or a group leaves it empty.
pub const DEFAULT_VERSION: &str = "v1";

/// Identifies the logical endpoint of a request plus pass-through metadata.
///
/// The routing identity is the 5-tuple (version, service, module, controller, action), compared
/// case-insensitively. The remaining fields are carried for handlers and are not validated here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiHeader {
    #[serde(rename = "Version", alias = "version", skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(rename = "Service", alias = "service", skip_serializing_if = "String::is_empty")]
    pub service: String,
    #[serde(rename = "Module", alias = "module", skip_serializing_if = "String::is_empty")]
    pub module: String,
    #[serde(rename = "Controller", alias = "controller", skip_serializing_if = "String::is_empty")]
    pub controller: String,
    #[serde(rename = "Action", alias = "action", skip_serializing_if = "String::is_empty")]
    pub action: String,
    #[serde(rename = "Timestamp", alias = "timestamp", skip_serializing_if = "is_zero")]
    pub timestamp: i64,
    #[serde(rename = "Noncestr", alias = "noncestr", alias = "Nonce", alias = "nonce", skip_serializing_if = "String::is_empty")]
    pub nonce: String,
    #[serde(rename = "Token", alias = "token", skip_serializing_if = "String::is_empty")]
    pub token: String,
    #[serde(rename = "SignType", alias = "signType", skip_serializing_if = "String::is_empty")]
    pub sign_type: String,
    #[serde(rename = "Sign", alias = "sign", skip_serializing_if = "String::is_empty")]
    pub sign: String,
    #[serde(rename = "ClientIP", alias = "clientIP", alias = "clientIp", skip_serializing_if = "String::is_empty")]
    pub client_ip: String,
    #[serde(rename = "Channel", alias = "channel", skip_serializing_if = "String::is_empty")]
    pub channel: String,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

impl ApiHeader {
    /// The version, `v1` when empty.
    pub fn version(&self) -> &str {
        if self.version.is_empty() { DEFAULT_VERSION } else { &self.version }
    }

    /// The lower-cased `version_service_module_controller_action` key used by the route table.
    pub fn route_key(&self) -> String {
        route_key(self.version(), &self.service, &self.module, &self.controller, &self.action)
    }
}

/// Builds the lower-cased route key from its five segments.
pub fn route_key(version: &str, service: &str, module: &str, controller: &str, action: &str) -> String {
    format!("{version}_{service}_{module}_{controller}_{action}").to_lowercase()
}

impl fmt::Display for ApiHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}_{}_{}", self.version(), self.service, self.module, self.controller, self.action)
    }
}

/// A decoded inbound call: the header and the still encoded request payload.
///
/// `data` is decoded by the handler through `Context::bind`, with the render strategy the
/// envelope arrived in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiRequest {
    pub header: ApiHeader,
    pub data: Bytes,
}

impl ApiRequest {
    /// Whether the call comes from a mobile app channel (`ios` or `android`).
    pub fn is_from_app(&self) -> bool {
        self.header.channel.eq_ignore_ascii_case("ios") || self.header.channel.eq_ignore_ascii_case("android")
    }

    /// Human readable rendering used by the access log in debug mode.
    pub fn dump(&self) -> String {
        let header = serde_json::to_string(&self.header).unwrap_or_default();
        format!("request header: {header}, request body: {}", String::from_utf8_lossy(&self.data))
    }
}

/// The outcome of a call. `err_code == 0` is success, anything else is a failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "APIResponse", rename_all = "camelCase")]
pub struct ApiResponse {
    #[serde(default)]
    pub err_code: i32,
    #[serde(default)]
    pub err_msg: String,
    #[serde(default)]
    pub result: Value,
}

impl ApiResponse {
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.err_code == 0
    }

    /// Human readable rendering used by the access log in debug mode.
    pub fn dump(&self) -> String {
        format!("response body: {}", serde_json::to_string(self).unwrap_or_default())
    }
}
