//! Login and server info payloads

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Response of `GET rest/info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub opsview_version: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
