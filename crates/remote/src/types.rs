//! Wire types of the token service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokenlease_core::{SecretString, ACTIVE_TOKEN_STATUS};

/// Permission group granted by a policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One policy attached to a token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub effect: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub resources: serde_json::Value,
    #[serde(default)]
    pub permission_groups: Vec<PermissionGroup>,
}

/// IP ranges a token may or may not be used from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestIpCondition {
    #[serde(rename = "in", default, skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_in: Vec<String>,
}

/// Request-time constraints merged into a new token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCondition {
    #[serde(rename = "request.ip", default, skip_serializing_if = "Option::is_none")]
    pub request_ip: Option<RequestIpCondition>,
}

impl TokenCondition {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.request_ip.is_none()
    }
}

/// Body of a create-token call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewToken {
    pub name: String,
    pub policies: Vec<TokenPolicy>,
    #[serde(skip_serializing_if = "TokenCondition::is_empty")]
    pub condition: TokenCondition,
    pub expires_on: DateTime<Utc>,
}

/// Result of a create-token call; `value` is only ever returned here
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedToken {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    pub value: SecretString,
}

/// Result of verifying the calling token
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenVerification {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub expires_on: Option<DateTime<Utc>>,
}

impl TokenVerification {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ACTIVE_TOKEN_STATUS
    }
}
