//! Lease-bound secrets handed to consumers

use super::duration::seconds;
use super::security::SecretString;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Consumer-visible fields of an issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    pub id: String,
    pub token: SecretString,
}

/// Fields kept for renew/revoke, never shown to the consumer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<SecretString>,
}

/// A credential bound to a host-managed lease
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeasedSecret {
    pub secret_type: String,
    pub data: TokenData,
    #[serde(default)]
    pub internal: InternalData,
    #[serde(with = "seconds", default)]
    pub ttl: Duration,
    #[serde(with = "seconds", default)]
    pub max_ttl: Duration,
    /// Set by the host when the lease is registered
    #[serde(default)]
    pub issue_time: Option<DateTime<Utc>>,
    /// Requested renewal increment, set by the host on renew
    #[serde(with = "seconds", default)]
    pub increment: Duration,
}

impl LeasedSecret {
    /// Build a secret whose internal copy mirrors the visible fields
    #[must_use]
    pub fn new(secret_type: impl Into<String>, id: impl Into<String>, token: SecretString) -> Self {
        let id = id.into();
        Self {
            secret_type: secret_type.into(),
            internal: InternalData {
                id: Some(id.clone()),
                token: Some(token.clone()),
            },
            data: TokenData { id, token },
            ttl: Duration::ZERO,
            max_ttl: Duration::ZERO,
            issue_time: None,
            increment: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_ttls(mut self, ttl: Duration, max_ttl: Duration) -> Self {
        self.ttl = ttl;
        self.max_ttl = max_ttl;
        self
    }

    /// Remote token identifier recorded at issuance
    #[must_use]
    pub fn internal_id(&self) -> Option<&str> {
        self.internal.id.as_deref().filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_copy_mirrors_visible_fields() {
        let secret = LeasedSecret::new("token", "abc", SecretString::new("value"));
        assert_eq!(secret.internal_id(), Some("abc"));
        assert_eq!(secret.internal.token.as_ref().unwrap().expose(), "value");
        assert_eq!(secret.data.id, "abc");
    }

    #[test]
    fn test_foreign_lease_has_no_identifier() {
        let json = r#"{"secret_type":"token","data":{"id":"abc","token":"v"},"ttl":60}"#;
        let secret: LeasedSecret = serde_json::from_str(json).unwrap();
        assert_eq!(secret.internal_id(), None);
        assert_eq!(secret.ttl, Duration::from_secs(60));
    }
}
