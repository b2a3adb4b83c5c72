//! Root credential record

use super::security::SecretString;
use serde::{Deserialize, Serialize};

/// The privileged token used to authenticate every remote call.
///
/// `token` and `token_id` are always written together; `token_id` is only
/// filled from a successful verify round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootCredential {
    pub token: SecretString,
    #[serde(rename = "id", default)]
    pub token_id: String,
}

impl RootCredential {
    #[must_use]
    pub fn new(token: impl Into<SecretString>, token_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_id: token_id.into(),
        }
    }

    /// Same identifier, new token value
    #[must_use]
    pub fn rotated(&self, token: impl Into<SecretString>) -> Self {
        Self {
            token: token.into(),
            token_id: self.token_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_layout() {
        let cred = RootCredential::new("tok-A", "id-1");
        let json = serde_json::to_value(&cred).unwrap();
        assert_eq!(json, serde_json::json!({"token": "tok-A", "id": "id-1"}));
    }

    #[test]
    fn test_rotation_keeps_identifier() {
        let cred = RootCredential::new("tok-A", "id-1");
        let rotated = cred.rotated("tok-B");
        assert_eq!(rotated.token_id, "id-1");
        assert_eq!(rotated.token.expose(), "tok-B");
    }
}
