//! Secret material handling

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Secure string type that zeroizes on drop and never prints its value.
///
/// Serialization exposes the value: it is how tokens reach storage and the
/// consumer. `Debug` and `Display` are redacted so root tokens cannot leak
/// through logs or error text.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the secret value
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// True for empty or whitespace-only values
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(***)")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_redacted() {
        let secret = SecretString::new("tok-A");
        assert_eq!(format!("{secret}"), "***");
        assert_eq!(format!("{secret:?}"), "SecretString(***)");
        assert_eq!(secret.expose(), "tok-A");
    }

    #[test]
    fn test_secret_serializes_transparently() {
        let secret = SecretString::new("tok-A");
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"tok-A\"");
        let back: SecretString = serde_json::from_str("\"tok-B\"").unwrap();
        assert_eq!(back.expose(), "tok-B");
    }

    #[test]
    fn test_blank_detection() {
        assert!(SecretString::default().is_blank());
        assert!(SecretString::new("  ").is_blank());
        assert!(!SecretString::new("x").is_blank());
    }
}
