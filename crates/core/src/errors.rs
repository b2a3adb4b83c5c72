/// Result type alias for tokenlease operations
pub type Result<T> = std::result::Result<T, Error>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Core error type for tokenlease operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required name (role name, path segment) was empty
    #[error("missing {what} name")]
    MissingName { what: &'static str },

    /// A required request field was absent
    #[error("missing '{field}' in {operation} request")]
    MissingField {
        field: &'static str,
        operation: &'static str,
    },

    /// A role name contained characters the mount does not route
    #[error("invalid role name '{name}': {message}")]
    InvalidName { name: String, message: String },

    /// Request fields could not be decoded into the expected types
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Policy document was not syntactically valid JSON
    #[error("cannot parse policy document: {message}")]
    InvalidPolicy { message: String },

    /// Request condition was not valid JSON for a token condition
    #[error("err while decoding 'condition': {message}")]
    InvalidCondition { message: String },

    /// Reading the role failed
    #[error("err while getting role configuration for '{role}': {source}")]
    RoleLookup {
        role: String,
        #[source]
        source: Box<Error>,
    },

    /// Role is not configured
    #[error("could not find entry for role '{role}', did you configure it?")]
    RoleNotFound { role: String },

    /// Stored policy document does not decode into token policies
    #[error("failed to decode the policy document of role '{role}' into a list of token policies: {message}")]
    PolicyDecode { role: String, message: String },

    /// Mount has no configuration at the given path
    #[error("configuration does not exist, did you configure '{path}'?")]
    NotConfigured { path: &'static str },

    /// Root credential is stored but its token is blank
    #[error("cannot use the root credential when its token is empty")]
    EmptyCredential,

    /// Remote service reports the supplied token as unusable
    #[error("provided token is not currently active (id: '{token_id}', status: '{status}')")]
    InvalidCredential { token_id: String, status: String },

    /// Remote service rejected the token verification call
    #[error("encountered error when verifying token: {message}")]
    Verification { message: String },

    /// Invalid configuration values
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Unexpected failure talking to the remote token service
    #[error("remote token service error during {operation}: {message}")]
    Remote {
        operation: &'static str,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Remote service refused to regenerate the root token
    #[error("failed to rotate root token '{token_id}': {message}")]
    Rotation { token_id: String, message: String },

    /// Remote token creation failed
    #[error("failed to create token: {message}")]
    Issuance { message: String },

    /// Remote expiry update failed
    #[error("failed to update token '{token_id}' with new expiration date: {message}")]
    Renewal { token_id: String, message: String },

    /// Remote token deletion failed
    #[error("failed to revoke token '{token_id}': {message}")]
    Revocation { token_id: String, message: String },

    /// Lease does not carry the remote token identifier
    #[error("id is missing on the {secret_type} lease")]
    MissingIdentifier { secret_type: String },

    /// TTL bounds could not be satisfied
    #[error("failed to calculate ttl: {message}")]
    TtlComputation { message: String },

    /// Storage backend failure
    #[error("storage {operation} failed for '{key}': {source}")]
    Storage {
        operation: &'static str,
        key: String,
        #[source]
        source: BoxError,
    },

    /// Stored value could not be encoded or decoded as JSON
    #[error("failed to {operation} JSON for '{key}': {source}")]
    Json {
        operation: &'static str,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Path/operation combination not served by this mount
    #[error("unsupported operation '{operation}' on path '{path}'")]
    Unsupported { operation: String, path: String },

    /// Operation deadline elapsed
    #[error("operation '{operation}' timed out after {duration:?}")]
    Timeout {
        operation: &'static str,
        duration: std::time::Duration,
    },
}

/// Failure classes the host reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    RemoteService,
    Storage,
    TtlComputation,
}

impl Error {
    /// Taxonomy class of this error
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NotConfigured { .. }
            | Self::EmptyCredential
            | Self::InvalidCredential { .. }
            | Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::MissingName { .. }
            | Self::MissingField { .. }
            | Self::InvalidName { .. }
            | Self::InvalidRequest { .. }
            | Self::InvalidPolicy { .. }
            | Self::InvalidCondition { .. }
            | Self::RoleLookup { .. }
            | Self::RoleNotFound { .. }
            | Self::PolicyDecode { .. }
            | Self::MissingIdentifier { .. }
            | Self::Unsupported { .. } => ErrorCategory::Validation,
            Self::Verification { .. }
            | Self::Remote { .. }
            | Self::Rotation { .. }
            | Self::Issuance { .. }
            | Self::Renewal { .. }
            | Self::Revocation { .. }
            | Self::Timeout { .. } => ErrorCategory::RemoteService,
            Self::Storage { .. } | Self::Json { .. } => ErrorCategory::Storage,
            Self::TtlComputation { .. } => ErrorCategory::TtlComputation,
        }
    }

    /// Whether the error is reported to the caller as an error response
    /// rather than propagated to the host as an operation fault.
    ///
    /// Storage failures, unexpected transport failures and elapsed deadlines
    /// are faults; everything the caller can act on is user-facing.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        match self.category() {
            ErrorCategory::Configuration
            | ErrorCategory::Validation
            | ErrorCategory::TtlComputation => true,
            ErrorCategory::RemoteService => matches!(
                self,
                Self::Verification { .. }
                    | Self::Rotation { .. }
                    | Self::Issuance { .. }
                    | Self::Renewal { .. }
                    | Self::Revocation { .. }
            ),
            ErrorCategory::Storage => false,
        }
    }

    /// Create a storage error
    #[must_use]
    pub fn storage(
        operation: &'static str,
        key: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Error::Storage {
            operation,
            key: key.into(),
            source: source.into(),
        }
    }

    /// Create a JSON encoding or decoding error for a stored key
    #[must_use]
    pub fn json(
        operation: &'static str,
        key: impl Into<String>,
        source: serde_json::Error,
    ) -> Self {
        Error::Json {
            operation,
            key: key.into(),
            source,
        }
    }

    /// Create a remote service error wrapping its cause
    #[must_use]
    pub fn remote_with_source(operation: &'static str, source: impl Into<BoxError>) -> Self {
        let source = source.into();
        Error::Remote {
            operation,
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a TTL computation error
    #[must_use]
    pub fn ttl(message: impl Into<String>) -> Self {
        Error::TtlComputation {
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: &'static str, duration: std::time::Duration) -> Self {
        Error::Timeout {
            operation,
            duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_user_facing() {
        let err = Error::RoleNotFound {
            role: "deploy".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(err.is_user_facing());
        assert_eq!(
            err.to_string(),
            "could not find entry for role 'deploy', did you configure it?"
        );
    }

    #[test]
    fn test_storage_and_transport_errors_are_faults() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = Error::storage("get", "config/token", io);
        assert_eq!(err.category(), ErrorCategory::Storage);
        assert!(!err.is_user_facing());

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset");
        let err = Error::remote_with_source("create-token", io);
        assert_eq!(err.category(), ErrorCategory::RemoteService);
        assert!(!err.is_user_facing());

        let err = Error::timeout("delete-token", std::time::Duration::from_secs(1));
        assert!(!err.is_user_facing());
    }

    #[test]
    fn test_reported_remote_errors_are_user_facing() {
        let err = Error::Revocation {
            token_id: "abc".to_string(),
            message: "rate limited".to_string(),
        };
        assert!(err.is_user_facing());
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_role_lookup_keeps_cause() {
        let cause = Error::MissingName { what: "role" };
        let err = Error::RoleLookup {
            role: String::new(),
            source: Box::new(cause),
        };
        assert!(err.to_string().ends_with("missing role name"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_configuration_category() {
        assert_eq!(
            Error::NotConfigured {
                path: "config/token"
            }
            .category(),
            ErrorCategory::Configuration
        );
        assert_eq!(Error::EmptyCredential.category(), ErrorCategory::Configuration);
    }
}
