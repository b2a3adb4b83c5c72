//! Errors reported by the remote token service client

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a remote token service call
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The addressed resource does not exist (HTTP 404)
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// The service answered with an error
    #[error("request failed with status {status}: {}", .messages.join("; "))]
    Api { status: u16, messages: Vec<String> },

    /// The request never produced a response
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The response could not be decoded
    #[error("failed to decode response: {message}")]
    Decode { message: String },

    /// Client could not be built
    #[error("invalid client configuration: {message}")]
    Config { message: String },
}

impl RemoteError {
    /// True when the service reported the resource as absent
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True when no usable answer came back, as opposed to the service
    /// refusing the request
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Decode { .. } | Self::Config { .. }
        )
    }

    pub(crate) fn transport(error: reqwest::Error) -> Self {
        Self::Transport {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_lists_messages() {
        let err = RemoteError::Api {
            status: 429,
            messages: vec!["rate limited".to_string(), "try later".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "request failed with status 429: rate limited; try later"
        );
        assert!(!err.is_not_found());
        assert!(!err.is_fault());
    }

    #[test]
    fn test_not_found_is_distinguishable() {
        let err = RemoteError::NotFound {
            resource: "token 'abc'".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_fault());
    }

    #[test]
    fn test_undecodable_response_is_fault() {
        let err = RemoteError::Decode {
            message: "expected value at line 1 column 1".to_string(),
        };
        assert!(err.is_fault());
    }
}
