//! Domain errors for sessions, models and transports.

use thiserror::Error;

/// Errors raised by the session and transport layer.
#[derive(Debug, Error)]
pub enum ReplError {
    /// The credential environment variable is unset or empty.
    #[error("{0} not found, please set it in your environment variables")]
    MissingCredential(String),

    /// Any other configuration problem (unreadable personality file, bad value).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The requested model identifier does not name a known model kind.
    #[error("model '{0}' not found")]
    ModelNotFound(String),

    /// Socket or connection failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// A fragment arrived after the sink was closed, or fence state was malformed.
    #[error("stream corruption: {0}")]
    StreamCorruption(String),

    /// The session was evicted or disconnected.
    #[error("session '{0}' is closed")]
    SessionClosed(String),
}

impl ReplError {
    /// Returns `true` for errors that prevent a session from being created.
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingCredential(_) | Self::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_display() {
        let err = ReplError::MissingCredential("OPENAI_API_KEY".to_string());
        assert_eq!(
            err.to_string(),
            "OPENAI_API_KEY not found, please set it in your environment variables"
        );
    }

    #[test]
    fn test_model_not_found_display() {
        let err = ReplError::ModelNotFound("gpt-9".to_string());
        assert_eq!(err.to_string(), "model 'gpt-9' not found");
    }

    #[test]
    fn test_is_configuration() {
        assert!(ReplError::MissingCredential("KEY".to_string()).is_configuration());
        assert!(ReplError::Configuration("bad".to_string()).is_configuration());
        assert!(!ReplError::ModelNotFound("x".to_string()).is_configuration());
        assert!(!ReplError::StreamCorruption("x".to_string()).is_configuration());
    }
}
