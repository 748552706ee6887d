//! Error types for the Agentscape environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Backend answered with a non-2xx status
    #[error("{operation}: {status}")]
    HttpStatus {
        operation: &'static str,
        status: u16,
    },

    /// Request could not be sent or the connection dropped
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Body serialization/deserialization failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Context operation failed
    #[error("Context error: {0}")]
    ContextError(String),

    /// Operation timed out
    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl EnvError {
    /// Creates a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkError(msg.into())
    }

    /// Creates a status error for the named operation.
    pub fn status(operation: &'static str, status: u16) -> Self {
        Self::HttpStatus { operation, status }
    }

    /// Returns the HTTP status code, if this error carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for EnvError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::SerializationError(err.to_string())
        } else {
            Self::NetworkError(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message_contains_code() {
        let err = EnvError::status("Failed to fetch agents", 503);
        assert_eq!(err.to_string(), "Failed to fetch agents: 503");
        assert_eq!(err.status_code(), Some(503));
    }

    #[test]
    fn test_network_error_has_no_status() {
        let err = EnvError::network("connection refused");
        assert_eq!(err.status_code(), None);
        assert!(err.to_string().contains("connection refused"));
    }
}
