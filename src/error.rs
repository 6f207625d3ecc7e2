//! Domain-specific error types for semsim-kp

use thiserror::Error;

/// Main error type for the semsim-kp TRAPI service
#[derive(Error, Debug)]
pub enum SemsimKpError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Similarity service error: {message}")]
    Similarity { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SemsimKpError {
    /// Errors attributable to the request (or its upstream consequences)
    /// are reported as HTTP 400 with a description, per the TRAPI contract.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SemsimKpError::Validation { .. } | SemsimKpError::Similarity { .. }
        )
    }

    /// Bare message embedded as the response `description`; the error
    /// category prefix stays in the logs.
    pub fn description(&self) -> String {
        match self {
            SemsimKpError::Validation { message } | SemsimKpError::Similarity { message } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

impl From<anyhow::Error> for SemsimKpError {
    fn from(err: anyhow::Error) -> Self {
        SemsimKpError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SemsimKpError {
    fn from(err: serde_json::Error) -> Self {
        SemsimKpError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for SemsimKpError {
    fn from(err: reqwest::Error) -> Self {
        SemsimKpError::Similarity {
            message: format!("HTTP request failed: {}", err),
        }
    }
}

/// Result type alias for semsim-kp operations
pub type Result<T> = std::result::Result<T, SemsimKpError>;
