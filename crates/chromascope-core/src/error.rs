use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChromaError>;

#[derive(Debug, Error)]
pub enum ChromaError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("{operation} returned HTTP {status}")]
    Status { operation: &'static str, status: u16 },

    #[error("unexpected payload: {0}")]
    UnexpectedPayload(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ChromaError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::Connection(_) => "CONNECTION_FAILED",
            Self::Status { .. } => "HTTP_STATUS",
            Self::UnexpectedPayload(_) => "UNEXPECTED_PAYLOAD",
            Self::Http(_) => "HTTP_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }
}

/// Structured error slot embedded in report sections where a successful
/// result would otherwise appear.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SectionError {
    pub code: String,
    pub message: String,
}

impl From<&ChromaError> for SectionError {
    fn from(err: &ChromaError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<ChromaError> for SectionError {
    fn from(err: ChromaError) -> Self {
        Self::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_per_variant() {
        assert_eq!(
            ChromaError::Connection("refused".to_string()).code(),
            "CONNECTION_FAILED"
        );
        assert_eq!(
            ChromaError::Status {
                operation: "count",
                status: 503
            }
            .code(),
            "HTTP_STATUS"
        );
        assert_eq!(
            ChromaError::UnexpectedPayload("not an array".to_string()).code(),
            "UNEXPECTED_PAYLOAD"
        );
    }

    #[test]
    fn section_error_carries_code_and_message() {
        let err = ChromaError::Status {
            operation: "heartbeat",
            status: 500,
        };
        let section = SectionError::from(&err);
        assert_eq!(section.code, "HTTP_STATUS");
        assert_eq!(section.message, "heartbeat returned HTTP 500");
    }
}
