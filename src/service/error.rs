//! Error types for analysis requests and analysis client calls

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::RequestKind;

/// Error category surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidResponse,
    TransportFailure,
    Timeout,
    InvalidRequest,
}

/// A single analysis call that did not produce a verdict
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AnalysisFailure {
    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    #[error("Analysis transport failed: {0}")]
    TransportFailure(String),

    #[error("Analysis timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl AnalysisFailure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisFailure::InvalidResponse(_) => ErrorKind::InvalidResponse,
            AnalysisFailure::TransportFailure(_) => ErrorKind::TransportFailure,
            AnalysisFailure::Timeout(_) => ErrorKind::Timeout,
        }
    }
}

/// Request content that does not match its declared kind
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RequestError {
    #[error("A {0} request requires non-empty text")]
    MissingText(RequestKind),

    #[error("A {0} request requires an image")]
    MissingImage(RequestKind),

    #[error("A text request must not carry an image")]
    UnexpectedImage,

    #[error("Invalid image payload: {0}")]
    InvalidImage(String),
}

/// Per-item failure inside a batch, positioned at its input index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AnalysisError {
    pub index: usize,
    pub kind: ErrorKind,
    pub reason: String,
}

impl AnalysisError {
    pub fn from_failure(index: usize, failure: &AnalysisFailure) -> Self {
        Self {
            index,
            kind: failure.kind(),
            reason: failure.to_string(),
        }
    }

    pub fn from_request_error(index: usize, error: &RequestError) -> Self {
        Self {
            index,
            kind: ErrorKind::InvalidRequest,
            reason: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kinds() {
        assert_eq!(
            AnalysisFailure::InvalidResponse("no body".into()).kind(),
            ErrorKind::InvalidResponse
        );
        assert_eq!(
            AnalysisFailure::TransportFailure("quota".into()).kind(),
            ErrorKind::TransportFailure
        );
        assert_eq!(
            AnalysisFailure::Timeout(Duration::from_secs(1)).kind(),
            ErrorKind::Timeout
        );
    }

    #[test]
    fn test_batch_error_keeps_index_and_reason() {
        let failure = AnalysisFailure::Timeout(Duration::from_millis(250));
        let error = AnalysisError::from_failure(3, &failure);
        assert_eq!(error.index, 3);
        assert_eq!(error.kind, ErrorKind::Timeout);
        assert_eq!(error.reason, "Analysis timed out after 250ms");
    }
}
