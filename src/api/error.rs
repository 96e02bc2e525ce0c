//! Unified API error handling
//!
//! Every endpoint returns `Result<T, ApiError>` so failures share one JSON shape.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::service::{AnalysisFailure, RequestError};

/// Standard error response format
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Unique request ID for tracing
    pub request_id: String,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Bad request / validation error (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Model call failed or returned something unusable (502)
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Model call ran past its deadline (504)
    #[error("Analysis timed out: {0}")]
    GatewayTimeout(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::ExternalService(_) => "external_service_error",
            ApiError::GatewayTimeout(_) => "timeout",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_type = self.error_type();
        let request_id = Uuid::new_v4().to_string();

        if status.is_client_error() {
            tracing::warn!(
                error_type = error_type,
                status = status.as_u16(),
                request_id = %request_id,
                message = %self,
                "API request rejected"
            );
        } else {
            tracing::error!(
                error_type = error_type,
                status = status.as_u16(),
                request_id = %request_id,
                message = %self,
                "API error"
            );
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            request_id,
        })
    }
}

impl From<AnalysisFailure> for ApiError {
    fn from(err: AnalysisFailure) -> Self {
        match err {
            AnalysisFailure::Timeout(_) => ApiError::GatewayTimeout(err.to_string()),
            AnalysisFailure::InvalidResponse(_) | AnalysisFailure::TransportFailure(_) => {
                ApiError::ExternalService(err.to_string())
            }
        }
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
