//! HTTP error mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use curanet_core::PortalError;
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// An error ready to leave the server: status plus client-safe message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// Logs `detail`; the client only sees a generic message.
    pub fn internal(detail: &str) -> Self {
        error!(detail, "internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl From<PortalError> for ApiError {
    fn from(err: PortalError) -> Self {
        let status = match &err {
            PortalError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            PortalError::InvalidToken | PortalError::Forbidden(_) => StatusCode::FORBIDDEN,
            PortalError::NotFound(_) => StatusCode::NOT_FOUND,
            PortalError::Conflict(_) | PortalError::Validation(_) => StatusCode::BAD_REQUEST,
            PortalError::Internal(detail) => return ApiError::internal(detail),
        };
        ApiError::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (PortalError::Unauthenticated("x".into()), StatusCode::UNAUTHORIZED),
            (PortalError::InvalidToken, StatusCode::FORBIDDEN),
            (PortalError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (PortalError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (PortalError::Conflict("x".into()), StatusCode::BAD_REQUEST),
            (PortalError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (PortalError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_internal_detail_not_exposed() {
        let err = ApiError::from(PortalError::Internal("disk I/O error at page 7".into()));
        assert_eq!(err.message, "Internal server error");
    }
}
