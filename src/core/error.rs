use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::features::files::errors::TransferError;
use crate::shared::types::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<TransferError> for AppError {
    fn from(e: TransferError) -> Self {
        match e {
            // Unknown, foreign, expired and deleted all look the same to clients
            TransferError::NotFoundOrNotOwner
            | TransferError::NotFound
            | TransferError::Expired => AppError::NotFound("File not found".to_string()),
            TransferError::AuthenticationRequired => {
                AppError::Unauthorized("Authentication required".to_string())
            }
            TransferError::UpstreamUnavailable(msg) => AppError::ServiceUnavailable(msg),
            TransferError::EntropyUnavailable(msg) | TransferError::DuplicateToken(msg) => {
                AppError::Internal(msg)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::Validation(ref msg) => (
                StatusCode::BAD_REQUEST,
                msg.clone(),
                Some(vec![msg.clone()]),
            ),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::Unauthorized(ref msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            AppError::ServiceUnavailable(ref msg) => {
                tracing::error!("Upstream unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable, please retry".to_string(),
                    None,
                )
            }
        };

        let body = Json(ApiResponse::<()>::error(Some(message), errors));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(e: TransferError) -> StatusCode {
        AppError::from(e).into_response().status()
    }

    #[test]
    fn test_transfer_errors_map_to_status_codes() {
        assert_eq!(status_of(TransferError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(TransferError::Expired), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(TransferError::NotFoundOrNotOwner),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(TransferError::AuthenticationRequired),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(TransferError::UpstreamUnavailable("timeout".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(TransferError::EntropyUnavailable("closed".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(TransferError::DuplicateToken("abc".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_expired_and_unknown_share_a_message() {
        let expired = AppError::from(TransferError::Expired).to_string();
        let unknown = AppError::from(TransferError::NotFound).to_string();
        assert_eq!(expired, unknown);
    }
}
