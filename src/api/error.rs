use crate::services::storage::StorageError;
use crate::utils::validation::ValidationError;
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::TooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            ValidationError::InvalidType { .. } | ValidationError::InvalidFilename { .. } => {
                AppError::BadRequest(err.to_string())
            }
        }
    }
}

/// True when the multipart parser stopped because the request body cap was hit
fn is_body_limit(err: &MultipartError) -> bool {
    err.status() == StatusCode::PAYLOAD_TOO_LARGE
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if is_body_limit(&err) {
            AppError::PayloadTooLarge("File too large".to_string())
        } else {
            AppError::BadRequest(err.body_text())
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TooLarge { .. } => AppError::PayloadTooLarge("File too large".to_string()),
            StorageError::Io(e) => {
                // Multipart read errors reach storage wrapped in io::Error
                if let Some(multipart) = e
                    .get_ref()
                    .and_then(|inner| inner.downcast_ref::<MultipartError>())
                {
                    return if is_body_limit(multipart) {
                        AppError::PayloadTooLarge("File too large".to_string())
                    } else {
                        AppError::BadRequest(multipart.body_text())
                    };
                }
                AppError::Io(e)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::Io(e) => {
                tracing::error!("IO error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Anyhow(e) => {
                tracing::error!("Anyhow error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_map_to_status() {
        let too_large: AppError = StorageError::TooLarge { max_size: 10 }.into();
        assert_eq!(
            too_large.into_response().status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );

        let disk: AppError =
            StorageError::Io(std::io::Error::new(std::io::ErrorKind::StorageFull, "disk full"))
                .into();
        assert!(matches!(disk, AppError::Io(_)));
        assert_eq!(
            disk.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
