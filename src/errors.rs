use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::Uuid;

// --- Domain/Infrastructure Errors ---

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Pin not found with ID: {0}")]
    NotFound(Uuid),

    #[error("Stored pin row is corrupt: {0}")]
    DataCorruption(String),

    #[error("Database backend error: {0}")]
    BackendError(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File upload failed: {0}")]
    UploadFailed(String),

    #[error("Cannot derive a blob key from URL '{0}'")]
    MalformedUrl(String),

    #[error("File not found with key: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    BackendError(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Invalid bearer token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("Failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Failures of the pin lifecycle operations.
#[derive(Error, Debug)]
pub enum PinError {
    #[error("Pin not found with ID: {0}")]
    NotFound(Uuid),
    #[error("Image '{0}' is not attached to this pin")]
    UnknownRetainedImage(String),
    #[error(transparent)]
    Repository(RepoError),
}

impl From<RepoError> for PinError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(id) => PinError::NotFound(id),
            other => PinError::Repository(other),
        }
    }
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    // Input validation / request parsing errors
    #[error("Missing form field: {0}")]
    MissingFormField(String),
    #[error("Unprocessable form field: {0}")]
    Unprocessable(String),
    #[error("Error processing multipart form data: {0}")]
    MultipartError(#[from] axum::extract::multipart::MultipartError),
    #[error("Rejected multipart request: {0}")]
    MultipartRejected(#[from] MultipartRejection),
    #[error("Rejected JSON body: {0}")]
    JsonRejected(#[from] JsonRejection),
    #[error("Invalid pin ID format: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(#[source] AuthError),

    // Domain/Service level errors
    #[error("Pin not found with ID: {0}")]
    PinNotFound(Uuid),
    #[error("Could not access pin data")]
    RepositoryError(#[source] RepoError),

    // Configuration / Startup errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Initialization error: {0}")]
    InitError(String),

    // Generic Internal Server Error
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

// --- Conversions from Domain Errors to AppError ---

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(id) => AppError::PinNotFound(id),
            e => AppError::RepositoryError(e),
        }
    }
}

impl From<PinError> for AppError {
    fn from(err: PinError) -> Self {
        match err {
            PinError::NotFound(id) => AppError::PinNotFound(id),
            e @ PinError::UnknownRetainedImage(_) => AppError::Unprocessable(e.to_string()),
            PinError::Repository(e) => e.into(),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            e @ AuthError::Signing(_) => AppError::InternalServerError(e.to_string()),
            e => AppError::Unauthorized(e),
        }
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InitError(err.to_string())
    }
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            // 4xx Client Errors
            AppError::MissingFormField(field) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Missing form field: {}", field),
            ),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::MultipartError(e) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid multipart form data: {}", e),
            ),
            AppError::MultipartRejected(e) => (e.status(), e.body_text()),
            AppError::JsonRejected(e) => (e.status(), e.body_text()),
            AppError::InvalidUuid(e) => (StatusCode::BAD_REQUEST, format!("Invalid ID format: {}", e)),
            AppError::Unauthorized(e) => {
                tracing::debug!(error.source = ?e, "Rejecting unauthenticated request");
                let message = match e {
                    AuthError::InvalidCredentials => "Invalid credentials",
                    _ => "Unauthorized",
                };
                (StatusCode::UNAUTHORIZED, message.to_string())
            }
            AppError::PinNotFound(id) => (StatusCode::NOT_FOUND, format!("Pin not found with ID: {}", id)),

            // 5xx Server Errors
            AppError::RepositoryError(e) => {
                tracing::error!(error.source = ?e, "Repository error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database operation failed".to_string())
            }
            AppError::ConfigError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server configuration error".to_string())
            }
            AppError::InitError(msg) => {
                tracing::error!("Initialization error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server initialization error".to_string())
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal server error occurred".to_string())
            }
        };

        if status.is_server_error() {
            tracing::error!(error.message = %error_message, error.detail = %self, "Responding with error");
        } else {
            tracing::debug!(error.message = %error_message, error.status = %status, "Responding with client error");
        }

        let body = Json(serde_json::json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_to_status_codes() {
        let id = Uuid::new_v4();
        let cases = [
            (AppError::from(PinError::NotFound(id)), StatusCode::NOT_FOUND),
            (
                AppError::from(PinError::UnknownRetainedImage("x".into())),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (AppError::from(AuthError::MissingToken), StatusCode::UNAUTHORIZED),
            (AppError::from(RepoError::NotFound(id)), StatusCode::NOT_FOUND),
            (
                AppError::from(RepoError::DataCorruption("bad json".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (AppError::MissingFormField("lat".into()), StatusCode::UNPROCESSABLE_ENTITY),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
