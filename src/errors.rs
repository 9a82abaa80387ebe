use crate::resolver::Rejection;
use axum::Json;
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Caller-visible failures of the HTTP layer. Messages are fixed strings;
/// paths and raw input never reach the response body.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request")]
    BadRequest,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("file too large")]
    TooLarge,
    #[error("unsupported media type")]
    UnsupportedMediaType,
    #[error("resolution timed out")]
    Timeout,
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub code: &'a str,
    pub message: &'a str,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest => "BadRequest",
            AppError::Forbidden => "Forbidden",
            AppError::NotFound => "NotFound",
            AppError::TooLarge => "TooLarge",
            AppError::UnsupportedMediaType => "UnsupportedMediaType",
            AppError::Timeout => "Timeout",
            AppError::Internal(_) => "Internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text sent to the requester. `Internal` details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::BadRequest => "invalid image filename",
            AppError::Forbidden => "access denied",
            AppError::NotFound => "image not found",
            AppError::TooLarge => "image too large",
            AppError::UnsupportedMediaType => "unsupported image type",
            AppError::Timeout => "try again later",
            AppError::Internal(_) => "error loading image",
        }
    }
}

impl From<Rejection> for AppError {
    fn from(r: Rejection) -> Self {
        match r {
            Rejection::EmptyInput
            | Rejection::AbsolutePathRejected
            | Rejection::NullByteRejected
            | Rejection::InvalidEncoding => AppError::BadRequest,
            Rejection::TraversalRejected => AppError::Forbidden,
            Rejection::NotFound | Rejection::NotRegularFile => AppError::NotFound,
            Rejection::Unavailable(kind) => AppError::Internal(format!("filesystem: {kind}")),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

pub fn into_response(err: AppError) -> (StatusCode, Json<ErrorBody<'static>>) {
    (err.status(), Json(ErrorBody { code: err.code(), message: err.public_message() }))
}
