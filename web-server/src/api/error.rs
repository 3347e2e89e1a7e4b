// web-server/src/api/error.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use common::{FormError, SubmitError};
use serde_json::json;
use thiserror::Error;

use crate::page_registry::NotifyError;

pub const EXPIRED_MESSAGE: &str = "Your session has expired. Please try again.";

/// Errors returned by the page API. Display strings are shown to the user,
/// so they never carry store or codec detail.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Page not found")]
    UnknownPage,
    #[error("Platform context already reported")]
    AlreadyReported,
    #[error("Page is not accepting submissions")]
    NotReady,
    #[error("{}", EXPIRED_MESSAGE)]
    SessionExpired,
    #[error("Invalid address: {0}")]
    InvalidForm(FormError),
    #[error("Could not save your address. Please try again.")]
    StoreUnavailable,
}

impl From<NotifyError> for ApiError {
    fn from(e: NotifyError) -> Self {
        match e {
            NotifyError::UnknownPage => ApiError::UnknownPage,
            NotifyError::AlreadyReported => ApiError::AlreadyReported,
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::NotReady => ApiError::NotReady,
            SubmitError::SessionExpired => ApiError::SessionExpired,
            SubmitError::Form(e) => ApiError::InvalidForm(e),
            SubmitError::Remote(e) => {
                tracing::error!("Address store rejected submission: {}", e);
                ApiError::StoreUnavailable
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::UnknownPage => StatusCode::NOT_FOUND,
            ApiError::AlreadyReported | ApiError::NotReady => StatusCode::CONFLICT,
            ApiError::SessionExpired => StatusCode::GONE,
            ApiError::InvalidForm(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::StoreUnavailable => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.to_string()
        }))
    }
}
