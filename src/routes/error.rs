//! Error responses for the HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::any::Any;

use crate::Error;

/// Errors surfaced to HTTP clients
#[derive(Debug)]
pub enum ApiError {
    /// `html` missing, null or empty
    MissingHtml,
    /// Body could not be parsed as JSON or as a urlencoded form
    InvalidBody(String),
    /// Body larger than the configured ceiling
    PayloadTooLarge(String),
    /// Any failure inside the render lifecycle
    Render(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidInput(_) => ApiError::MissingHtml,
            other => ApiError::Render(other),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
            details: None,
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingHtml | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            ApiError::MissingHtml => ErrorResponse::new(
                "No HTML content provided",
                "Please send HTML content in the request body",
            ),
            ApiError::InvalidBody(msg) => ErrorResponse::new("Invalid request body", msg.clone()),
            ApiError::PayloadTooLarge(msg) => ErrorResponse::new("Request body too large", msg.clone()),
            ApiError::Render(e) => ErrorResponse {
                details: Some("Please check that your HTML is valid and try again".to_string()),
                ..ErrorResponse::new("Failed to generate PDF", e.to_string())
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Render(e) = &self {
            tracing::error!("Error generating PDF: {}", e);
        }
        (self.status(), Json(self.body())).into_response()
    }
}

/// Last-resort handler for panics escaping a request handler
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };
    tracing::error!("Unhandled error: {}", message);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("Internal server error", message)),
    )
        .into_response()
}
