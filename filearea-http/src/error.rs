use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use filearea_core::FileAreaError;
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    error: String,
}

/// Core errors rendered as HTTP responses.
#[derive(Debug)]
pub struct HttpError(pub FileAreaError);

impl From<FileAreaError> for HttpError {
    fn from(e: FileAreaError) -> Self {
        HttpError(e)
    }
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            FileAreaError::NotFound(_) => StatusCode::NOT_FOUND,
            FileAreaError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            FileAreaError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = ErrorBody {
            status: status.canonical_reason().unwrap_or("error"),
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
