//! HTTP error mapping. Every failure renders as `{"error": "<message>"}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hackhelper_core::{AiError, IngestError};
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    PayloadTooLarge(String),
    Ai(AiError),
    Ingest(IngestError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Ai(e) if e.is_parse_failure() => StatusCode::BAD_GATEWAY,
            Self::Ai(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Ingest(
                IngestError::UnsupportedFileType(_)
                | IngestError::InvalidUtf8(_)
                | IngestError::Pdf(_)
                | IngestError::Docx(_),
            ) => StatusCode::BAD_REQUEST,
            Self::Ingest(IngestError::InvalidGithubUrl) => StatusCode::BAD_REQUEST,
            Self::Ingest(IngestError::Github(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::BadRequest(msg) | Self::PayloadTooLarge(msg) => msg.clone(),
            Self::Unauthorized => "unauthorized".to_string(),
            Self::Ai(e) => e.to_string(),
            Self::Ingest(e) => e.to_string(),
        }
    }
}

impl From<AiError> for ApiError {
    fn from(e: AiError) -> Self {
        Self::Ai(e)
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        Self::Ingest(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            error!("Request failed ({}): {}", status, message);
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
