use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;

pub const QUOTA_EXCEEDED_MESSAGE: &str =
    "You exceeded your current quota, please check your plan and billing details.";
pub const PARSE_FAILURE_MESSAGE: &str = "Failed to decode JSON response";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// The named input field was absent or blank.
    #[error("Invalid {0}")]
    MissingInput(&'static str),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("OpenAI API key is not configured")]
    MissingCredential,

    #[error("Upstream quota exceeded: {0}")]
    UpstreamQuotaExceeded(String),

    #[error("Failed to decode model response: {0}")]
    ResponseParseFailure(String),

    #[error("{0}")]
    Upstream(String),
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::QuotaExceeded(msg) => AppError::UpstreamQuotaExceeded(msg),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingInput(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UpstreamQuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::MissingCredential
            | AppError::ResponseParseFailure(_)
            | AppError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::MissingInput(_) | AppError::PayloadTooLarge => self.to_string(),
            AppError::MissingCredential => {
                tracing::error!("Rejecting request: OPENAI_API_KEY is not set");
                self.to_string()
            }
            AppError::UpstreamQuotaExceeded(msg) => {
                tracing::warn!("OpenAI quota exceeded: {msg}");
                QUOTA_EXCEEDED_MESSAGE.to_string()
            }
            AppError::ResponseParseFailure(msg) => {
                tracing::warn!("Model response was not valid JSON: {msg}");
                PARSE_FAILURE_MESSAGE.to_string()
            }
            // Upstream text is passed through verbatim.
            AppError::Upstream(msg) => {
                tracing::error!("LLM error: {msg}");
                msg.clone()
            }
        };

        (self.status(), Json(json!({ "message": message }))).into_response()
    }
}
