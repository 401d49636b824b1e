//! Input extraction for the insight and question routes.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::errors::AppError;

pub const TEXT_FIELD: &str = "text";
pub const QUESTION_FIELD: &str = "question";

/// Body of `POST /api/send-text`.
#[derive(Debug, Default, Deserialize)]
pub struct SendTextRequest {
    #[serde(default)]
    pub text: Option<String>,
}

/// Body of `POST /ask-question`, also the query of `GET /ask-question`.
#[derive(Debug, Default, Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub question: Option<String>,
}

/// Returns the value untouched, or `MissingInput` if it is absent or blank.
pub fn extract_input(field: &'static str, value: Option<String>) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::MissingInput(field)),
    }
}

/// Maps a JSON body rejection. Oversized bodies keep their 413; anything else
/// (bad JSON, wrong content type, wrong field type) means the field is unusable.
pub fn reject_body(field: &'static str, rejection: JsonRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        tracing::debug!("Rejected {field} body: {rejection}");
        AppError::MissingInput(field)
    }
}

/// Any query string that does not deserialize (e.g. a repeated field) leaves
/// the field unusable.
pub fn reject_query(field: &'static str, rejection: QueryRejection) -> AppError {
    tracing::debug!("Rejected {field} query: {rejection}");
    AppError::MissingInput(field)
}
