//! Axum route handlers for the insight and question endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::errors::AppError;
use crate::insights::input::{
    extract_input, reject_body, reject_query, QuestionRequest, SendTextRequest, QUESTION_FIELD,
    TEXT_FIELD,
};
use crate::insights::prompts::PromptTemplate;
use crate::insights::transform::{
    transform_insights, InsightOutcome, LabeledInsight, NO_INSIGHT_MESSAGE,
};
use crate::state::AppState;

pub const QUESTION_ANSWERED_MESSAGE: &str = "Question answered successfully";

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

/// Success payloads of `POST /api/send-text`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SendTextResponse {
    /// Sorted insight list, serialized as a bare JSON array.
    Insights(Vec<LabeledInsight>),
    /// Valid JSON under `Insights` that is not label → insight shaped.
    Unstructured(Value),
    /// Fixed message, e.g. the no-insight sentinel.
    Message { message: String },
    /// Raw model output alongside the caller's text.
    Raw {
        message: String,
        received_text: String,
    },
}

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub question: String,
    pub response: String,
    pub message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Credential check → prompt composition → one model call.
/// Input must already be validated; nothing here is retried.
async fn invoke_model(
    state: &AppState,
    template: PromptTemplate,
    input: &str,
) -> Result<String, AppError> {
    let model = state.model()?;
    let prompt = template.compose(input);

    info!(
        "Calling {} with {:?} template ({} input bytes)",
        state.config.openai_model,
        template,
        input.len()
    );

    Ok(model.complete(&prompt, template.system()).await?)
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/send-text
///
/// Structured template: returns the insight list ordered by label index, or
/// the no-insight sentinel. Free-form template: echoes the model text.
pub async fn handle_send_text(
    State(state): State<AppState>,
    payload: Result<Json<SendTextRequest>, JsonRejection>,
) -> Result<Json<SendTextResponse>, AppError> {
    let Json(request) = payload.map_err(|e| reject_body(TEXT_FIELD, e))?;
    let text = extract_input(TEXT_FIELD, request.text)?;

    let template = state.config.send_text_template;
    let raw = invoke_model(&state, template, &text).await?;

    if !template.is_structured() {
        return Ok(Json(SendTextResponse::Raw {
            message: raw,
            received_text: text,
        }));
    }

    match transform_insights(&raw)? {
        InsightOutcome::Found(insights) => {
            info!("Returning {} insights", insights.len());
            Ok(Json(SendTextResponse::Insights(insights)))
        }
        InsightOutcome::Empty => Ok(Json(SendTextResponse::Message {
            message: NO_INSIGHT_MESSAGE.to_string(),
        })),
        InsightOutcome::Unstructured(value) => Ok(Json(SendTextResponse::Unstructured(value))),
    }
}

/// POST /ask-question
pub async fn handle_ask_question(
    State(state): State<AppState>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<QuestionResponse>, AppError> {
    let Json(request) = payload.map_err(|e| reject_body(QUESTION_FIELD, e))?;
    answer_question(&state, request).await
}

/// GET /ask-question?question=...
pub async fn handle_ask_question_query(
    State(state): State<AppState>,
    query: Result<Query<QuestionRequest>, QueryRejection>,
) -> Result<Json<QuestionResponse>, AppError> {
    let Query(request) = query.map_err(|e| reject_query(QUESTION_FIELD, e))?;
    answer_question(&state, request).await
}

async fn answer_question(
    state: &AppState,
    request: QuestionRequest,
) -> Result<Json<QuestionResponse>, AppError> {
    let question = extract_input(QUESTION_FIELD, request.question)?;
    let response = invoke_model(state, PromptTemplate::Question, &question).await?;

    Ok(Json(QuestionResponse {
        question,
        response,
        message: QUESTION_ANSWERED_MESSAGE.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::llm_client::{ChatModel, LlmError};
    use crate::routes::build_router;
    use crate::state::AppState;

    enum Reply {
        Text(&'static str),
        Quota,
        Api,
    }

    /// Deterministic model that records how often it was called.
    struct StubModel {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl StubModel {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatModel for StubModel {
        async fn complete(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Quota => Err(LlmError::QuotaExceeded(
                    "You exceeded your current quota".to_string(),
                )),
                Reply::Api => Err(LlmError::Api {
                    status: 503,
                    message: "The engine is currently overloaded".to_string(),
                }),
            }
        }
    }

    fn state_with(model: &Arc<StubModel>) -> AppState {
        AppState {
            config: Config::for_tests(Some("sk-test")),
            llm: Some(model.clone() as Arc<dyn ChatModel>),
        }
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = build_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn as_json(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    const TWO_INSIGHTS: &str = r#"{"Insights": [
        {"Insight 2": {"summary": "Colour", "description": "The sky is described as blue."}},
        {"Insight 1": {"summary": "Subject", "description": "The text is about the sky."}}
    ]}"#;

    #[tokio::test]
    async fn test_send_text_orders_insights_by_index() {
        let model = StubModel::new(Reply::Text(TWO_INSIGHTS));
        let (status, body) = send(
            state_with(&model),
            post_json("/api/send-text", json!({"text": "The sky is blue."})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let body = as_json(&body);
        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["Insight 1"]["summary"], "Subject");
        assert_eq!(list[1]["Insight 2"]["summary"], "Colour");
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_send_text_empty_text_is_400_without_model_call() {
        let model = StubModel::new(Reply::Text(TWO_INSIGHTS));
        let (status, body) = send(
            state_with(&model),
            post_json("/api/send-text", json!({"text": ""})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(as_json(&body), json!({"message": "Invalid text"}));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_send_text_missing_field_or_bad_json_is_400() {
        let model = StubModel::new(Reply::Text(TWO_INSIGHTS));
        let (status, _) = send(state_with(&model), post_json("/api/send-text", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/send-text")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(state_with(&model), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(as_json(&body), json!({"message": "Invalid text"}));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_credential_is_500_without_model_call() {
        let model = StubModel::new(Reply::Text(TWO_INSIGHTS));
        let state = AppState {
            config: Config::for_tests(None),
            llm: None,
        };
        let (status, body) = send(
            state,
            post_json("/api/send-text", json!({"text": "The sky is blue."})),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            as_json(&body),
            json!({"message": "OpenAI API key is not configured"})
        );
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_insights_returns_sentinel_with_200() {
        let model = StubModel::new(Reply::Text(r#"{"Insights": []}"#));
        let (status, body) = send(
            state_with(&model),
            post_json("/api/send-text", json!({"text": "asdf"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            as_json(&body),
            json!({"message": "There is no insight found. Please send a different text."})
        );
    }

    #[tokio::test]
    async fn test_malformed_model_reply_is_500_parse_failure() {
        let model = StubModel::new(Reply::Text("Sure! Here are some insights:"));
        let (status, body) = send(
            state_with(&model),
            post_json("/api/send-text", json!({"text": "The sky is blue."})),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            as_json(&body),
            json!({"message": "Failed to decode JSON response"})
        );
    }

    #[tokio::test]
    async fn test_quota_exceeded_is_429() {
        let model = StubModel::new(Reply::Quota);
        let (status, body) = send(
            state_with(&model),
            post_json("/api/send-text", json!({"text": "The sky is blue."})),
        )
        .await;

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(as_json(&body)["message"]
            .as_str()
            .unwrap()
            .contains("quota"));
    }

    #[tokio::test]
    async fn test_upstream_error_text_is_passed_through() {
        let model = StubModel::new(Reply::Api);
        let (status, body) = send(
            state_with(&model),
            post_json("/ask-question", json!({"question": "Why is the sky blue?"})),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(as_json(&body)["message"]
            .as_str()
            .unwrap()
            .contains("The engine is currently overloaded"));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_identical_requests_give_identical_bodies() {
        let model = StubModel::new(Reply::Text(TWO_INSIGHTS));
        let request = || post_json("/api/send-text", json!({"text": "The sky is blue."}));
        let (_, first) = send(state_with(&model), request()).await;
        let (_, second) = send(state_with(&model), request()).await;
        assert_eq!(first, second);
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_raw_mode_echoes_received_text() {
        let model = StubModel::new(Reply::Text("A short summary."));
        let mut state = state_with(&model);
        state.config.send_text_template = crate::insights::prompts::PromptTemplate::Summary;
        let (status, body) = send(
            state,
            post_json("/api/send-text", json!({"text": "The sky is blue."})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            as_json(&body),
            json!({"message": "A short summary.", "received_text": "The sky is blue."})
        );
    }

    #[tokio::test]
    async fn test_ask_question_post_and_get() {
        let model = StubModel::new(Reply::Text("Rayleigh scattering."));
        let expected = json!({
            "question": "Why is the sky blue?",
            "response": "Rayleigh scattering.",
            "message": "Question answered successfully"
        });

        let (status, body) = send(
            state_with(&model),
            post_json("/ask-question", json!({"question": "Why is the sky blue?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body), expected);

        let request = Request::builder()
            .uri("/ask-question?question=Why%20is%20the%20sky%20blue%3F")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(state_with(&model), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body), expected);
    }

    #[tokio::test]
    async fn test_ask_question_get_without_query_is_400() {
        let model = StubModel::new(Reply::Text("unused"));
        let request = Request::builder()
            .uri("/ask-question")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(state_with(&model), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(as_json(&body), json!({"message": "Invalid question"}));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_query_field_is_json_400() {
        let model = StubModel::new(Reply::Text("unused"));
        let request = Request::builder()
            .uri("/ask-question?question=a&question=b")
            .body(Body::empty())
            .unwrap();
        let response = build_router(state_with(&model)).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(as_json(&bytes), json!({"message": "Invalid question"}));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_string_insights_returns_sentinel() {
        let model = StubModel::new(Reply::Text(r#"{"Insights": ""}"#));
        let (status, body) = send(
            state_with(&model),
            post_json("/api/send-text", json!({"text": "asdf"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            as_json(&body),
            json!({"message": "There is no insight found. Please send a different text."})
        );
    }

    #[tokio::test]
    async fn test_unstructured_insights_are_returned_with_200() {
        let model = StubModel::new(Reply::Text(
            r#"{"Insights": [{"Insight 1": "plain text insight"}, "b"]}"#,
        ));
        let (status, body) = send(
            state_with(&model),
            post_json("/api/send-text", json!({"text": "The sky is blue."})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            as_json(&body),
            json!([{"Insight 1": "plain text insight"}, "b"])
        );
    }

    #[tokio::test]
    async fn test_oversized_body_is_413() {
        let model = StubModel::new(Reply::Text(TWO_INSIGHTS));
        let mut state = state_with(&model);
        state.config.max_body_bytes = 64;
        let big = "x".repeat(1024);
        let (status, _) = send(state, post_json("/api/send-text", json!({"text": big}))).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(model.calls(), 0);
    }
}
