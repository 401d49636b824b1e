use std::sync::Arc;

use crate::config::Config;
use crate::errors::AppError;
use crate::llm_client::ChatModel;

/// Shared application state injected into all route handlers via Axum extractors.
/// Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// `None` when no credential was configured.
    pub llm: Option<Arc<dyn ChatModel>>,
}

impl AppState {
    /// The configured model, or `MissingCredential` when none could be built.
    pub fn model(&self) -> Result<&dyn ChatModel, AppError> {
        self.llm.as_deref().ok_or(AppError::MissingCredential)
    }
}
