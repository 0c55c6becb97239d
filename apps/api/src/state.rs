use std::sync::Arc;

use crate::llm_client::CompletionModel;
use crate::notify::Notifier;
use crate::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Report model. `LlmClient` in production; swapped for stubs in tests.
    pub model: Arc<dyn CompletionModel>,
    pub notifier: Notifier,
    pub sessions: SessionStore,
}
