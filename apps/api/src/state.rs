use std::sync::Arc;

use crate::analysis::Pipeline;
use crate::history::HistoryStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Read-only analysis pipeline; cheap to clone, shared across requests.
    pub pipeline: Pipeline,
    /// Pluggable history store. Default: bounded InMemoryHistory.
    pub history: Arc<dyn HistoryStore>,
}
