use std::sync::Arc;

use crate::returns::pipeline::ReturnsPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Built once at startup; owns the `TextGenerator` and the fixed policy.
    pub pipeline: Arc<ReturnsPipeline>,
}
