use std::sync::Arc;

use crate::engine::AtsEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AtsEngine>,
    /// Which index backs the store ("postgres" or "memory"); reported by /health.
    pub index_backend: &'static str,
}
