use std::sync::Arc;

use crate::config::Config;
use crate::screening::Screener;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Screening pipeline. Holds the process-wide encoder, shared read-only.
    pub screener: Arc<Screener>,
}
