use std::sync::Arc;

use crate::config::Config;
use crate::service::CandidateService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CandidateService>,
    /// Read by the health check to report the active store backend.
    pub config: Config,
}
