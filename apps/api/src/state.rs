use std::sync::Arc;

use crate::analysis::orchestrator::CvAnalyzer;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<CvAnalyzer>,
    pub config: Config,
}
