use crate::services::resolution::ResolutionService;
use std::sync::Arc;

/// Application state shared by the API handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolution service turning dialog turns into response bundles
    pub resolution_service: Arc<dyn ResolutionService>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("resolution_service", &"Arc<dyn ResolutionService>")
            .finish()
    }
}

impl AppState {
    /// Create new application state
    pub fn new(resolution_service: Arc<dyn ResolutionService>) -> Self {
        Self { resolution_service }
    }
}
