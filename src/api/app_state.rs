use crate::services::session::PreferenceEngine;

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    /// The single preference session served by this process
    pub engine: PreferenceEngine,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &"PreferenceEngine")
            .finish()
    }
}

impl AppState {
    /// Create new application state
    pub fn new(engine: PreferenceEngine) -> Self {
        Self { engine }
    }
}
