//! Shared application state.

use std::sync::Arc;

use evalrun_driver::SessionLauncher;

/// Shared application state.
///
/// Requests share nothing but the launcher; every request owns its own
/// session and logger.
pub struct AppState {
    /// Brings up one browser session per request.
    pub launcher: Arc<dyn SessionLauncher>,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(launcher: Arc<dyn SessionLauncher>) -> Arc<Self> {
        Arc::new(Self { launcher })
    }
}
