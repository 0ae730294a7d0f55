use std::sync::Arc;

use crate::session::SessionController;

/// Shared application state for HTTP handlers
///
/// One controller per process: the service records a single session
/// at a time.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SessionController>,
}

impl AppState {
    pub fn new(controller: Arc<SessionController>) -> Self {
        Self { controller }
    }
}
