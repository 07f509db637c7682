// Application state for HTTP handlers
use crate::application::view_session::ViewSession;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<ViewSession>,
}
