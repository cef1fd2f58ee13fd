//! Shared state handed to every request handler.

use crate::services::media_service::MediaService;
use std::path::PathBuf;

#[derive(Clone)]
pub struct AppState {
    /// Client for the external media host (signing + destroy).
    pub media: MediaService,
    /// Directory holding the durable page state; probed by readiness checks.
    pub state_dir: PathBuf,
}
