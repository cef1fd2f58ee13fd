//! Defines the HTTP routes of the orchestration server.
//!
//! ## Structure
//! - **API endpoints**
//!   - `POST /api/sign-image`   — sign upload parameters with the API secret
//!   - `POST /api/delete-image` — delete a hosted asset by public ID
//!
//! - **Probes**
//!   - `GET /healthz` — liveness
//!   - `GET /readyz`  — readiness (credentials + state-dir I/O)
//!
//! Uploads and transformations have no routes here: the client performs them
//! directly against the media host using the signature from `/api/sign-image`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        media_handlers::{delete_image, sign_image},
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for all endpoints.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // API endpoints
        .route("/api/sign-image", post(sign_image))
        .route("/api/delete-image", post(delete_image))
}
