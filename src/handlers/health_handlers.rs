//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks host credentials and disk I/O

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;
use tokio::fs;
use uuid::Uuid;

/// `GET /healthz`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that:
/// 1. Verifies the media-host credentials are configured.
/// 2. Performs a best-effort write/read/delete against the state directory.
///
/// Returns JSON describing each check. HTTP 200 when all checks pass,
/// HTTP 503 when any check fails.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    // 1) Credentials check
    let credentials_check = if state.media.is_configured() {
        (true, None::<String>)
    } else {
        (false, Some("media host credentials missing".to_string()))
    };

    // 2) Disk write/read/delete check (use a temp file under the state dir)
    let tmp_path = state.state_dir.join(format!(".readyz-{}", Uuid::new_v4()));
    let disk_check = match fs::write(&tmp_path, b"readyz").await {
        Ok(_) => match fs::read(&tmp_path).await {
            Ok(bytes) => {
                if bytes == b"readyz" {
                    // try to remove the temp file; report if that fails
                    match fs::remove_file(&tmp_path).await {
                        Ok(_) => (true, None::<String>),
                        Err(e) => (true, Some(format!("could not remove tmp file: {}", e))),
                    }
                } else {
                    let _ = fs::remove_file(&tmp_path).await; // best-effort cleanup
                    (false, Some("file content mismatch".to_string()))
                }
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp_path).await; // best-effort cleanup
                (false, Some(format!("could not read tmp file: {}", e)))
            }
        },
        Err(e) => (false, Some(format!("could not write tmp file: {}", e))),
    };

    let credentials_ok = credentials_check.0;
    let disk_ok = disk_check.0;
    let overall_ok = credentials_ok && disk_ok;

    let mut checks = HashMap::new();
    checks.insert(
        "credentials",
        CheckStatus {
            ok: credentials_ok,
            error: credentials_check.1,
        },
    );
    checks.insert(
        "disk",
        CheckStatus {
            ok: disk_ok,
            error: disk_check.1,
        },
    );

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
