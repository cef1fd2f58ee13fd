//! HTTP handlers for the media API: upload-request signing and asset
//! deletion. Both are thin; the host work lives in `MediaService`.

use crate::{errors::AppError, models::asset::PublicId, state::AppState};
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Request body for `POST /api/sign-image`.
///
/// A `BTreeMap` keeps the parameters stably ordered, which the signing
/// algorithm requires.
#[derive(Debug, Deserialize)]
pub struct SignImageReq {
    #[serde(rename = "paramsToSign")]
    pub params_to_sign: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct SignImageResp {
    pub signature: String,
}

/// `POST /api/sign-image` — sign upload parameters with the server-held
/// secret so the client can upload directly to the host without seeing it.
pub async fn sign_image(
    State(state): State<AppState>,
    Json(req): Json<SignImageReq>,
) -> Json<SignImageResp> {
    Json(SignImageResp {
        signature: state.media.sign_params(&req.params_to_sign),
    })
}

/// Request body for `POST /api/delete-image`.
#[derive(Debug, Deserialize)]
pub struct DeleteImageReq {
    #[serde(rename = "publicId")]
    pub public_id: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteImageResp {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// `POST /api/delete-image` — ask the media host to delete the asset.
///
/// Success returns `{ success: true, result }` with the host's raw payload.
/// Every host-side failure (including "not found") becomes the 500 failure
/// envelope via `AppError`; only a missing/empty ID is the caller's fault.
pub async fn delete_image(
    State(state): State<AppState>,
    Json(req): Json<DeleteImageReq>,
) -> Result<Json<DeleteImageResp>, AppError> {
    let id = PublicId::new(req.public_id).map_err(|err| AppError::bad_request(err.to_string()))?;
    let payload = state.media.destroy(&id).await?;

    Ok(Json(DeleteImageResp {
        success: true,
        result: Some(payload),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::media_service::{MediaService, sign_request};
    use axum::http::StatusCode;
    use serde_json::json;

    fn state(api_base: &str) -> AppState {
        AppState {
            media: MediaService::new(reqwest::Client::new(), api_base, "demo", "key", "secret"),
            state_dir: std::env::temp_dir(),
        }
    }

    #[tokio::test]
    async fn sign_image_matches_the_service_signature() {
        let req = SignImageReq {
            params_to_sign: [
                ("timestamp".to_string(), json!("1720000000")),
                ("upload_preset".to_string(), json!("testImage")),
            ]
            .into_iter()
            .collect(),
        };
        let expected = sign_request(&req.params_to_sign, "secret");

        let Json(resp) = sign_image(State(state("http://unused")), Json(req)).await;
        assert_eq!(resp.signature, expected);
    }

    #[tokio::test]
    async fn delete_image_reports_success_with_the_host_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1_1/demo/image/destroy")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result":"ok"}"#)
            .create_async()
            .await;

        let req = DeleteImageReq {
            public_id: "abc123".to_string(),
        };
        let Json(resp) = delete_image(State(state(&server.url())), Json(req))
            .await
            .unwrap();

        assert!(resp.success);
        assert_eq!(resp.result.unwrap()["result"], "ok");
    }

    #[tokio::test]
    async fn deleting_a_missing_asset_maps_to_500() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1_1/demo/image/destroy")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result":"not found"}"#)
            .create_async()
            .await;

        let req = DeleteImageReq {
            public_id: "abc123".to_string(),
        };
        let err = delete_image(State(state(&server.url())), Json(req))
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message.contains("not found"));
    }

    #[tokio::test]
    async fn an_empty_id_is_the_callers_fault() {
        let req = DeleteImageReq {
            public_id: "  ".to_string(),
        };
        let err = delete_image(State(state("http://unused")), Json(req))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
