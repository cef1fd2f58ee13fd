//! src/services/media_service.rs
//!
//! MediaService — the server's view of the external media host. It covers
//! the two privileged operations the client cannot perform itself: signing
//! upload parameters with the API secret, and asking the host to destroy a
//! stored asset. Uploads and transformations never pass through here; the
//! client talks to the host directly with the signature we hand out.

use crate::models::asset::PublicId;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MediaError {
    /// The host looked for the asset and reported it does not exist.
    #[error("asset `{0}` not found on the media host")]
    AssetNotFound(String),
    /// The host answered but refused or failed the operation.
    #[error("media host rejected the request: {0}")]
    UpstreamRejected(String),
    /// The host could not be reached or sent an unreadable response.
    #[error("media host transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type MediaResult<T> = Result<T, MediaError>;

/// MediaService holds the host credentials and an HTTP client.
///
/// Cloning is cheap (the reqwest client is internally pooled), so the router
/// hands a clone to every request. The service keeps no per-request state.
#[derive(Clone)]
pub struct MediaService {
    http: reqwest::Client,
    api_base: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl MediaService {
    pub fn new(
        http: reqwest::Client,
        api_base: impl Into<String>,
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// True when every credential needed to talk to the host is present.
    pub fn is_configured(&self) -> bool {
        !self.cloud_name.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }

    /// Sign a parameter mapping with the server-held secret.
    ///
    /// Pure function of the input and the secret; safe to call from any
    /// number of requests concurrently.
    pub fn sign_params(&self, params: &BTreeMap<String, Value>) -> String {
        sign_request(params, &self.api_secret)
    }

    /// Ask the host to delete the asset behind `public_id`.
    ///
    /// Sends a signed `destroy` request and returns the host's raw payload
    /// when it reports `ok`. Not idempotent from the caller's perspective:
    /// destroying an already-deleted ID surfaces as `AssetNotFound`.
    pub async fn destroy(&self, public_id: &PublicId) -> MediaResult<Value> {
        let timestamp = Utc::now().timestamp().to_string();

        let mut to_sign = BTreeMap::new();
        to_sign.insert(
            "public_id".to_string(),
            Value::String(public_id.as_str().to_string()),
        );
        to_sign.insert("timestamp".to_string(), Value::String(timestamp.clone()));
        let signature = sign_request(&to_sign, &self.api_secret);

        let url = format!(
            "{}/v1_1/{}/image/destroy",
            self.api_base.trim_end_matches('/'),
            self.cloud_name
        );
        debug!(%public_id, "requesting asset destruction");

        let response = self
            .http
            .post(&url)
            .form(&[
                ("public_id", public_id.as_str()),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let payload: Value = response.json().await?;

        if !status.is_success() {
            let message = payload
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("unspecified error");
            return Err(MediaError::UpstreamRejected(format!(
                "{}: {}",
                status, message
            )));
        }

        match payload.get("result").and_then(Value::as_str) {
            Some("ok") => Ok(payload),
            Some("not found") => Err(MediaError::AssetNotFound(public_id.to_string())),
            Some(other) => Err(MediaError::UpstreamRejected(other.to_string())),
            None => Err(MediaError::UpstreamRejected(
                "response carried no result field".to_string(),
            )),
        }
    }
}

/// The host's request-signing algorithm.
///
/// Empty-valued parameters are dropped, the rest are serialized as `k=v`
/// pairs in key order joined by `&` (array values joined by `,`), the secret
/// is appended, and the whole string is SHA-256 hashed and hex-encoded.
pub fn sign_request(params: &BTreeMap<String, Value>, secret: &str) -> String {
    use sha2::{Digest, Sha256};

    let serialized = params
        .iter()
        .filter_map(|(key, value)| scalar(value).map(|v| format!("{}={}", key, v)))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Flatten a JSON value into the host's signable form.
///
/// Null, empty strings, and nested objects contribute nothing; arrays join
/// their scalar items with commas.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(scalar)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(entries: &[(&str, Value)]) -> BTreeMap<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn signing_is_deterministic() {
        let p = params(&[
            ("timestamp", json!("1720000000")),
            ("upload_preset", json!("testImage")),
        ]);
        assert_eq!(sign_request(&p, "secret"), sign_request(&p, "secret"));
    }

    #[test]
    fn signature_changes_with_any_parameter() {
        let base = params(&[("timestamp", json!("1720000000"))]);
        let changed = params(&[("timestamp", json!("1720000001"))]);
        assert_ne!(sign_request(&base, "secret"), sign_request(&changed, "secret"));
    }

    #[test]
    fn signature_changes_with_the_secret() {
        let p = params(&[("timestamp", json!("1720000000"))]);
        assert_ne!(sign_request(&p, "secret"), sign_request(&p, "other"));
    }

    #[test]
    fn empty_values_do_not_affect_the_signature() {
        let with_empty = params(&[("folder", json!("")), ("timestamp", json!("1"))]);
        let without = params(&[("timestamp", json!("1"))]);
        assert_eq!(
            sign_request(&with_empty, "secret"),
            sign_request(&without, "secret")
        );
    }

    #[test]
    fn arrays_sign_like_comma_joined_strings() {
        let as_array = params(&[("tags", json!(["a", "b"])), ("timestamp", json!("1"))]);
        let as_string = params(&[("tags", json!("a,b")), ("timestamp", json!("1"))]);
        assert_eq!(
            sign_request(&as_array, "secret"),
            sign_request(&as_string, "secret")
        );
    }

    fn service(api_base: &str) -> MediaService {
        MediaService::new(reqwest::Client::new(), api_base, "demo", "key", "secret")
    }

    #[tokio::test]
    async fn destroy_succeeds_on_ok_result() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1_1/demo/image/destroy")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result":"ok"}"#)
            .create_async()
            .await;

        let id = PublicId::new("abc123").unwrap();
        let payload = service(&server.url()).destroy(&id).await.unwrap();
        assert_eq!(payload["result"], "ok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn destroy_maps_not_found_to_its_own_kind() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1_1/demo/image/destroy")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result":"not found"}"#)
            .create_async()
            .await;

        let id = PublicId::new("gone").unwrap();
        let err = service(&server.url()).destroy(&id).await.unwrap_err();
        assert!(matches!(err, MediaError::AssetNotFound(_)));
    }

    #[tokio::test]
    async fn destroy_surfaces_host_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1_1/demo/image/destroy")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":{"message":"Invalid Signature"}}"#)
            .create_async()
            .await;

        let id = PublicId::new("abc123").unwrap();
        let err = service(&server.url()).destroy(&id).await.unwrap_err();
        match err {
            MediaError::UpstreamRejected(message) => {
                assert!(message.contains("Invalid Signature"));
            }
            other => panic!("expected UpstreamRejected, got {:?}", other),
        }
    }
}
