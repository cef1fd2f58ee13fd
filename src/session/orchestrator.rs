//! The orchestrator: what the page's component logic became.
//!
//! Owns the durable store and the derivation inputs, keeps the current
//! [`ViewState`], and reaches the deletion endpoint through the [`Remover`]
//! seam so every flow is testable without a running server.

use crate::models::asset::{ParseIdError, PublicId};
use crate::models::transformation::{TransformationChain, delivery_url};
use crate::session::state::{FallbackPolicy, ViewEvent, ViewState, transition};
use crate::session::store::{SessionStore, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum RemoveError {
    #[error("deletion endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("deletion endpoint reported failure: {0}")]
    Rejected(String),
}

/// Seam to the deletion endpoint.
#[async_trait]
pub trait Remover {
    async fn remove(&self, id: &PublicId) -> Result<(), RemoveError>;
}

/// Production remover: posts `{ "publicId": … }` to our own deletion route.
#[derive(Clone)]
pub struct DeleteEndpointClient {
    http: reqwest::Client,
    base_url: String,
}

impl DeleteEndpointClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Remover for DeleteEndpointClient {
    async fn remove(&self, id: &PublicId) -> Result<(), RemoveError> {
        let url = format!("{}/api/delete-image", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "publicId": id.as_str() }))
            .send()
            .await?;

        let payload: Value = response.json().await?;
        if payload
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            Ok(())
        } else {
            let message = payload
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unspecified error")
                .to_string();
            Err(RemoveError::Rejected(message))
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Parse(#[from] ParseIdError),
    #[error("no uploaded asset to remove")]
    NoAsset,
    #[error("no enhanced image available to download")]
    NoEnhancedImage,
    #[error("could not fetch the enhanced image: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not write the downloaded image: {0}")]
    Io(#[from] std::io::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Drives the view-state machine against the store and the endpoints.
///
/// One orchestrator per page/session; it is the single writer of the durable
/// store. The enhanced URL is never persisted; it is recomputed from the
/// stored original on every [`restore`](Self::restore).
pub struct Orchestrator<R> {
    store: SessionStore,
    remover: R,
    http: reqwest::Client,
    delivery_base: String,
    cloud_name: String,
    chain: TransformationChain,
    policy: FallbackPolicy,
    state: ViewState,
}

impl<R: Remover> Orchestrator<R> {
    pub fn new(
        store: SessionStore,
        remover: R,
        delivery_base: impl Into<String>,
        cloud_name: impl Into<String>,
        chain: TransformationChain,
        policy: FallbackPolicy,
    ) -> Self {
        Self {
            store,
            remover,
            http: reqwest::Client::new(),
            delivery_base: delivery_base.into(),
            cloud_name: cloud_name.into(),
            chain,
            policy,
            state: ViewState::Empty,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    fn apply(&mut self, event: ViewEvent) {
        let prior = std::mem::take(&mut self.state);
        self.state = transition(prior, event, self.policy);
    }

    /// Build the enhanced URL for `original`, or `None` when the ID cannot
    /// be derived. Failures are logged and degrade the view, never abort.
    fn derive(&self, original: &str) -> Option<String> {
        match PublicId::from_asset_url(original) {
            Ok(id) => Some(delivery_url(
                &self.delivery_base,
                &self.cloud_name,
                &self.chain,
                &id,
            )),
            Err(err) => {
                error!(error = %err, "failed to derive the enhanced URL");
                None
            }
        }
    }

    fn finish_derivation(&mut self) {
        if let ViewState::Deriving { original } = &self.state {
            let derived = self.derive(original);
            self.apply(ViewEvent::DerivationFinished(derived));
        }
    }

    /// Upload callback: persist the original, then derive the enhanced URL.
    pub async fn upload_succeeded(&mut self, secure_url: String) -> SessionResult<()> {
        self.store.save(&secure_url).await?;
        self.apply(ViewEvent::UploadSucceeded(secure_url));
        self.finish_derivation();
        Ok(())
    }

    /// Page-load rehydration: read the store and re-derive.
    ///
    /// Idempotent: the same stored value always yields the same view.
    pub async fn restore(&mut self) -> SessionResult<()> {
        let stored = self.store.load().await?;
        self.apply(ViewEvent::Rehydrated(stored));
        self.finish_derivation();
        Ok(())
    }

    /// Remove the current asset via the deletion endpoint.
    ///
    /// On success the store and view are cleared. On endpoint failure the
    /// error is logged and everything stays as it was; the page surfaces
    /// nothing beyond the log line.
    pub async fn remove(&mut self) -> SessionResult<()> {
        let original = match &self.state {
            ViewState::Ready { original, .. } | ViewState::Deriving { original } => {
                original.clone()
            }
            ViewState::Empty => return Err(SessionError::NoAsset),
        };
        let id = PublicId::from_asset_url(&original)?;

        match self.remover.remove(&id).await {
            Ok(()) => {
                self.store.clear().await?;
                self.apply(ViewEvent::RemovalConfirmed);
                info!(%id, "asset removed");
            }
            Err(err) => {
                error!(error = %err, "failed to remove asset");
                self.apply(ViewEvent::RemovalFailed);
            }
        }
        Ok(())
    }

    /// Fetch the enhanced image and write its bytes to `path`.
    pub async fn download(&self, path: &Path) -> SessionResult<()> {
        let ViewState::Ready {
            enhanced: Some(url),
            ..
        } = &self.state
        else {
            return Err(SessionError::NoEnhancedImage);
        };

        let response = self.http.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        tokio::fs::write(path, &bytes).await?;
        Ok(())
    }
}
