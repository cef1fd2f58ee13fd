//! Durable single-key storage for the page.
//!
//! The browser original kept the uploaded asset's URL in `localStorage` under
//! one fixed key. Here the same contract is a small JSON file: one optional
//! `uploadedImage` field, written atomically (temp file + rename) so a crash
//! mid-write never leaves a torn value behind.

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

const STATE_FILE: &str = "state.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("state file is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Serialize, Deserialize, Default)]
struct StateFile {
    #[serde(rename = "uploadedImage", skip_serializing_if = "Option::is_none")]
    uploaded_image: Option<String>,
}

/// File-backed store holding the last-uploaded asset URL.
#[derive(Clone, Debug)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store rooted at `dir`; the file itself is `dir/state.json`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(STATE_FILE),
        }
    }

    /// Read the stored URL, if any. A missing file is simply "nothing stored".
    pub async fn load(&self) -> StoreResult<Option<String>> {
        match fs::read(&self.path).await {
            Ok(bytes) => {
                let state: StateFile = serde_json::from_slice(&bytes)?;
                Ok(state.uploaded_image)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Persist `url`, replacing any previous value.
    pub async fn save(&self, url: &str) -> StoreResult<()> {
        let state = StateFile {
            uploaded_image: Some(url.to_string()),
        };
        let bytes = serde_json::to_vec_pretty(&state)?;

        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(ErrorKind::Other, "state path missing parent directory")
        })?;
        fs::create_dir_all(parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        if let Err(err) = fs::write(&tmp_path, &bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        if let Err(err) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        Ok(())
    }

    /// Remove the stored value. Clearing an empty store is a no-op.
    pub async fn clear(&self) -> StoreResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_reads_as_nothing_stored() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_load_clear_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());

        store.save("https://host/img/abc123.jpg").await.unwrap();
        assert_eq!(
            store.load().await.unwrap(),
            Some("https://host/img/abc123.jpg".to_string())
        );

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_overwrites_the_previous_value() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());

        store.save("https://host/img/first.jpg").await.unwrap();
        store.save("https://host/img/second.jpg").await.unwrap();
        assert_eq!(
            store.load().await.unwrap(),
            Some("https://host/img/second.jpg".to_string())
        );
    }

    #[tokio::test]
    async fn clearing_an_empty_store_is_fine() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_state_files_are_reported() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("state.json"), b"not json")
            .await
            .unwrap();
        let store = SessionStore::new(dir.path());
        assert!(matches!(
            store.load().await.unwrap_err(),
            StoreError::Corrupt(_)
        ));
    }
}
