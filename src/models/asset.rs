//! Asset identity on the external media host.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseIdError {
    #[error("asset reference is empty")]
    Empty,
    #[error("cannot derive a public ID from `{0}`")]
    Underivable(String),
}

/// The host's unique key for a stored asset.
///
/// Every transformation and deletion call addresses the asset through this
/// ID. It is derived from a delivery URL in exactly one place
/// ([`PublicId::from_asset_url`]) so the parsing rule cannot drift between
/// call sites.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PublicId(String);

impl PublicId {
    /// Wrap an ID that arrives already parsed (e.g. from a request body).
    ///
    /// Rejects empty or whitespace-only input.
    pub fn new(id: impl Into<String>) -> Result<Self, ParseIdError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ParseIdError::Empty);
        }
        Ok(Self(id))
    }

    /// Derive the public ID from an asset URL.
    ///
    /// Takes the last path segment and strips everything from the first dot
    /// onward, so `https://host/img/abc123.jpg` yields `abc123`. Returns
    /// `Underivable` when the URL ends in a separator or the segment has no
    /// stem (`.hidden`, trailing `/`).
    pub fn from_asset_url(url: &str) -> Result<Self, ParseIdError> {
        if url.trim().is_empty() {
            return Err(ParseIdError::Empty);
        }
        let segment = url.rsplit('/').next().unwrap_or(url);
        let stem = segment.split('.').next().unwrap_or("");
        if stem.is_empty() {
            return Err(ParseIdError::Underivable(url.to_string()));
        }
        Ok(Self(stem.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_id_from_simple_url() {
        let id = PublicId::from_asset_url("https://host/img/abc123.jpg").unwrap();
        assert_eq!(id.as_str(), "abc123");
    }

    #[test]
    fn derives_id_from_versioned_delivery_url() {
        let id =
            PublicId::from_asset_url("https://res.cloudinary.com/demo/image/upload/v17/xyz.png")
                .unwrap();
        assert_eq!(id.as_str(), "xyz");
    }

    #[test]
    fn keeps_only_the_stem_before_the_first_dot() {
        let id = PublicId::from_asset_url("https://host/img/photo.backup.jpg").unwrap();
        assert_eq!(id.as_str(), "photo");
    }

    #[test]
    fn accepts_extensionless_segments() {
        let id = PublicId::from_asset_url("https://host/img/abc").unwrap();
        assert_eq!(id.as_str(), "abc");
    }

    #[test]
    fn rejects_trailing_separator() {
        let err = PublicId::from_asset_url("https://host/img/").unwrap_err();
        assert!(matches!(err, ParseIdError::Underivable(_)));
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(PublicId::from_asset_url("  "), Err(ParseIdError::Empty));
        assert_eq!(PublicId::new(""), Err(ParseIdError::Empty));
    }
}
