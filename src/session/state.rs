//! View-state machine for the upload/compare page.
//!
//! The page's observable lifecycle is three states: nothing uploaded, an
//! original stored with its enhanced URL pending, and both endpoints of the
//! pipeline known. Transitions are a pure function of (state, event) so the
//! whole lifecycle is testable without storage, network, or any UI layer.

use std::str::FromStr;
use thiserror::Error;

/// Where the comparison view currently is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ViewState {
    /// Nothing uploaded; the upload control is showing.
    #[default]
    Empty,
    /// An original is stored but the enhanced URL has not been derived yet.
    Deriving { original: String },
    /// Both pipeline endpoints are known; the slider can render.
    ///
    /// `enhanced` is absent when derivation failed and the fallback policy
    /// chose to show nothing.
    Ready {
        original: String,
        enhanced: Option<String>,
    },
}

/// Something that happened to the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewEvent {
    /// The upload widget reported success with the asset's secure URL.
    UploadSucceeded(String),
    /// URL derivation finished; `None` means it failed.
    DerivationFinished(Option<String>),
    /// The deletion endpoint confirmed removal.
    RemovalConfirmed,
    /// The deletion endpoint failed; the page keeps what it has.
    RemovalFailed,
    /// Page load read durable storage and found this value (or nothing).
    Rehydrated(Option<String>),
}

/// How to fill the "after" pane when derivation fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Leave the pane absent.
    #[default]
    ShowNothing,
    /// Fall back to displaying the original.
    ShowOriginal,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown fallback policy `{0}`, expected `none` or `original`")]
pub struct UnknownPolicy(String);

impl FromStr for FallbackPolicy {
    type Err = UnknownPolicy;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "none" | "nothing" => Ok(FallbackPolicy::ShowNothing),
            "original" => Ok(FallbackPolicy::ShowOriginal),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

/// Advance the view state by one event.
///
/// Events that do not apply to the current state leave it unchanged, so the
/// page can never be driven into an inconsistent shape by a stray callback.
pub fn transition(state: ViewState, event: ViewEvent, policy: FallbackPolicy) -> ViewState {
    match (state, event) {
        // A fresh upload always restarts the pipeline, even over an existing one.
        (_, ViewEvent::UploadSucceeded(original)) => ViewState::Deriving { original },
        (_, ViewEvent::Rehydrated(Some(original))) => ViewState::Deriving { original },
        (_, ViewEvent::Rehydrated(None)) => ViewState::Empty,
        (ViewState::Deriving { original }, ViewEvent::DerivationFinished(enhanced)) => {
            let enhanced = match (enhanced, policy) {
                (Some(url), _) => Some(url),
                (None, FallbackPolicy::ShowOriginal) => Some(original.clone()),
                (None, FallbackPolicy::ShowNothing) => None,
            };
            ViewState::Ready { original, enhanced }
        }
        (ViewState::Ready { .. } | ViewState::Deriving { .. }, ViewEvent::RemovalConfirmed) => {
            ViewState::Empty
        }
        (state, ViewEvent::RemovalFailed) => state,
        (state, _) => state,
    }
}
