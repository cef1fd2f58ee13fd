//! The enhancement chain applied to a delivery URL.
//!
//! The host executes transformations lazily: they are encoded as path
//! segments in the asset URL and run when the URL is first fetched. Building
//! the URL therefore never touches the network. The chain is an ordered list
//! of effect descriptors folded onto a bounding-box resize, so variants that
//! want a different subset or order configure the list instead of duplicating
//! the page logic.

use crate::models::asset::PublicId;
use std::str::FromStr;
use thiserror::Error;

/// Named enhancement effects understood by the media host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    Upscale,
    Enhance,
    GenerativeRestore,
}

impl Effect {
    /// URL token the host expects for this effect.
    pub fn token(self) -> &'static str {
        match self {
            Effect::Upscale => "e_upscale",
            Effect::Enhance => "e_enhance",
            Effect::GenerativeRestore => "e_gen_restore",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown effect name `{0}`")]
pub struct UnknownEffect(String);

impl FromStr for Effect {
    type Err = UnknownEffect;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "upscale" => Ok(Effect::Upscale),
            "enhance" => Ok(Effect::Enhance),
            "gen_restore" | "generative_restore" => Ok(Effect::GenerativeRestore),
            other => Err(UnknownEffect(other.to_string())),
        }
    }
}

/// Parse a comma-separated effect list such as `upscale,enhance,gen_restore`.
///
/// Blank entries are skipped, so a trailing comma is harmless.
pub fn parse_effect_list(spec: &str) -> Result<Vec<Effect>, UnknownEffect> {
    spec.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(Effect::from_str)
        .collect()
}

/// Bounding-box resize with fit-within semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FitResize {
    pub width: u32,
    pub height: u32,
}

/// The comparison view renders both panes into this box.
pub const PREVIEW_BOX: FitResize = FitResize {
    width: 320,
    height: 180,
};

impl FitResize {
    /// Serialize as the host's resize component, e.g. `c_fit,h_180,w_320`.
    fn component(self) -> String {
        format!("c_fit,h_{},w_{}", self.height, self.width)
    }
}

/// Ordered transformation chain: one resize followed by zero or more effects.
///
/// Invariant: the resize component always precedes every effect token in the
/// serialized URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransformationChain {
    resize: FitResize,
    effects: Vec<Effect>,
}

impl TransformationChain {
    pub fn new(resize: FitResize, effects: Vec<Effect>) -> Self {
        Self { resize, effects }
    }

    /// Fold the chain into the path component sequence of a delivery URL.
    pub fn to_path(&self) -> String {
        std::iter::once(self.resize.component())
            .chain(self.effects.iter().map(|e| e.token().to_string()))
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Build the delivery URL that applies `chain` to the asset behind `id`.
///
/// `base` is the host's delivery root (configurable so tests can point it at
/// a local server); `cloud_name` is the public account identifier.
pub fn delivery_url(
    base: &str,
    cloud_name: &str,
    chain: &TransformationChain,
    id: &PublicId,
) -> String {
    format!(
        "{}/{}/image/upload/{}/{}",
        base.trim_end_matches('/'),
        cloud_name,
        chain.to_path(),
        id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_chain() -> TransformationChain {
        TransformationChain::new(
            PREVIEW_BOX,
            vec![Effect::Upscale, Effect::Enhance, Effect::GenerativeRestore],
        )
    }

    #[test]
    fn chain_serializes_resize_before_effects() {
        assert_eq!(
            full_chain().to_path(),
            "c_fit,h_180,w_320/e_upscale/e_enhance/e_gen_restore"
        );
    }

    #[test]
    fn empty_chain_is_just_the_resize() {
        let chain = TransformationChain::new(PREVIEW_BOX, vec![]);
        assert_eq!(chain.to_path(), "c_fit,h_180,w_320");
    }

    #[test]
    fn delivery_url_embeds_the_id_exactly_once() {
        let id = PublicId::from_asset_url("https://host/img/abc123.jpg").unwrap();
        let url = delivery_url("https://res.cloudinary.com", "demo", &full_chain(), &id);
        assert_eq!(
            url,
            "https://res.cloudinary.com/demo/image/upload/c_fit,h_180,w_320/e_upscale/e_enhance/e_gen_restore/abc123"
        );
        assert_eq!(url.matches("abc123").count(), 1);
        let resize_at = url.find("c_fit,h_180,w_320").unwrap();
        let first_effect_at = url.find("e_").unwrap();
        assert!(resize_at < first_effect_at);
    }

    #[test]
    fn parses_the_default_effect_list() {
        assert_eq!(
            parse_effect_list("upscale,enhance,gen_restore").unwrap(),
            vec![Effect::Upscale, Effect::Enhance, Effect::GenerativeRestore]
        );
    }

    #[test]
    fn effect_list_order_is_preserved() {
        assert_eq!(
            parse_effect_list("enhance, upscale").unwrap(),
            vec![Effect::Enhance, Effect::Upscale]
        );
    }

    #[test]
    fn rejects_unknown_effect_names() {
        let err = parse_effect_list("upscale,sharpen").unwrap_err();
        assert_eq!(err, UnknownEffect("sharpen".to_string()));
    }
}
