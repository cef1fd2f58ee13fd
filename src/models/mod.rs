//! Core data models for the image enhancement front-end.
//!
//! These entities cover the two references the page tracks: the uploaded
//! asset's identity and the transformation chain applied to it. Everything
//! here is pure string and type work; no I/O happens in this layer.

pub mod asset;
pub mod transformation;
