//! Shared types for the dubcast workspace
//!
//! Holds the pieces every feature crate agrees on: how domain errors map to
//! HTTP, the JSON error body, and the canonical video key.

mod error;
mod video_key;

pub use error::{ErrorBody, HttpError};
pub use video_key::{InvalidVideoKey, VideoKey};
