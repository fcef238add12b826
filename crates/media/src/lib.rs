//! Audio plumbing around synthesized segments
//!
//! Normalizing storage references into fetchable URLs, measuring audio
//! duration, and fetching segment bytes for the delivery proxy.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod error;
mod fetch;
mod normalize;
mod probe;

pub use error::{MediaError, Result};
pub use fetch::{AudioFetcher, FetchedAudio};
pub use normalize::normalize_reference;
pub use probe::{DurationProbe, FfprobeProbe, RemoteProbe, build_probe, validate_duration};
