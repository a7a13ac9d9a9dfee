//! Error taxonomy shared across the crate.
//!
//! Validation failures surface to the user as inline messages and never
//! partially mutate the dictionary; fetch failures during playback degrade
//! to "no image" instead of interrupting speech.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WordbeamError {
    /// Rejected input: empty word, malformed or oversized image payload,
    /// malformed import document.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Delete of a word the dictionary does not hold.
    #[error("word not found: {0}")]
    NotFound(String),

    /// Import payload without a usable `words` mapping.
    #[error("invalid dictionary format: {0}")]
    Format(String),

    /// Network failure talking to image search or remote image conversion.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// A consumed capability (speech engine, speech recognition) is absent
    /// in this runtime. Dependent controls go inert rather than crashing.
    #[error("{0} is unavailable in this runtime")]
    CapabilityUnavailable(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WordbeamError>;
