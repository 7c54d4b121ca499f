use thiserror::Error;

/// Core error type shared across patchguard crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema document could not be decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// The schema violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

/// Convenience alias for results returned by patchguard crates.
pub type Result<T> = std::result::Result<T, Error>;
