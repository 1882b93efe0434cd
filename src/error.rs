//! Error handling for metervision

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP client error (transport, timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status or other transport-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Image could not be fetched or is not a decodable JPEG
    #[error("Capture error: {0}")]
    Capture(String),

    /// Vision model returned the sentinel token, unparseable text,
    /// or the inference call itself failed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// New reading is below the last accepted one
    #[error("reading decreased: new {new} < previous {old}")]
    ReadingDecreased { old: f64, new: f64 },

    /// New reading jumped further than the configured maximum
    #[error("reading jump too large: +{diff} exceeds max {max}")]
    ReadingJumpTooLarge { diff: f64, max: f64 },

    /// Config error (fatal at startup only)
    #[error("Config error: {0}")]
    Config(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
