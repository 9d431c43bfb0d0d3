//! Error types for the market cache and import pipeline.

use std::fmt;

/// Result type for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for market-intel.
///
/// Cache accessors never surface these directly: a failed producer is folded
/// into an unsuccessful [`AgentResponse`](crate::response::AgentResponse).
/// The variants show up on the import side and on the lower-level store and
/// serialization APIs.
#[derive(Debug, Clone)]
pub enum Error {
    /// Serialization failed when encoding a value for cache storage.
    SerializationError(String),

    /// Stored bytes could not be decoded back into the requested type.
    ///
    /// **Recovery:** the cache treats the entry as a miss and refreshes it.
    DeserializationError(String),

    /// Cache entry header is invalid (wrong magic, truncated envelope).
    InvalidCacheEntry(String),

    /// Stored entry was written with a different schema version.
    VersionMismatch {
        /// Expected schema version (from compiled code)
        expected: u32,
        /// Found schema version (from cached entry)
        found: u32,
    },

    /// A market data producer failed.
    ///
    /// Common causes:
    /// - Upstream feed unavailable
    /// - Requested area has no data
    SourceError(String),

    /// Record store rejected an operation.
    StoreError(String),

    /// A file could not be imported (missing, unreadable, malformed).
    ImportError(String),

    /// Row or entity failed validation.
    ValidationError(String),

    /// Invalid configuration.
    ConfigError(String),

    /// Requested format or operation is not supported.
    ///
    /// Returned for `.xlsx`/`.xls` inputs: export the sheet to CSV first.
    NotImplemented(String),

    /// Generic error with custom message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::InvalidCacheEntry(msg) => write!(f, "Invalid cache entry: {}", msg),
            Error::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Cache version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            Error::SourceError(msg) => write!(f, "Source error: {}", msg),
            Error::StoreError(msg) => write!(f, "Store error: {}", msg),
            Error::ImportError(msg) => write!(f, "Import error: {}", msg),
            Error::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::NotImplemented(msg) => write!(f, "Not implemented: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::ImportError(e.to_string())
        } else if e.is_syntax() || e.is_eof() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::ImportError(format!("CSV error: {}", e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::ImportError(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}
