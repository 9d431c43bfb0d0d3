//! Postcard encoding for cached market payloads.
//!
//! Every value the cache stores is frozen into bytes at write time, so a
//! caller holding a decoded copy can never change what the next reader sees.
//! A refresh replaces the bytes wholesale.
//!
//! # Format
//!
//! ```text
//! ┌─────────────────┬─────────────────┬──────────────────────────┐
//! │  MAGIC (4 bytes)│VERSION (varint) │POSTCARD PAYLOAD (N bytes)│
//! └─────────────────┴─────────────────┴──────────────────────────┘
//!   "MKTI"              u32                postcard::to_allocvec(T)
//! ```
//!
//! Cached payload types must stay postcard-friendly: no
//! `#[serde(skip_serializing_if)]`, no untyped `serde_json::Value` fields.
//!
//! ```rust
//! use market_intel::serialization::{serialize_for_cache, deserialize_from_cache};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Listing {
//!     zip: String,
//!     price: f64,
//! }
//!
//! # fn main() -> market_intel::Result<()> {
//! let listing = Listing { zip: "77433".to_string(), price: 385000.0 };
//! let bytes = serialize_for_cache(&listing)?;
//! let back: Listing = deserialize_from_cache(&bytes)?;
//! assert_eq!(listing, back);
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Magic header for market-intel cache entries.
pub const CACHE_MAGIC: [u8; 4] = *b"MKTI";

/// Current schema version.
///
/// Bump when a cached payload type changes shape. Older entries then fail
/// validation and the cache refreshes them from their producer.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Versioned envelope wrapped around every cached payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CacheEnvelope<T> {
    /// Must be [`CACHE_MAGIC`]
    pub magic: [u8; 4],
    /// Must be [`CURRENT_SCHEMA_VERSION`]
    pub version: u32,
    /// The cached value
    pub payload: T,
}

impl<T> CacheEnvelope<T> {
    /// Wrap a payload with the current magic and version.
    pub fn new(payload: T) -> Self {
        Self {
            magic: CACHE_MAGIC,
            version: CURRENT_SCHEMA_VERSION,
            payload,
        }
    }
}

/// Encode a value for the cache store.
///
/// # Errors
///
/// Returns `Error::SerializationError` if postcard rejects the value.
pub fn serialize_for_cache<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let envelope = CacheEnvelope::new(value);
    postcard::to_allocvec(&envelope).map_err(|e| {
        error!("Cache serialization failed: {}", e);
        Error::SerializationError(e.to_string())
    })
}

/// Decode a value from the cache store, checking magic and version first.
///
/// # Errors
///
/// - `Error::DeserializationError`: truncated or corrupted payload
/// - `Error::InvalidCacheEntry`: wrong magic header
/// - `Error::VersionMismatch`: written by another schema version
pub fn deserialize_from_cache<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let envelope: CacheEnvelope<T> = postcard::from_bytes(bytes).map_err(|e| {
        debug!("Cache deserialization failed: {}", e);
        Error::DeserializationError(e.to_string())
    })?;

    if envelope.magic != CACHE_MAGIC {
        warn!(
            "Invalid cache entry: expected magic {:?}, got {:?}",
            CACHE_MAGIC, envelope.magic
        );
        return Err(Error::InvalidCacheEntry(format!(
            "Invalid magic: expected {:?}, got {:?}",
            CACHE_MAGIC, envelope.magic
        )));
    }

    if envelope.version != CURRENT_SCHEMA_VERSION {
        warn!(
            "Cache version mismatch: expected {}, got {}",
            CURRENT_SCHEMA_VERSION, envelope.version
        );
        return Err(Error::VersionMismatch {
            expected: CURRENT_SCHEMA_VERSION,
            found: envelope.version,
        });
    }

    Ok(envelope.payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
    struct PermitTotals {
        location: String,
        count: u32,
        value: f64,
        recorded_at: chrono::DateTime<Utc>,
        tags: Vec<String>,
    }

    fn sample() -> PermitTotals {
        PermitTotals {
            location: "Cypress".to_string(),
            count: 487,
            value: 378_000_000.0,
            recorded_at: Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap(),
            tags: vec!["residential".to_string(), "commercial".to_string()],
        }
    }

    #[test]
    fn test_roundtrip_with_timestamp() {
        let data = sample();
        let bytes = serialize_for_cache(&data).unwrap();
        let back: PermitTotals = deserialize_from_cache(&bytes).unwrap();
        assert_eq!(data, back);
    }

    #[test]
    fn test_envelope_structure() {
        let bytes = serialize_for_cache(&sample()).unwrap();

        // postcard uses varints, so decode rather than index bytes
        let envelope: CacheEnvelope<PermitTotals> = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(envelope.magic, CACHE_MAGIC);
        assert_eq!(envelope.version, CURRENT_SCHEMA_VERSION);
        assert_eq!(envelope.payload, sample());
    }

    #[test]
    fn test_invalid_magic_rejected() {
        let mut envelope = CacheEnvelope::new(sample());
        envelope.magic = *b"CKIT";
        let bytes = postcard::to_allocvec(&envelope).unwrap();

        let result: Result<PermitTotals> = deserialize_from_cache(&bytes);
        match result.unwrap_err() {
            Error::InvalidCacheEntry(_) => {}
            e => panic!("Expected InvalidCacheEntry, got {:?}", e),
        }
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut envelope = CacheEnvelope::new(sample());
        envelope.version = 999;
        let bytes = postcard::to_allocvec(&envelope).unwrap();

        let result: Result<PermitTotals> = deserialize_from_cache(&bytes);
        match result.unwrap_err() {
            Error::VersionMismatch { expected, found } => {
                assert_eq!(expected, CURRENT_SCHEMA_VERSION);
                assert_eq!(found, 999);
            }
            e => panic!("Expected VersionMismatch, got {:?}", e),
        }
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let mut bytes = serialize_for_cache(&sample()).unwrap();
        let half = bytes.len() / 2;
        bytes.truncate(half);

        let result: Result<PermitTotals> = deserialize_from_cache(&bytes);
        assert!(matches!(result, Err(Error::DeserializationError(_))));
    }

    #[test]
    fn test_deterministic_serialization() {
        let a = serialize_for_cache(&sample()).unwrap();
        let b = serialize_for_cache(&sample()).unwrap();
        assert_eq!(a, b);
    }
}
