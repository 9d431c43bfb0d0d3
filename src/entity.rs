//! Core trait for values the read-through cache can hold.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Trait implemented by every payload stored in the cache.
///
/// The category names the kind of data and drives the TTL policy lookup
/// (see [`TtlPolicy`](crate::observability::TtlPolicy)).
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use market_intel::CachePayload;
///
/// #[derive(Clone, Serialize, Deserialize)]
/// pub struct SchoolRating {
///     pub district: String,
///     pub score: f64,
/// }
///
/// impl CachePayload for SchoolRating {
///     fn category() -> &'static str {
///         "school-rating"
///     }
/// }
/// ```
pub trait CachePayload: Send + Sync + Serialize + DeserializeOwned + Clone + 'static {
    /// Category used to resolve this payload's TTL.
    fn category() -> &'static str;

    /// Encode for cache storage. Not meant to be overridden.
    fn serialize_for_cache(&self) -> Result<Vec<u8>> {
        crate::serialization::serialize_for_cache(self)
    }

    /// Decode from cache storage. Not meant to be overridden.
    fn deserialize_from_cache(bytes: &[u8]) -> Result<Self> {
        crate::serialization::deserialize_from_cache(bytes)
    }

    /// Optional: check a freshly produced value before it is stored.
    ///
    /// A failing value is reported as an unsuccessful fetch and never cached.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Lists share the category of their element type.
impl<T: CachePayload> CachePayload for Vec<T> {
    fn category() -> &'static str {
        T::category()
    }

    fn validate(&self) -> Result<()> {
        self.iter().try_for_each(CachePayload::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde::Deserialize;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct ZipPrice {
        zip: String,
        median: f64,
    }

    impl CachePayload for ZipPrice {
        fn category() -> &'static str {
            "zip-price"
        }

        fn validate(&self) -> Result<()> {
            if self.median < 0.0 {
                return Err(Error::ValidationError("negative median".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_serialize_deserialize() {
        let value = ZipPrice {
            zip: "77479".to_string(),
            median: 425000.0,
        };

        let bytes = value.serialize_for_cache().unwrap();
        let back = ZipPrice::deserialize_from_cache(&bytes).unwrap();
        assert_eq!(value, back);
    }

    #[test]
    fn test_vec_inherits_category_and_validation() {
        assert_eq!(<Vec<ZipPrice> as CachePayload>::category(), "zip-price");

        let list = vec![
            ZipPrice {
                zip: "77094".to_string(),
                median: 1.0,
            },
            ZipPrice {
                zip: "77002".to_string(),
                median: -1.0,
            },
        ];
        assert!(list.validate().is_err());
    }
}
