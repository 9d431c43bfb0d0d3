//! Uniform response envelope returned by every cache accessor.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Outcome of one accessor call.
///
/// Callers tell fresh, cached and failed fetches apart from the flags alone:
///
/// | `success` | `cached` | meaning |
/// |-----------|----------|---------|
/// | true | true | served from a fresh entry, producer not called |
/// | true | false | producer ran and its value was stored |
/// | false | false | producer failed, nothing stored, see `error` |
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub cached: bool,
    /// Creation time of the entry for cache hits, call time otherwise.
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", with = "ttl_millis")]
    pub ttl: Option<Duration>,
}

impl<T> AgentResponse<T> {
    /// Value served from a fresh cache entry.
    pub fn hit(data: T, stored_at: DateTime<Utc>, ttl: Duration) -> Self {
        AgentResponse {
            success: true,
            data: Some(data),
            error: None,
            cached: true,
            timestamp: stored_at,
            ttl: Some(ttl),
        }
    }

    /// Value just produced and stored.
    pub fn fresh(data: T, stored_at: DateTime<Utc>, ttl: Duration) -> Self {
        AgentResponse {
            success: true,
            data: Some(data),
            error: None,
            cached: false,
            timestamp: stored_at,
            ttl: Some(ttl),
        }
    }

    /// Producer failure.
    pub fn failure(error: impl Into<String>) -> Self {
        AgentResponse {
            success: false,
            data: None,
            error: Some(error.into()),
            cached: false,
            timestamp: Utc::now(),
            ttl: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Payload, if the call succeeded.
    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Transform the payload, keeping the flags.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AgentResponse<U> {
        AgentResponse {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
            cached: self.cached,
            timestamp: self.timestamp,
            ttl: self.ttl,
        }
    }

    /// Fold many responses into one: `success` is the AND, `cached` the OR.
    ///
    /// Successful payloads keep their input order. The first error message
    /// is carried over. The merged response has no TTL.
    pub fn merge(responses: Vec<AgentResponse<T>>) -> AgentResponse<Vec<T>> {
        let success = responses.iter().all(|r| r.success);
        let cached = responses.iter().any(|r| r.cached);
        let error = responses.iter().find_map(|r| r.error.clone());
        let data = responses.into_iter().filter_map(|r| r.data).collect();

        AgentResponse {
            success,
            data: Some(data),
            error,
            cached,
            timestamp: Utc::now(),
            ttl: None,
        }
    }
}

mod ttl_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(ttl: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match ttl {
            Some(d) => s.serialize_u64(d.as_millis() as u64),
            None => s.serialize_none(),
        }
    }
}
