//! Import job configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a job does when a row fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Record the failure and move on to the next row.
    #[default]
    ContinueOnError,
    /// Stop at the first failed row.
    AbortOnError,
}

/// Location fields filled in when a source row has none.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDefaults {
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub county: String,
}

impl Default for PropertyDefaults {
    fn default() -> Self {
        PropertyDefaults {
            city: "Houston".to_string(),
            state: "TX".to_string(),
            zip_code: "77001".to_string(),
            county: "Harris".to_string(),
        }
    }
}

/// Settings for the Houston P-data import.
///
/// ```
/// use market_intel::import::{ErrorPolicy, ImportConfig};
///
/// let config = ImportConfig::new("data/houston-pdata")
///     .with_error_policy(ErrorPolicy::AbortOnError);
/// assert_eq!(config.defaults.zip_code, "77001");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportConfig {
    /// Directory holding the exported files.
    pub base_dir: PathBuf,
    pub error_policy: ErrorPolicy,
    pub defaults: PropertyDefaults,
}

impl ImportConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        ImportConfig {
            base_dir: base_dir.into(),
            error_policy: ErrorPolicy::default(),
            defaults: PropertyDefaults::default(),
        }
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn with_defaults(mut self, defaults: PropertyDefaults) -> Self {
        self.defaults = defaults;
        self
    }
}
