//! Remote Bloom filter configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use remote_bloom::domain::FilterConfigBuilder;
//!
//! let config = FilterConfigBuilder::new()
//!     .key("signups:emails")
//!     .expected_elements(1_000_000)
//!     .false_positive_rate(0.01)
//!     .query_timeout_ms(Some(250))
//!     .build()
//!     .expect("Valid config");
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::index_strategy::validated_sizing;
use super::parameters::{FilterSizing, DEFAULT_FPR};
use crate::error::FilterError;

/// Default bound for `might_contain`
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 30_000;

/// Remote Bloom filter configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Store key holding the bit vector
    pub key: String,
    /// Predicted number of distinct elements (n)
    pub expected_elements: u64,
    /// Target false positive rate, strictly between 0 and 1
    pub false_positive_rate: f64,
    /// Bound applied by `might_contain`; `None` waits indefinitely
    pub query_timeout_ms: Option<u64>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            key: "bloom".to_string(),
            expected_elements: 100_000,
            false_positive_rate: DEFAULT_FPR,
            query_timeout_ms: Some(DEFAULT_QUERY_TIMEOUT_MS),
        }
    }
}

impl FilterConfig {
    /// Create a new configuration with validation
    pub fn new(
        key: impl Into<String>,
        expected_elements: u64,
        false_positive_rate: f64,
    ) -> Result<Self, FilterError> {
        let config = Self {
            key: key.into(),
            expected_elements,
            false_positive_rate,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document; missing fields fall back to defaults
    pub fn from_json(json: &str) -> Result<Self, FilterError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and the vector size it implies
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.key.is_empty() {
            return Err(FilterError::InvalidParameters(
                "key cannot be empty".to_string(),
            ));
        }

        if self.query_timeout_ms == Some(0) {
            return Err(FilterError::InvalidParameters(
                "query_timeout_ms must be positive when set".to_string(),
            ));
        }

        validated_sizing(self.expected_elements, self.false_positive_rate).map(|_| ())
    }

    /// Sizing (m, k) derived from this configuration
    pub fn sizing(&self) -> Result<FilterSizing, FilterError> {
        validated_sizing(self.expected_elements, self.false_positive_rate)
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }
}

/// Builder for FilterConfig with validation
#[derive(Default)]
pub struct FilterConfigBuilder {
    key: Option<String>,
    expected_elements: Option<u64>,
    false_positive_rate: Option<f64>,
    query_timeout_ms: Option<Option<u64>>,
}

impl FilterConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the store key
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set predicted cardinality
    pub fn expected_elements(mut self, n: u64) -> Self {
        self.expected_elements = Some(n);
        self
    }

    /// Set target false positive rate (0 < fpr < 1)
    pub fn false_positive_rate(mut self, fpr: f64) -> Self {
        self.false_positive_rate = Some(fpr);
        self
    }

    /// Set the default query bound; `None` disables it
    pub fn query_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.query_timeout_ms = Some(timeout_ms);
        self
    }

    /// Build the FilterConfig, validating all parameters
    pub fn build(self) -> Result<FilterConfig, FilterError> {
        let config = self.build_unchecked();
        config.validate()?;
        Ok(config)
    }

    /// Build without validation (for internal use only)
    pub fn build_unchecked(self) -> FilterConfig {
        let defaults = FilterConfig::default();

        FilterConfig {
            key: self.key.unwrap_or(defaults.key),
            expected_elements: self.expected_elements.unwrap_or(defaults.expected_elements),
            false_positive_rate: self
                .false_positive_rate
                .unwrap_or(defaults.false_positive_rate),
            query_timeout_ms: self.query_timeout_ms.unwrap_or(defaults.query_timeout_ms),
        }
    }
}
