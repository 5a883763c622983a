//! Error types for the remote Bloom filter

use thiserror::Error;

/// Errors raised while configuring or using a remote Bloom filter
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Filter size exceeds maximum: {size} > {max}")]
    FilterTooLarge { size: u64, max: u64 },

    #[error("Invalid false positive rate: {fpr} (must be strictly between 0 and 1)")]
    InvalidFPR { fpr: f64 },

    #[error("Invalid filter parameters: {0}")]
    InvalidParameters(String),

    #[error("Bit store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Errors surfaced by the remote bit store, per pending command
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Command error: {0}")]
    CommandError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Interrupted: completion dropped before delivery")]
    Interrupted,

    #[error("Empty batch: no bit positions to read")]
    EmptyBatch,
}
