//! # Remote Bloom
//!
//! A Bloom filter whose bit vector lives in a shared remote bit store, so
//! many processes observe and update the same filter through one store key.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure logic, no I/O
//!   - `BitVectorHandle`: Names one remote bit vector
//!   - `BitIndexStrategy` / `HashedIndexStrategy`: element -> k bit positions
//!   - `FilterConfig` / `FilterConfigBuilder`: Configuration with validation
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `MembershipFilter`: Driving port (inbound API)
//!   - `PipelinedBitConnection`: Driven port (the remote bit store)
//!
//! - **Service Layer** (`service/`): Orchestration
//!   - `BatchBitStore`: k commands, one flush, per insert or query
//!   - `MembershipAggregator`: AND-reduction and wait policy
//!   - `RemoteBloomFilter`: Implements `MembershipFilter`
//!
//! - **Adapters Layer** (`adapters/`): Bit store connections
//!   - `InMemoryBitConnection`: In-process store with fault injection
//!   - `RedisBitConnection`: Redis pipelines (feature `redis`)
//!
//! ## Invariants
//!
//! - **No false negatives under success**: once every write of an insert has
//!   landed, `might_contain` for that element returns true
//! - **All k reads participate**: a query is true only if every read
//!   succeeded and every bit was set
//! - **Safe fallback**: `might_contain` and `might_contain_timeout` answer
//!   false on timeout, interruption or store failure; they never raise.
//!   `might_contain_async` propagates the error instead.
//!
//! The fallback can turn a slow or failed query into a false negative. That
//! is a bounded, detectable deviation from the classic Bloom filter
//! guarantee: callers that need certainty use `might_contain_async` and
//! retry on error.
//!
//! ## Usage Example
//!
//! ```ignore
//! use remote_bloom::{FilterConfigBuilder, InMemoryBitStore, RemoteBloomFilter};
//! use std::time::Duration;
//!
//! let config = FilterConfigBuilder::new()
//!     .key("signups:emails")
//!     .expected_elements(1_000_000)
//!     .false_positive_rate(0.01)
//!     .build()?;
//!
//! let store = InMemoryBitStore::new();
//! let filter = RemoteBloomFilter::<str, _>::new(&config, store.connect())?;
//!
//! filter.insert("alice@example.com");
//! assert!(filter.might_contain("alice@example.com").await);
//! let maybe = filter
//!     .might_contain_timeout("bob@example.com", Duration::from_millis(50))
//!     .await;
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports for convenience
pub use adapters::{InMemoryBitConnection, InMemoryBitStore};
#[cfg(feature = "redis")]
pub use adapters::RedisBitConnection;
pub use domain::{
    BitIndexStrategy, BitPosition, BitVectorHandle, ElementMapper, FilterConfig,
    FilterConfigBuilder, HashedIndexStrategy,
};
pub use error::{FilterError, StoreError};
pub use metrics::{FallbackReason, Metrics, MetricsRecorder, MetricsSnapshot, NoOpMetrics};
pub use ports::{MembershipFilter, MembershipFuture, PendingRead, PendingWrite, PipelinedBitConnection};
pub use service::{BatchBitStore, MembershipAggregator, RemoteBloomFilter};
