//! Adapters Layer (Driven Adapters)
//!
//! Implementations of the `PipelinedBitConnection` port.
//!
//! ## Adapters
//!
//! - `InMemoryBitConnection` - Shared in-process bit vectors, with injectable
//!   latency and faults
//! - `RedisBitConnection` - `SETBIT`/`GETBIT` pipelines over a multiplexed
//!   Redis connection (feature `redis`)

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_storage;

pub use memory::{InMemoryBitConnection, InMemoryBitStore};
#[cfg(feature = "redis")]
pub use redis_storage::RedisBitConnection;
