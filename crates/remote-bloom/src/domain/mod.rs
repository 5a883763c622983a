//! Domain Layer - Pure logic
//!
//! This layer contains:
//! - Bit vector handle and position types
//! - Hash functions
//! - Vector sizing
//! - Index strategies (element -> bit positions)
//! - Configuration
//!
//! RULES:
//! - No I/O operations
//! - No async code
//! - Pure functions where possible

pub mod config;
pub mod handle;
pub mod hash_functions;
pub mod index_strategy;
pub mod parameters;

pub use config::{FilterConfig, FilterConfigBuilder, DEFAULT_QUERY_TIMEOUT_MS};
pub use handle::{BitPosition, BitVectorHandle};
pub use index_strategy::{BitIndexStrategy, ElementMapper, HashedIndexStrategy};
pub use parameters::{FilterSizing, DEFAULT_FPR, MAX_BIT_SIZE};
