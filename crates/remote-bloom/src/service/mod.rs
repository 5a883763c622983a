//! Service Layer
//!
//! Batched store access, AND-reduction of bit reads, and the filter facade
//! that ties them to an index strategy.

pub mod aggregator;
pub mod batch_bit_store;
pub mod remote_bloom_filter;

pub use aggregator::MembershipAggregator;
pub use batch_bit_store::BatchBitStore;
pub use remote_bloom_filter::RemoteBloomFilter;
