//! Inbound Ports (Driving Ports)
//!
//! The membership API callers use against a remote Bloom filter.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::domain::BitVectorHandle;
use crate::error::{FilterError, StoreError};

/// Unresolved AND of every bit read for one element
pub type MembershipFuture = BoxFuture<'static, Result<bool, StoreError>>;

/// Primary remote Bloom filter API (Driving Port)
///
/// Synchronous-style queries never fail: any store error, interruption or
/// expired wait answers `false`. That can produce a false negative, which a
/// caller may retry; it never produces a `true` from incomplete reads.
#[async_trait]
pub trait MembershipFilter<T: ?Sized + Sync>: Send + Sync {
    /// Set every bit of `element`; fire-and-forget, one flush
    fn insert(&self, element: &T);

    /// Set every bit of `element` and wait for the store to acknowledge
    async fn try_insert(&self, element: &T) -> Result<(), FilterError>;

    /// Test membership using the filter's default wait bound
    async fn might_contain(&self, element: &T) -> bool;

    /// Test membership, giving up with `false` after `timeout`
    async fn might_contain_timeout(&self, element: &T, timeout: Duration) -> bool;

    /// Test membership without waiting; store errors propagate
    fn might_contain_async(&self, element: &T) -> MembershipFuture;

    /// The remote vector this filter is bound to
    fn handle(&self) -> &BitVectorHandle;
}
