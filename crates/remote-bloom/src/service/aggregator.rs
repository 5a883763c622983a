//! AND-reduction of per-position bit reads into one membership answer
//!
//! The reduction waits for every read, whatever order they complete in.
//! Any failed or dropped read fails the aggregate; it is never folded in as
//! `true`. The waiting helpers turn a failed or expired aggregate into
//! `false` so call sites on the query path never see an error.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, join_all};
use futures::FutureExt;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::metrics::{FallbackReason, MetricsRecorder, NoOpMetrics};
use crate::ports::{MembershipFuture, PendingRead};

/// Reduces pending bit reads and applies the query wait policy
#[derive(Clone)]
pub struct MembershipAggregator {
    metrics: Arc<dyn MetricsRecorder>,
}

impl Default for MembershipAggregator {
    fn default() -> Self {
        Self::new(Arc::new(NoOpMetrics))
    }
}

impl MembershipAggregator {
    pub fn new(metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self { metrics }
    }

    /// Combine reads with logical AND.
    ///
    /// Resolves to `Ok(true)` iff every read resolved to `Ok(true)`. The first
    /// failure in position order is propagated. An empty batch fails with
    /// [`StoreError::EmptyBatch`] rather than resolving vacuously to `true`.
    pub fn reduce_and(reads: Vec<PendingRead>) -> MembershipFuture {
        if reads.is_empty() {
            return future::ready(Err(StoreError::EmptyBatch)).boxed();
        }

        join_all(reads)
            .map(|results| {
                results
                    .into_iter()
                    .try_fold(true, |all_set, read| read.map(|bit| all_set && bit))
            })
            .boxed()
    }

    /// Wait for the aggregate with no bound; any failure answers `false`
    pub async fn await_unbounded(&self, aggregate: MembershipFuture) -> bool {
        self.resolve(aggregate.await)
    }

    /// Wait at most `timeout`; expiry or failure answers `false`.
    ///
    /// Only the wait is bounded. Reads still in flight are abandoned and may
    /// complete on the store after this returns.
    pub async fn await_bounded(&self, aggregate: MembershipFuture, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, aggregate).await {
            Ok(result) => self.resolve(result),
            Err(_) => {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Membership query timed out, answering absent"
                );
                self.metrics.query_fallback(FallbackReason::Timeout);
                false
            }
        }
    }

    fn resolve(&self, result: Result<bool, StoreError>) -> bool {
        match result {
            Ok(found) => found,
            Err(e) => {
                debug!(error = %e, "Membership query failed, answering absent");
                self.metrics.query_fallback(FallbackReason::StoreFailure);
                false
            }
        }
    }
}
