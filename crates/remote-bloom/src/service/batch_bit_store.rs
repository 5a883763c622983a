//! Batched bit reads and writes against one remote bit vector
//!
//! Every call queues one command per position and flushes exactly once, so
//! k positions cost a single round-trip.

use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use tracing::debug;

use crate::domain::{BitPosition, BitVectorHandle};
use crate::error::StoreError;
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::ports::{PendingRead, PendingWrite, PipelinedBitConnection};

/// Pipelined access to the bit vector named by one handle
pub struct BatchBitStore<C> {
    handle: BitVectorHandle,
    connection: C,
    metrics: Arc<dyn MetricsRecorder>,
}

impl<C: PipelinedBitConnection> BatchBitStore<C> {
    pub fn new(handle: BitVectorHandle, connection: C) -> Self {
        Self {
            handle,
            connection,
            metrics: Arc::new(NoOpMetrics),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn handle(&self) -> &BitVectorHandle {
        &self.handle
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Set every position to 1 without observing the outcome.
    ///
    /// Already-set bits are unaffected.
    pub fn set_bits(&self, positions: &[BitPosition]) {
        for &position in positions {
            // Acknowledgement intentionally dropped
            drop(self.connection.set_bit(self.handle.key(), position));
        }
        self.flush(positions.len());
    }

    /// Set every position to 1 and resolve once all writes are acknowledged.
    ///
    /// The commands are queued and flushed before this returns; the returned
    /// future only waits. The first failed write (in position order) is
    /// reported.
    pub fn set_bits_acked(&self, positions: &[BitPosition]) -> PendingWrite {
        let pending: Vec<_> = positions
            .iter()
            .map(|&position| self.connection.set_bit(self.handle.key(), position))
            .collect();
        self.flush(positions.len());

        join_all(pending)
            .map(|results| results.into_iter().collect::<Result<(), StoreError>>())
            .boxed()
    }

    /// Read every position; one pending read per position, in order.
    ///
    /// A failure of one read does not affect its siblings.
    pub fn get_bits(&self, positions: &[BitPosition]) -> Vec<PendingRead> {
        let pending = positions
            .iter()
            .map(|&position| self.connection.get_bit(self.handle.key(), position))
            .collect();
        self.flush(positions.len());
        pending
    }

    fn flush(&self, commands: usize) {
        self.connection.flush();
        self.metrics.pipeline_flushed(commands);
        debug!(key = %self.handle, commands = commands, "Flushed bit pipeline");
    }
}
