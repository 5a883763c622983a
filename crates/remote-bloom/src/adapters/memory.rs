//! In-memory bit store
//!
//! `InMemoryBitStore` plays the remote server: named bit vectors shared by
//! every connection made from it. `InMemoryBitConnection` is one pipelined
//! client connection. Commands queue until `flush`, then complete through
//! oneshot channels, optionally after a simulated network delay.
//!
//! Bit order follows remote bitmaps: bit 0 is the most significant bit of the
//! first byte, and vectors grow on demand when a higher offset is set.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bitvec::prelude::*;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::domain::{BitPosition, MAX_BIT_SIZE};
use crate::error::StoreError;
use crate::ports::{PendingRead, PendingWrite, PipelinedBitConnection};

type BitVector = BitVec<u8, Msb0>;

/// Shared bit vectors keyed by store key
#[derive(Clone, Default)]
pub struct InMemoryBitStore {
    vectors: Arc<RwLock<HashMap<String, BitVector>>>,
}

impl InMemoryBitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new pipelined connection to this store
    pub fn connect(&self) -> InMemoryBitConnection {
        InMemoryBitConnection::new(self.clone())
    }

    /// Set one bit, growing the vector as needed. Returns the previous value.
    pub fn set_bit(&self, key: &str, position: BitPosition) -> Result<bool, StoreError> {
        let index = checked_offset(position)?;
        let mut vectors = self.vectors.write();
        let bits = vectors.entry(key.to_string()).or_default();

        if bits.len() <= index {
            // Grow in whole bytes
            bits.resize((index / 8 + 1) * 8, false);
        }
        Ok(bits.replace(index, true))
    }

    /// Read one bit; bits beyond the vector (or of a missing key) read 0
    pub fn get_bit(&self, key: &str, position: BitPosition) -> Result<bool, StoreError> {
        let index = checked_offset(position)?;
        let vectors = self.vectors.read();
        Ok(vectors
            .get(key)
            .and_then(|bits| bits.get(index).map(|bit| *bit))
            .unwrap_or(false))
    }

    /// Test-friendly read that treats errors as unset
    pub fn bit(&self, key: &str, position: BitPosition) -> bool {
        self.get_bit(key, position).unwrap_or(false)
    }

    /// Number of set bits stored under `key`
    pub fn count_ones(&self, key: &str) -> usize {
        self.vectors
            .read()
            .get(key)
            .map(|bits| bits.count_ones())
            .unwrap_or(0)
    }

    /// Raw bytes stored under `key`, as a remote `GET` would return them
    pub fn raw_bytes(&self, key: &str) -> Vec<u8> {
        self.vectors
            .read()
            .get(key)
            .map(|bits| bits.as_raw_slice().to_vec())
            .unwrap_or_default()
    }

    /// Remove the vector stored under `key`
    pub fn delete(&self, key: &str) -> bool {
        self.vectors.write().remove(key).is_some()
    }
}

fn checked_offset(position: BitPosition) -> Result<usize, StoreError> {
    if position >= MAX_BIT_SIZE {
        return Err(StoreError::CommandError(
            "bit offset is not an integer or out of range".to_string(),
        ));
    }
    usize::try_from(position)
        .map_err(|_| StoreError::CommandError("bit offset exceeds address space".to_string()))
}

/// Faults injected into a connection's flushed batches
#[derive(Clone, Debug, Default)]
struct FaultPlan {
    latency: Option<Duration>,
    fail_all: bool,
    failing_reads: HashSet<BitPosition>,
    dropped_reads: HashSet<BitPosition>,
}

enum QueuedCommand {
    SetBit {
        key: String,
        position: BitPosition,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    GetBit {
        key: String,
        position: BitPosition,
        reply: oneshot::Sender<Result<bool, StoreError>>,
    },
}

/// One pipelined connection to an `InMemoryBitStore`
pub struct InMemoryBitConnection {
    store: InMemoryBitStore,
    queue: Mutex<Vec<QueuedCommand>>,
    faults: Mutex<FaultPlan>,
    flushes: AtomicU64,
    commands_sent: AtomicU64,
}

impl InMemoryBitConnection {
    pub fn new(store: InMemoryBitStore) -> Self {
        Self {
            store,
            queue: Mutex::new(Vec::new()),
            faults: Mutex::new(FaultPlan::default()),
            flushes: AtomicU64::new(0),
            commands_sent: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &InMemoryBitStore {
        &self.store
    }

    /// Delay every flushed batch by `latency` (requires a tokio runtime)
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.faults.lock().latency = latency;
    }

    /// Fail every command, reads and writes, as if the connection dropped
    pub fn fail_all(&self, enabled: bool) {
        self.faults.lock().fail_all = enabled;
    }

    /// Fail reads of `position` with a command error
    pub fn fail_read_at(&self, position: BitPosition) {
        self.faults.lock().failing_reads.insert(position);
    }

    /// Never answer reads of `position`; their completions are dropped
    pub fn drop_read_at(&self, position: BitPosition) {
        self.faults.lock().dropped_reads.insert(position);
    }

    /// Remove every injected fault
    pub fn clear_faults(&self) {
        *self.faults.lock() = FaultPlan::default();
    }

    /// Flushes issued on this connection
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Commands sent across all flushes
    pub fn commands_sent(&self) -> u64 {
        self.commands_sent.load(Ordering::Relaxed)
    }

    /// Commands queued but not yet flushed
    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }
}

impl PipelinedBitConnection for InMemoryBitConnection {
    fn set_bit(&self, key: &str, position: BitPosition) -> PendingWrite {
        let (reply, rx) = oneshot::channel();
        self.queue.lock().push(QueuedCommand::SetBit {
            key: key.to_string(),
            position,
            reply,
        });
        rx.map(|delivered| delivered.unwrap_or(Err(StoreError::Interrupted)))
            .boxed()
    }

    fn get_bit(&self, key: &str, position: BitPosition) -> PendingRead {
        let (reply, rx) = oneshot::channel();
        self.queue.lock().push(QueuedCommand::GetBit {
            key: key.to_string(),
            position,
            reply,
        });
        rx.map(|delivered| delivered.unwrap_or(Err(StoreError::Interrupted)))
            .boxed()
    }

    fn flush(&self) {
        let batch = std::mem::take(&mut *self.queue.lock());
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.commands_sent
            .fetch_add(batch.len() as u64, Ordering::Relaxed);

        let faults = self.faults.lock().clone();
        let store = self.store.clone();

        match faults.latency {
            Some(delay) => match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(async move {
                        tokio::time::sleep(delay).await;
                        execute_batch(&store, batch, &faults);
                    });
                }
                Err(_) => {
                    warn!("No tokio runtime for delayed flush, executing immediately");
                    execute_batch(&store, batch, &faults);
                }
            },
            None => execute_batch(&store, batch, &faults),
        }
    }
}

fn execute_batch(store: &InMemoryBitStore, batch: Vec<QueuedCommand>, faults: &FaultPlan) {
    debug!(commands = batch.len(), "Executing bit pipeline");

    // Receivers may already be gone (timed-out callers); send errors are ignored
    for command in batch {
        match command {
            QueuedCommand::SetBit {
                key,
                position,
                reply,
            } => {
                let result = if faults.fail_all {
                    Err(StoreError::ConnectionError("connection reset".to_string()))
                } else {
                    store.set_bit(&key, position).map(|_| ())
                };
                let _ = reply.send(result);
            }
            QueuedCommand::GetBit {
                key,
                position,
                reply,
            } => {
                if faults.dropped_reads.contains(&position) {
                    continue;
                }
                let result = if faults.fail_all {
                    Err(StoreError::ConnectionError("connection reset".to_string()))
                } else if faults.failing_reads.contains(&position) {
                    Err(StoreError::CommandError(format!(
                        "injected failure at {}",
                        position
                    )))
                } else {
                    store.get_bit(&key, position)
                };
                let _ = reply.send(result);
            }
        }
    }
}
