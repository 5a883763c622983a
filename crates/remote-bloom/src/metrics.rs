//! Metrics hooks for remote Bloom filter operations
//!
//! Counts inserts, resolved queries, pipeline flushes and the queries that
//! fell back to `false` because the store failed or the wait expired.
//!
//! ## Usage
//!
//! ```ignore
//! use remote_bloom::metrics::Metrics;
//! use std::sync::Arc;
//!
//! let metrics = Arc::new(Metrics::new());
//! let filter = RemoteBloomFilter::new(config, connection)?.with_metrics(metrics.clone());
//! // ...
//! println!("{:?}", metrics.snapshot());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Why a synchronous-style query answered `false` without reading all bits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FallbackReason {
    /// The bounded wait expired
    Timeout,
    /// A read failed or its completion was dropped
    StoreFailure,
}

#[derive(Clone, Copy)]
enum Counter {
    FiltersBound,
    Inserts,
    InsertNanos,
    Queries,
    QueriesPresent,
    QueryNanos,
    Timeouts,
    StoreFailures,
    Flushes,
    PipelinedCommands,
}

const COUNTERS: usize = Counter::PipelinedCommands as usize + 1;

/// Atomic counters shared by every filter wired to the same recorder
#[derive(Default)]
pub struct Metrics {
    counters: [AtomicU64; COUNTERS],
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&self, counter: Counter, amount: u64) {
        self.counters[counter as usize].fetch_add(amount, Ordering::Relaxed);
    }

    fn get(&self, counter: Counter) -> u64 {
        self.counters[counter as usize].load(Ordering::Relaxed)
    }

    fn mean(&self, total: Counter, count: Counter) -> Duration {
        match self.get(count) {
            0 => Duration::ZERO,
            n => Duration::from_nanos(self.get(total) / n),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            filters_bound: self.get(Counter::FiltersBound),
            inserts: self.get(Counter::Inserts),
            queries: self.get(Counter::Queries),
            queries_present: self.get(Counter::QueriesPresent),
            timeouts: self.get(Counter::Timeouts),
            store_failures: self.get(Counter::StoreFailures),
            flushes: self.get(Counter::Flushes),
            pipelined_commands: self.get(Counter::PipelinedCommands),
            mean_insert: self.mean(Counter::InsertNanos, Counter::Inserts),
            mean_query: self.mean(Counter::QueryNanos, Counter::Queries),
        }
    }

    /// Share of resolved queries that answered present.
    ///
    /// Includes true positives, so it only approximates the false positive
    /// rate when the queried elements were never inserted.
    pub fn present_ratio(&self) -> f64 {
        match self.get(Counter::Queries) {
            0 => 0.0,
            n => self.get(Counter::QueriesPresent) as f64 / n as f64,
        }
    }

    pub fn reset(&self) {
        for counter in &self.counters {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Point-in-time copy of `Metrics`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub filters_bound: u64,
    pub inserts: u64,
    /// Queries whose reads all resolved from the store
    pub queries: u64,
    pub queries_present: u64,
    pub timeouts: u64,
    pub store_failures: u64,
    pub flushes: u64,
    pub pipelined_commands: u64,
    pub mean_insert: Duration,
    pub mean_query: Duration,
}

impl MetricsSnapshot {
    /// Queries answered `false` without a complete read
    pub fn fallbacks(&self) -> u64 {
        self.timeouts + self.store_failures
    }
}

/// Sink for filter events
///
/// Implement this to forward counts to an external metrics system.
pub trait MetricsRecorder: Send + Sync {
    fn filter_bound(&self);

    fn insert_sent(&self, elapsed: Duration);

    /// A query whose k reads all resolved; `present` may be a false positive
    fn query_resolved(&self, elapsed: Duration, present: bool);

    fn query_fallback(&self, reason: FallbackReason);

    fn pipeline_flushed(&self, commands: usize);
}

/// Recorder that discards everything
#[derive(Default)]
pub struct NoOpMetrics;

impl MetricsRecorder for NoOpMetrics {
    fn filter_bound(&self) {}
    fn insert_sent(&self, _: Duration) {}
    fn query_resolved(&self, _: Duration, _: bool) {}
    fn query_fallback(&self, _: FallbackReason) {}
    fn pipeline_flushed(&self, _: usize) {}
}

impl MetricsRecorder for Metrics {
    fn filter_bound(&self) {
        self.add(Counter::FiltersBound, 1);
    }

    fn insert_sent(&self, elapsed: Duration) {
        self.add(Counter::Inserts, 1);
        self.add(Counter::InsertNanos, elapsed.as_nanos() as u64);
    }

    fn query_resolved(&self, elapsed: Duration, present: bool) {
        self.add(Counter::Queries, 1);
        self.add(Counter::QueryNanos, elapsed.as_nanos() as u64);
        if present {
            self.add(Counter::QueriesPresent, 1);
        }
    }

    fn query_fallback(&self, reason: FallbackReason) {
        let counter = match reason {
            FallbackReason::Timeout => Counter::Timeouts,
            FallbackReason::StoreFailure => Counter::StoreFailures,
        };
        self.add(counter, 1);
    }

    fn pipeline_flushed(&self, commands: usize) {
        self.add(Counter::Flushes, 1);
        self.add(Counter::PipelinedCommands, commands as u64);
    }
}
