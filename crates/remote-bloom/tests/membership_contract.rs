//! # Membership Contract Tests
//!
//! End-to-end behaviour of `RemoteBloomFilter` against pipelined bit stores.
//!
//! ## Test Categories
//!
//! 1. **No false negatives** - acknowledged inserts are always found
//! 2. **Bounded false positives** - empirical rate stays near the target
//! 3. **Idempotent insert** - bits only move 0 -> 1
//! 4. **AND-reduction** - missing, failed or unset bits never read as present
//! 5. **Timeout fallback** - slow stores answer absent within the bound
//! 6. **Batching** - one flush per insert and per query, whatever k is
//! 7. **Async passthrough** - the async API surfaces store failures
//!
//! Categories 4 and 5 deliberately exercise the fallback that answers
//! `false` on failure: a bounded false negative the caller may retry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use rand::Rng;
use remote_bloom::{
    BitIndexStrategy, BitPosition, BitVectorHandle, FilterConfig, HashedIndexStrategy,
    InMemoryBitConnection, InMemoryBitStore, MembershipFilter, PendingRead, PendingWrite,
    PipelinedBitConnection, RemoteBloomFilter, StoreError,
};
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

// =============================================================================
// TEST HELPERS
// =============================================================================

/// Route fallback warnings to the test output; `RUST_LOG` overrides the level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("remote_bloom=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

fn config(key: &str, expected_elements: u64, fpr: f64) -> FilterConfig {
    FilterConfig {
        key: key.to_string(),
        expected_elements,
        false_positive_rate: fpr,
        query_timeout_ms: Some(1_000),
    }
}

fn filter_on(
    backend: &InMemoryBitStore,
    key: &str,
) -> RemoteBloomFilter<str, InMemoryBitConnection> {
    RemoteBloomFilter::new(&config(key, 1_000, 0.01), backend.connect()).unwrap()
}

/// Pipeline mock that counts flushes and answers every read with a fixed bit
struct CountingConnection {
    answer: bool,
    flushes: AtomicU64,
    pending: Mutex<Vec<oneshot::Sender<Result<bool, StoreError>>>>,
    pending_writes: Mutex<Vec<oneshot::Sender<Result<(), StoreError>>>>,
}

impl CountingConnection {
    fn new(answer: bool) -> Self {
        Self {
            answer,
            flushes: AtomicU64::new(0),
            pending: Mutex::new(Vec::new()),
            pending_writes: Mutex::new(Vec::new()),
        }
    }

    fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl PipelinedBitConnection for CountingConnection {
    fn set_bit(&self, _key: &str, _position: BitPosition) -> PendingWrite {
        let (tx, rx) = oneshot::channel();
        self.pending_writes.lock().push(tx);
        rx.map(|r| r.unwrap_or(Err(StoreError::Interrupted))).boxed()
    }

    fn get_bit(&self, _key: &str, _position: BitPosition) -> PendingRead {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().push(tx);
        rx.map(|r| r.unwrap_or(Err(StoreError::Interrupted))).boxed()
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        for tx in self.pending.lock().drain(..) {
            let _ = tx.send(Ok(self.answer));
        }
        for tx in self.pending_writes.lock().drain(..) {
            let _ = tx.send(Ok(()));
        }
    }
}

// =============================================================================
// 1. NO FALSE NEGATIVES
// =============================================================================

#[tokio::test]
async fn test_no_false_negatives_after_acknowledged_inserts() {
    let backend = InMemoryBitStore::new();
    let filter = filter_on(&backend, "users");
    let elements: Vec<String> = (0..1000).map(|i| format!("user_{:04x}", i)).collect();

    for element in &elements {
        filter.try_insert(element.as_str()).await.unwrap();
    }

    for element in &elements {
        assert!(
            filter.might_contain(element.as_str()).await,
            "False negative for {}",
            element
        );
    }
}

#[tokio::test]
async fn test_inserts_visible_to_other_clients() {
    let backend = InMemoryBitStore::new();
    let writer = filter_on(&backend, "shared");
    let reader = filter_on(&backend, "shared");

    writer.insert("order-1");
    writer.try_insert("order-2").await.unwrap();

    assert!(reader.might_contain("order-1").await);
    assert!(reader.might_contain("order-2").await);
}

// =============================================================================
// 2. BOUNDED FALSE POSITIVES
// =============================================================================

#[tokio::test]
async fn test_false_positive_rate_bounded() {
    let target_fpr = 0.01;
    let n = 1_000;
    let backend = InMemoryBitStore::new();
    let filter: RemoteBloomFilter<str, _> =
        RemoteBloomFilter::new(&config("fpr", n, target_fpr), backend.connect()).unwrap();

    for i in 0..n {
        filter.insert(format!("inserted_{}", i).as_str());
    }

    let mut rng = rand::thread_rng();
    let samples = 20_000;
    let mut false_positives = 0;
    for _ in 0..samples {
        let probe = format!("probe_{:032x}", rng.gen::<u128>());
        if filter.might_contain(probe.as_str()).await {
            false_positives += 1;
        }
    }

    let actual_fpr = false_positives as f64 / samples as f64;
    assert!(
        actual_fpr <= target_fpr * 1.5,
        "Actual FPR {} exceeds 1.5 * target {}",
        actual_fpr,
        target_fpr
    );
}

// =============================================================================
// 3. IDEMPOTENT INSERT
// =============================================================================

#[tokio::test]
async fn test_insert_twice_leaves_same_bits() {
    let backend = InMemoryBitStore::new();
    let filter = filter_on(&backend, "idem");

    filter.insert("repeat");
    let once = backend.raw_bytes("idem");
    filter.insert("repeat");
    let twice = backend.raw_bytes("idem");

    assert_eq!(once, twice);
    assert!(backend.count_ones("idem") <= filter.strategy().hash_count() as usize);
}

// =============================================================================
// 4. AND-REDUCTION
// =============================================================================

#[tokio::test]
async fn test_partial_bits_read_as_absent() {
    let backend = InMemoryBitStore::new();
    let filter = filter_on(&backend, "partial");
    let positions = filter.strategy().positions("half-written");

    // A racing insert that has landed every bit but one
    let withheld = *positions.last().unwrap();
    let landed: Vec<_> = positions.iter().copied().filter(|&p| p != withheld).collect();
    filter.store().set_bits(&landed);
    assert!(!filter.might_contain("half-written").await);

    filter.store().set_bits(&[withheld]);
    assert!(filter.might_contain("half-written").await);
}

#[tokio::test]
async fn test_failed_read_never_reads_present() {
    let backend = InMemoryBitStore::new();
    let filter = filter_on(&backend, "fail-one");
    filter.insert("present");
    let positions = filter.strategy().positions("present");

    filter.store().connection().fail_read_at(positions[0]);

    assert!(!filter.might_contain("present").await);
    assert!(
        !filter
            .might_contain_timeout("present", Duration::from_secs(1))
            .await
    );
    assert!(matches!(
        filter.might_contain_async("present").await,
        Err(StoreError::CommandError(_))
    ));
}

#[tokio::test]
async fn test_missing_reply_never_reads_present() {
    let backend = InMemoryBitStore::new();
    let filter = filter_on(&backend, "drop-one");
    filter.insert("present");
    let positions = filter.strategy().positions("present");

    filter
        .store()
        .connection()
        .drop_read_at(*positions.last().unwrap());

    assert!(!filter.might_contain("present").await);
    assert_eq!(
        filter.might_contain_async("present").await,
        Err(StoreError::Interrupted)
    );
}

#[tokio::test]
async fn test_mock_reads_reduce_by_and() {
    let strategy = HashedIndexStrategy::<str>::new(100, 0.01).unwrap();

    let all_set = RemoteBloomFilter::<str, _, _>::with_strategy(
        BitVectorHandle::new("mock"),
        strategy.clone(),
        CountingConnection::new(true),
    );
    let all_clear = RemoteBloomFilter::<str, _, _>::with_strategy(
        BitVectorHandle::new("mock"),
        strategy,
        CountingConnection::new(false),
    );

    assert!(all_set.might_contain("anything").await);
    assert!(!all_clear.might_contain("anything").await);
}

// =============================================================================
// 5. TIMEOUT FALLBACK
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_slow_store_answers_absent_within_bound() {
    init_tracing();
    let backend = InMemoryBitStore::new();
    let filter = filter_on(&backend, "slow");
    filter.try_insert("present").await.unwrap();

    filter
        .store()
        .connection()
        .set_latency(Some(Duration::from_millis(500)));

    let started = tokio::time::Instant::now();
    let found = filter
        .might_contain_timeout("present", Duration::from_millis(50))
        .await;

    assert!(!found, "Timed-out query must answer absent");
    assert!(started.elapsed() <= Duration::from_millis(55));

    // Given enough time the same query succeeds
    assert!(
        filter
            .might_contain_timeout("present", Duration::from_secs(1))
            .await
    );
}

#[tokio::test(start_paused = true)]
async fn test_default_bound_applies_to_might_contain() {
    let backend = InMemoryBitStore::new();
    let filter = filter_on(&backend, "slow-default")
        .with_default_timeout(Some(Duration::from_millis(100)));
    filter.try_insert("present").await.unwrap();
    filter
        .store()
        .connection()
        .set_latency(Some(Duration::from_secs(10)));

    let started = tokio::time::Instant::now();
    assert!(!filter.might_contain("present").await);
    assert!(started.elapsed() < Duration::from_secs(1));
}

// =============================================================================
// 6. BATCHING
// =============================================================================

#[tokio::test]
async fn test_one_flush_per_insert_and_query() {
    for (n, fpr) in [(10, 0.1), (1_000, 0.01), (1_000, 1e-6)] {
        let strategy = HashedIndexStrategy::<str>::new(n, fpr).unwrap();
        let k = strategy.hash_count();
        let connection = Arc::new(CountingConnection::new(true));
        let filter = RemoteBloomFilter::<str, _, _>::with_strategy(
            BitVectorHandle::new("batch"),
            strategy,
            Arc::clone(&connection),
        );

        filter.insert("a");
        assert_eq!(connection.flushes(), 1, "k={}", k);

        filter.try_insert("b").await.unwrap();
        assert_eq!(connection.flushes(), 2, "k={}", k);

        assert!(filter.might_contain("a").await);
        assert_eq!(connection.flushes(), 3, "k={}", k);

        let _ = filter.might_contain_async("a").await;
        assert_eq!(connection.flushes(), 4, "k={}", k);
    }
}

#[tokio::test]
async fn test_k_commands_per_flush() {
    let backend = InMemoryBitStore::new();
    let filter = filter_on(&backend, "cmds");
    let k = filter.strategy().hash_count() as u64;
    let connection = filter.store().connection();

    filter.insert("x");
    assert_eq!(connection.commands_sent(), k);
    assert!(filter.might_contain("x").await);
    assert_eq!(connection.commands_sent(), 2 * k);
    assert_eq!(connection.flush_count(), 2);
}

// =============================================================================
// 7. ASYNC PASSTHROUGH
// =============================================================================

#[tokio::test]
async fn test_async_api_surfaces_backend_failure() {
    init_tracing();
    let backend = InMemoryBitStore::new();
    let filter = filter_on(&backend, "down");
    filter.insert("present");
    filter.store().connection().fail_all(true);

    let result = filter.might_contain_async("present").await;
    assert!(matches!(result, Err(StoreError::ConnectionError(_))));

    // The synchronous-style APIs swallow the same failure
    assert!(!filter.might_contain("present").await);
}

#[tokio::test]
async fn test_async_api_through_trait_object() {
    let backend = InMemoryBitStore::new();
    let filter: Arc<dyn MembershipFilter<str>> = Arc::new(filter_on(&backend, "dyn"));

    filter.insert("present");
    assert_eq!(filter.might_contain_async("present").await, Ok(true));
    assert!(filter.might_contain_async("absent-element").await.is_ok());
}
