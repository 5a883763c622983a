//! Remote Bloom Filter
//!
//! Binds an index strategy to a batched bit store. The only persistent
//! state is the remote bit vector; every call is a stateless round-trip.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use tracing::info;

use super::aggregator::MembershipAggregator;
use super::batch_bit_store::BatchBitStore;
use crate::domain::{
    BitIndexStrategy, BitPosition, BitVectorHandle, ElementMapper, FilterConfig,
    HashedIndexStrategy, DEFAULT_QUERY_TIMEOUT_MS,
};
use crate::error::FilterError;
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::ports::{MembershipFilter, MembershipFuture, PipelinedBitConnection};

/// Bloom filter whose bits live in a shared remote bit store
///
/// Implements the `MembershipFilter` port over any `PipelinedBitConnection`.
pub struct RemoteBloomFilter<T: ?Sized, C, S = HashedIndexStrategy<T>> {
    store: BatchBitStore<C>,
    strategy: S,
    aggregator: MembershipAggregator,
    metrics: Arc<dyn MetricsRecorder>,
    /// Bound used by `might_contain`; `None` waits indefinitely
    default_timeout: Option<Duration>,
    _element: PhantomData<fn(&T)>,
}

impl<T, C> RemoteBloomFilter<T, C>
where
    T: AsRef<[u8]> + ?Sized + 'static,
    C: PipelinedBitConnection,
{
    /// Create a filter for byte-like elements from a validated configuration
    pub fn new(config: &FilterConfig, connection: C) -> Result<Self, FilterError> {
        config.validate()?;
        let strategy =
            HashedIndexStrategy::new(config.expected_elements, config.false_positive_rate)?;

        Ok(
            Self::with_strategy(BitVectorHandle::new(config.key.as_str()), strategy, connection)
                .with_default_timeout(config.query_timeout()),
        )
    }
}

impl<T, C> RemoteBloomFilter<T, C>
where
    T: ?Sized,
    C: PipelinedBitConnection,
{
    /// Create a filter whose elements are hashed through `mapper`
    pub fn with_mapper(
        config: &FilterConfig,
        mapper: ElementMapper<T>,
        connection: C,
    ) -> Result<Self, FilterError> {
        config.validate()?;
        let strategy = HashedIndexStrategy::with_mapper(
            config.expected_elements,
            config.false_positive_rate,
            mapper,
        )?;

        Ok(
            Self::with_strategy(BitVectorHandle::new(config.key.as_str()), strategy, connection)
                .with_default_timeout(config.query_timeout()),
        )
    }
}

impl<T, C, S> RemoteBloomFilter<T, C, S>
where
    T: ?Sized,
    C: PipelinedBitConnection,
    S: BitIndexStrategy<T>,
{
    /// Create a filter from an explicit handle and strategy
    pub fn with_strategy(handle: BitVectorHandle, strategy: S, connection: C) -> Self {
        info!(
            key = %handle,
            size_bits = strategy.bit_size(),
            hash_count = strategy.hash_count(),
            "Remote Bloom filter bound"
        );

        Self {
            store: BatchBitStore::new(handle, connection),
            strategy,
            aggregator: MembershipAggregator::default(),
            metrics: Arc::new(NoOpMetrics),
            default_timeout: Some(Duration::from_millis(DEFAULT_QUERY_TIMEOUT_MS)),
            _element: PhantomData,
        }
    }

    /// Attach a metrics recorder; the filter registers itself with it
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        metrics.filter_bound();
        self.store = self.store.with_metrics(Arc::clone(&metrics));
        self.aggregator = MembershipAggregator::new(Arc::clone(&metrics));
        self.metrics = metrics;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn handle(&self) -> &BitVectorHandle {
        self.store.handle()
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn store(&self) -> &BatchBitStore<C> {
        &self.store
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// Set every bit of `element`. Write failures are not observed.
    pub fn insert(&self, element: &T) {
        let start = Instant::now();
        let positions = self.strategy.positions(element);
        self.store.set_bits(&positions);
        self.metrics.insert_sent(start.elapsed());
    }

    /// Set every bit of `element` and wait for every write to be acknowledged
    pub async fn try_insert(&self, element: &T) -> Result<(), FilterError> {
        let start = Instant::now();
        let positions = self.strategy.positions(element);
        self.store.set_bits_acked(&positions).await?;
        self.metrics.insert_sent(start.elapsed());
        Ok(())
    }

    /// Test membership with the default bound; `false` on any failure
    pub async fn might_contain(&self, element: &T) -> bool {
        let positions = self.strategy.positions(element);
        self.contains_positions(&positions).await
    }

    /// Test membership, answering `false` if the store has not replied
    /// within `timeout`
    pub async fn might_contain_timeout(&self, element: &T, timeout: Duration) -> bool {
        self.aggregator
            .await_bounded(self.might_contain_async(element), timeout)
            .await
    }

    /// Unresolved membership answer; store errors propagate to the caller
    pub fn might_contain_async(&self, element: &T) -> MembershipFuture {
        let positions = self.strategy.positions(element);
        self.contains_positions_async(&positions)
    }

    /// Test precomputed positions with the default bound; `false` on failure
    pub async fn contains_positions(&self, positions: &[BitPosition]) -> bool {
        let aggregate = self.contains_positions_async(positions);
        match self.default_timeout {
            Some(timeout) => self.aggregator.await_bounded(aggregate, timeout).await,
            None => self.aggregator.await_unbounded(aggregate).await,
        }
    }

    /// Read precomputed positions as one batch and AND the results
    pub fn contains_positions_async(&self, positions: &[BitPosition]) -> MembershipFuture {
        let start = Instant::now();
        let metrics = Arc::clone(&self.metrics);

        MembershipAggregator::reduce_and(self.store.get_bits(positions))
            .inspect(move |result| {
                if let Ok(found) = result {
                    metrics.query_resolved(start.elapsed(), *found);
                }
            })
            .boxed()
    }
}

#[async_trait]
impl<T, C, S> MembershipFilter<T> for RemoteBloomFilter<T, C, S>
where
    T: ?Sized + Sync,
    C: PipelinedBitConnection,
    S: BitIndexStrategy<T>,
{
    fn insert(&self, element: &T) {
        RemoteBloomFilter::insert(self, element)
    }

    async fn try_insert(&self, element: &T) -> Result<(), FilterError> {
        RemoteBloomFilter::try_insert(self, element).await
    }

    async fn might_contain(&self, element: &T) -> bool {
        RemoteBloomFilter::might_contain(self, element).await
    }

    async fn might_contain_timeout(&self, element: &T, timeout: Duration) -> bool {
        RemoteBloomFilter::might_contain_timeout(self, element, timeout).await
    }

    fn might_contain_async(&self, element: &T) -> MembershipFuture {
        RemoteBloomFilter::might_contain_async(self, element)
    }

    fn handle(&self) -> &BitVectorHandle {
        RemoteBloomFilter::handle(self)
    }
}
