//! Element to bit-position strategies
//!
//! A strategy is a pure function `element -> [BitPosition; k]`, sized at
//! construction from the predicted cardinality and target false positive
//! rate. Elements reach the hash as bytes through an injected mapper.

use std::fmt;
use std::sync::Arc;

use super::handle::BitPosition;
use super::hash_functions::compute_bit_positions;
use super::parameters::{FilterSizing, MAX_BIT_SIZE};
use crate::error::FilterError;

/// Maps an element to the bytes that get hashed
pub type ElementMapper<T> = Arc<dyn Fn(&T) -> Vec<u8> + Send + Sync>;

/// Turns an element into the ordered bit positions it occupies.
///
/// Implementations must be deterministic: the same element always yields the
/// same positions, in every process.
pub trait BitIndexStrategy<T: ?Sized>: Send + Sync {
    /// Bit positions for `element`, each in `[0, bit_size())`
    fn positions(&self, element: &T) -> Vec<BitPosition>;

    /// Length of the bit vector (m)
    fn bit_size(&self) -> u64;

    /// Positions produced per element (k)
    fn hash_count(&self) -> u32;
}

/// Default strategy: murmur3 double hashing with optimal (m, k)
pub struct HashedIndexStrategy<T: ?Sized> {
    sizing: FilterSizing,
    mapper: ElementMapper<T>,
}

impl<T: ?Sized> HashedIndexStrategy<T> {
    /// Size a strategy for `expected_elements` at `target_fpr`, hashing the
    /// bytes produced by `mapper`.
    pub fn with_mapper(
        expected_elements: u64,
        target_fpr: f64,
        mapper: ElementMapper<T>,
    ) -> Result<Self, FilterError> {
        let sizing = validated_sizing(expected_elements, target_fpr)?;
        Ok(Self { sizing, mapper })
    }

    pub fn sizing(&self) -> &FilterSizing {
        &self.sizing
    }
}

impl<T: AsRef<[u8]> + ?Sized + 'static> HashedIndexStrategy<T> {
    /// Size a strategy for byte-like elements, hashed as-is
    pub fn new(expected_elements: u64, target_fpr: f64) -> Result<Self, FilterError> {
        Self::with_mapper(
            expected_elements,
            target_fpr,
            Arc::new(|element: &T| element.as_ref().to_vec()),
        )
    }
}

/// Validate sizing inputs and derive (m, k)
pub(crate) fn validated_sizing(
    expected_elements: u64,
    target_fpr: f64,
) -> Result<FilterSizing, FilterError> {
    if expected_elements == 0 {
        return Err(FilterError::InvalidParameters(
            "expected_elements must be positive".to_string(),
        ));
    }

    if !(target_fpr > 0.0 && target_fpr < 1.0) {
        return Err(FilterError::InvalidFPR { fpr: target_fpr });
    }

    let sizing = FilterSizing::optimal(expected_elements, target_fpr);
    if sizing.bits > MAX_BIT_SIZE {
        return Err(FilterError::FilterTooLarge {
            size: sizing.bits,
            max: MAX_BIT_SIZE,
        });
    }

    Ok(sizing)
}

impl<T: ?Sized> BitIndexStrategy<T> for HashedIndexStrategy<T> {
    fn positions(&self, element: &T) -> Vec<BitPosition> {
        let bytes = (self.mapper)(element);
        compute_bit_positions(&bytes, self.sizing.hashes, self.sizing.bits)
    }

    fn bit_size(&self) -> u64 {
        self.sizing.bits
    }

    fn hash_count(&self) -> u32 {
        self.sizing.hashes
    }
}

impl<T: ?Sized> Clone for HashedIndexStrategy<T> {
    fn clone(&self) -> Self {
        Self {
            sizing: self.sizing,
            mapper: Arc::clone(&self.mapper),
        }
    }
}

impl<T: ?Sized> fmt::Debug for HashedIndexStrategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedIndexStrategy")
            .field("size_bits", &self.sizing.bits)
            .field("hash_count", &self.sizing.hashes)
            .finish_non_exhaustive()
    }
}
