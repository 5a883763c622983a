//! Bit vector sizing
//!
//! For n expected elements at target rate p:
//! - bits   m = floor(-n * ln(p) / ln(2)^2), at least 1
//! - hashes k = round(m / n * ln(2)), clamped to 1..=32

use std::f64::consts::LN_2;

/// Largest bit vector a remote bitmap can address (2^32 bits = 512 MiB)
pub const MAX_BIT_SIZE: u64 = 1 << 32;

/// Default target false positive rate
pub const DEFAULT_FPR: f64 = 0.03;

const MAX_HASHES: u32 = 32;

/// Vector length and hash count chosen for a filter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterSizing {
    /// Bits in the remote vector (m)
    pub bits: u64,
    /// Positions set per element (k)
    pub hashes: u32,
}

impl FilterSizing {
    /// Smallest vector meeting `target_fpr` for `expected_elements`.
    ///
    /// Inputs are not validated here; an empty filter sizes to one bit and
    /// one hash.
    pub fn optimal(expected_elements: u64, target_fpr: f64) -> Self {
        if expected_elements == 0 {
            return Self { bits: 1, hashes: 1 };
        }

        let n = expected_elements as f64;
        let p = target_fpr.max(f64::MIN_POSITIVE);

        let bits = ((-n * p.ln() / (LN_2 * LN_2)) as u64).max(1);
        let hashes = ((bits as f64 / n) * LN_2).round() as u32;

        Self {
            bits,
            hashes: hashes.clamp(1, MAX_HASHES),
        }
    }

    /// Predicted false positive rate once `elements` distinct elements are in
    pub fn fpr_at(&self, elements: u64) -> f64 {
        if self.bits == 0 {
            return 1.0;
        }
        let k = self.hashes as f64;
        let fill = 1.0 - (-k * elements as f64 / self.bits as f64).exp();
        fill.powf(k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thousand_elements_at_one_percent() {
        // m = 9585, k = 7
        let sizing = FilterSizing::optimal(1_000, 0.01);
        assert_eq!(sizing.bits, 9_585);
        assert_eq!(sizing.hashes, 7);
    }

    #[test]
    fn test_default_rate_sizing() {
        let sizing = FilterSizing::optimal(1_000, DEFAULT_FPR);
        assert!((7_250..7_350).contains(&sizing.bits), "m = {}", sizing.bits);
        assert_eq!(sizing.hashes, 5);
    }

    #[test]
    fn test_predicted_rate_close_to_target() {
        for target in [0.1, 0.03, 0.01, 0.001] {
            let sizing = FilterSizing::optimal(10_000, target);
            let predicted = sizing.fpr_at(10_000);
            assert!(
                predicted < target * 1.1,
                "target {} predicted {}",
                target,
                predicted
            );
        }
    }

    #[test]
    fn test_predicted_rate_grows_past_capacity() {
        let sizing = FilterSizing::optimal(100, 0.01);
        assert!(sizing.fpr_at(0) == 0.0);
        assert!(sizing.fpr_at(1_000) > sizing.fpr_at(100));
    }

    #[test]
    fn test_empty_and_tiny_inputs() {
        assert_eq!(FilterSizing::optimal(0, 0.01), FilterSizing { bits: 1, hashes: 1 });

        // p close to 1 would give m = 0
        let sizing = FilterSizing::optimal(1, 0.99);
        assert_eq!(sizing.bits, 1);
        assert_eq!(sizing.hashes, 1);
    }

    #[test]
    fn test_hash_count_capped() {
        let sizing = FilterSizing::optimal(10, 1e-15);
        assert_eq!(sizing.hashes, MAX_HASHES);
    }
}
