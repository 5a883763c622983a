//! Hash functions for bit position derivation
//!
//! One MurmurHash3 x64/128 pass per element; its two 64-bit halves drive
//! double hashing. Positions depend only on the element bytes and (k, m),
//! so every process sharing a vector derives the same positions.

use std::io::Cursor;

use super::handle::BitPosition;

/// Hash an element with MurmurHash3 x64/128, split into (low, high) halves
pub fn murmur_hash128(element: &[u8]) -> (u64, u64) {
    let mut cursor = Cursor::new(element);
    // Reading from an in-memory slice cannot fail; the Err arm is unreachable
    let hash = murmur3::murmur3_x64_128(&mut cursor, 0).unwrap_or_default();
    (hash as u64, (hash >> 64) as u64)
}

/// Compute k bit positions in `[0, m)` for an element
///
/// Double hashing: position(i) = (h1 + i * h2) with the sign bit masked.
/// Returns an empty vector when `m == 0`.
pub fn compute_bit_positions(element: &[u8], k: u32, m: u64) -> Vec<BitPosition> {
    if m == 0 {
        return Vec::new();
    }

    let (h1, h2) = murmur_hash128(element);
    let mut combined = h1;

    (0..k)
        .map(|_| {
            let position = (combined & i64::MAX as u64) % m;
            combined = combined.wrapping_add(h2);
            position
        })
        .collect()
}
