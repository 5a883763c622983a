//! Identity of one remote bit vector

use std::fmt;
use std::sync::Arc;

/// Index into the conceptual bit vector, in `[0, m)`
pub type BitPosition = u64;

/// Names one remote bit vector (the store key).
///
/// Immutable once a filter is built. Any number of filters, in any number of
/// processes, may address the same handle; they then observe the same bits.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BitVectorHandle(Arc<str>);

impl BitVectorHandle {
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    /// The store key addressed by every command on this vector
    pub fn key(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BitVectorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BitVectorHandle {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for BitVectorHandle {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_exposes_key() {
        let handle = BitVectorHandle::new("users:seen");
        assert_eq!(handle.key(), "users:seen");
        assert_eq!(handle.to_string(), "users:seen");
    }

    #[test]
    fn test_clones_address_same_vector() {
        let a = BitVectorHandle::from("bf");
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(BitVectorHandle::from(String::from("bf")), a);
    }
}
