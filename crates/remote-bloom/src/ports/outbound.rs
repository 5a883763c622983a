//! Outbound Ports (Driven Ports)
//!
//! The remote bit store the filter depends on. Commands are queued on a
//! pipeline and travel together when `flush` is called; each command gets
//! its own completion, delivered exactly once, in any order.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::domain::BitPosition;
use crate::error::StoreError;

/// In-flight `GETBIT`; resolves to `true` when the bit is 1
pub type PendingRead = BoxFuture<'static, Result<bool, StoreError>>;

/// In-flight `SETBIT`; resolves once the store acknowledges the write
pub type PendingWrite = BoxFuture<'static, Result<(), StoreError>>;

/// Pipelined connection to a remote bit store (Driven Port)
///
/// `set_bit` and `get_bit` only queue; nothing is sent before `flush`.
/// A failure of one queued command must fail only that command's
/// completion. Dropping a pending future abandons the completion but does
/// not cancel the remote command.
pub trait PipelinedBitConnection: Send + Sync {
    /// Queue `SETBIT key position 1`
    fn set_bit(&self, key: &str, position: BitPosition) -> PendingWrite;

    /// Queue `GETBIT key position`
    fn get_bit(&self, key: &str, position: BitPosition) -> PendingRead;

    /// Send every queued command as one batch
    fn flush(&self);
}

impl<C: PipelinedBitConnection + ?Sized> PipelinedBitConnection for Arc<C> {
    fn set_bit(&self, key: &str, position: BitPosition) -> PendingWrite {
        (**self).set_bit(key, position)
    }

    fn get_bit(&self, key: &str, position: BitPosition) -> PendingRead {
        (**self).get_bit(key, position)
    }

    fn flush(&self) {
        (**self).flush()
    }
}
