//! Ports Layer
//!
//! Defines the interfaces (traits) for:
//! - Driving Ports (inbound) - API for callers
//! - Driven Ports (outbound) - the pipelined remote bit store

pub mod inbound;
pub mod outbound;

pub use inbound::{MembershipFilter, MembershipFuture};
pub use outbound::{PendingRead, PendingWrite, PipelinedBitConnection};
