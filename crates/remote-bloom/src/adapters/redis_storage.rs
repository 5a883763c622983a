//! Redis bit store
//!
//! Queues `SETBIT`/`GETBIT` into a `redis::Pipeline` and sends the whole
//! batch over a multiplexed connection on `flush`. Replies are routed back
//! to each command's oneshot completion in queue order.
//!
//! The batch is sent as raw packed commands so every reply keeps its own
//! outcome: a server error fails only the command that caused it, while a
//! transport failure fails the whole batch.

use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use parking_lot::Mutex;
use redis::aio::{ConnectionLike, MultiplexedConnection};
use redis::{RedisError, RedisResult, Value};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::domain::BitPosition;
use crate::error::StoreError;
use crate::ports::{PendingRead, PendingWrite, PipelinedBitConnection};

enum Reply {
    Write(oneshot::Sender<Result<(), StoreError>>),
    Read(oneshot::Sender<Result<bool, StoreError>>),
}

struct Queued {
    pipeline: redis::Pipeline,
    replies: Vec<Reply>,
}

impl Default for Queued {
    fn default() -> Self {
        Self {
            pipeline: redis::pipe(),
            replies: Vec::new(),
        }
    }
}

/// Pipelined bit commands over one multiplexed Redis connection
pub struct RedisBitConnection {
    connection: MultiplexedConnection,
    queued: Mutex<Queued>,
    flushes: AtomicU64,
}

impl RedisBitConnection {
    pub fn new(connection: MultiplexedConnection) -> Self {
        Self {
            connection,
            queued: Mutex::new(Queued::default()),
            flushes: AtomicU64::new(0),
        }
    }

    /// Open a multiplexed connection to `url` (e.g. `redis://127.0.0.1/`)
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(connection_error)?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(connection_error)?;
        Ok(Self::new(connection))
    }

    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }
}

fn connection_error(e: RedisError) -> StoreError {
    StoreError::ConnectionError(e.to_string())
}

impl PipelinedBitConnection for RedisBitConnection {
    fn set_bit(&self, key: &str, position: BitPosition) -> PendingWrite {
        let (reply, rx) = oneshot::channel();
        {
            let mut queued = self.queued.lock();
            queued.pipeline.cmd("SETBIT").arg(key).arg(position).arg(1);
            queued.replies.push(Reply::Write(reply));
        }
        rx.map(|delivered| delivered.unwrap_or(Err(StoreError::Interrupted)))
            .boxed()
    }

    fn get_bit(&self, key: &str, position: BitPosition) -> PendingRead {
        let (reply, rx) = oneshot::channel();
        {
            let mut queued = self.queued.lock();
            queued.pipeline.cmd("GETBIT").arg(key).arg(position);
            queued.replies.push(Reply::Read(reply));
        }
        rx.map(|delivered| delivered.unwrap_or(Err(StoreError::Interrupted)))
            .boxed()
    }

    fn flush(&self) {
        let Queued { pipeline, replies } = std::mem::take(&mut *self.queued.lock());
        self.flushes.fetch_add(1, Ordering::Relaxed);
        if replies.is_empty() {
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("No tokio runtime to send Redis pipeline");
                deliver_error(
                    replies,
                    StoreError::ConnectionError("no tokio runtime".to_string()),
                );
                return;
            }
        };

        let mut connection = self.connection.clone();
        runtime.spawn(async move {
            let count = replies.len();
            debug!(commands = count, "Sending Redis bit pipeline");
            // Raw replies: server errors stay in place as Value::ServerError
            let result = connection.req_packed_commands(&pipeline, 0, count).await;
            route_replies(replies, result);
        });
    }
}

fn route_replies(replies: Vec<Reply>, result: RedisResult<Vec<Value>>) {
    match result {
        Ok(values) if values.len() == replies.len() => {
            for (reply, value) in replies.into_iter().zip(values) {
                deliver(reply, value);
            }
        }
        Ok(values) => {
            warn!(
                expected = replies.len(),
                received = values.len(),
                "Redis pipeline reply count mismatch"
            );
            deliver_error(
                replies,
                StoreError::CommandError("pipeline reply count mismatch".to_string()),
            );
        }
        Err(e) => {
            debug!(error = %e, "Redis pipeline failed");
            let error = if e.is_io_error() || e.is_connection_dropped() {
                StoreError::ConnectionError(e.to_string())
            } else {
                StoreError::CommandError(e.to_string())
            };
            deliver_error(replies, error);
        }
    }
}

fn deliver(reply: Reply, value: Value) {
    match reply {
        Reply::Write(tx) => {
            let _ = tx.send(write_ack(value));
        }
        Reply::Read(tx) => {
            let _ = tx.send(read_bit(value));
        }
    }
}

/// Separate a per-command error reply from a regular value
fn reply_value(value: Value) -> Result<Value, StoreError> {
    match value {
        Value::ServerError(e) => Err(StoreError::CommandError(RedisError::from(e).to_string())),
        value => Ok(value),
    }
}

fn write_ack(value: Value) -> Result<(), StoreError> {
    reply_value(value).map(|_| ())
}

fn read_bit(value: Value) -> Result<bool, StoreError> {
    let value = reply_value(value)?;
    match redis::from_redis_value::<i64>(&value) {
        Ok(0) => Ok(false),
        Ok(1) => Ok(true),
        Ok(other) => Err(StoreError::CommandError(format!("GETBIT replied {}", other))),
        Err(e) => Err(StoreError::CommandError(e.to_string())),
    }
}

fn deliver_error(replies: Vec<Reply>, error: StoreError) {
    for reply in replies {
        match reply {
            Reply::Write(tx) => {
                let _ = tx.send(Err(error.clone()));
            }
            Reply::Read(tx) => {
                let _ = tx.send(Err(error.clone()));
            }
        }
    }
}
