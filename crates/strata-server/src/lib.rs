//! Strata Service Layer
//!
//! Transport-agnostic produce/consume service over a commit log. This is
//! the layer a wire transport mounts: every handler is a thin adapter
//! around the log's `append` and `read`, plus the mapping from log errors
//! to client-facing statuses. The transport itself (socket handling, TLS,
//! framing) lives outside this crate.
//!
//! ## The `CommitLog` seam
//!
//! Handlers are generic over the [`CommitLog`] trait rather than the
//! concrete [`Log`], so tests can substitute an in-memory implementation
//! and transports can wrap whatever the deployment needs.
//!
//! ## Streaming
//!
//! - [`LogService::produce_stream`] answers a stream of produce requests
//!   with a stream of offsets, in order.
//! - [`LogService::consume_stream`] returns an iterator that follows the
//!   log: it yields every record from the requested offset on, and when it
//!   catches up to the head it polls until the next append lands. Reading
//!   past the current head is how a subscriber tails the log.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use strata_core::{Error, Record, Result};
use strata_log::Log;

/// The two log operations the service needs.
pub trait CommitLog: Send + Sync {
    /// Append a record, returning its assigned offset.
    fn append(&self, record: Record) -> Result<u64>;

    /// Read the record at `offset`.
    fn read(&self, offset: u64) -> Result<Record>;
}

impl CommitLog for Log {
    fn append(&self, record: Record) -> Result<u64> {
        Log::append(self, record)
    }

    fn read(&self, offset: u64) -> Result<Record> {
        Log::read(self, offset)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProduceRequest {
    pub record: Record,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProduceResponse {
    pub offset: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumeRequest {
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeResponse {
    pub record: Record,
}

/// Client-facing status class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Code {
    /// The requested offset is outside the log's range.
    NotFound,
    /// Any other failure.
    Internal,
}

/// Human-readable detail in a specific locale, attached to `NotFound`
/// statuses so clients can surface the message directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedMessage {
    pub locale: String,
    pub message: String,
}

/// Client-facing error produced by the service handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: Code,
    pub message: String,
    pub localized: Option<LocalizedMessage>,
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::OffsetOutOfRange(offset) => Status {
                code: Code::NotFound,
                message: format!("offset out of range: {offset}"),
                localized: Some(LocalizedMessage {
                    locale: "en".to_string(),
                    message: format!(
                        "The requested offset is outside the log's range: {offset}"
                    ),
                }),
            },
            other => Status {
                code: Code::Internal,
                message: other.to_string(),
                localized: None,
            },
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for Status {}

/// How long [`ConsumeStream`] sleeps between polls at the log head.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Produce/consume handlers over a shared commit log.
pub struct LogService<L> {
    log: Arc<L>,
    poll_interval: Duration,
}

impl<L> Clone for LogService<L> {
    fn clone(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
            poll_interval: self.poll_interval,
        }
    }
}

impl<L: CommitLog> LogService<L> {
    pub fn new(log: Arc<L>) -> Self {
        Self {
            log,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the tail-follow poll interval (mostly for tests).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Append one record.
    pub fn produce(&self, req: ProduceRequest) -> std::result::Result<ProduceResponse, Status> {
        let offset = self.log.append(req.record).map_err(Status::from)?;
        Ok(ProduceResponse { offset })
    }

    /// Read one record.
    pub fn consume(&self, req: ConsumeRequest) -> std::result::Result<ConsumeResponse, Status> {
        let record = self.log.read(req.offset).map_err(Status::from)?;
        Ok(ConsumeResponse { record })
    }

    /// Answer a stream of produce requests with a stream of responses, one
    /// per request, in order.
    pub fn produce_stream<'a, I>(
        &'a self,
        requests: I,
    ) -> impl Iterator<Item = std::result::Result<ProduceResponse, Status>> + 'a
    where
        I: IntoIterator<Item = ProduceRequest>,
        I::IntoIter: 'a,
    {
        requests.into_iter().map(move |req| self.produce(req))
    }

    /// Stream every record from `req.offset` on, following the head.
    pub fn consume_stream(&self, req: ConsumeRequest) -> ConsumeStream<L> {
        debug!(offset = req.offset, "starting consume stream");
        ConsumeStream {
            log: Arc::clone(&self.log),
            offset: req.offset,
            poll_interval: self.poll_interval,
        }
    }
}

/// Tail-following record iterator.
///
/// Yields the record at the cursor and advances. At the head of the log it
/// blocks, polling until a new append makes the next offset readable, so
/// the iterator never ends on its own; callers bound it with `take`, a
/// side channel, or by dropping it.
pub struct ConsumeStream<L> {
    log: Arc<L>,
    offset: u64,
    poll_interval: Duration,
}

impl<L: CommitLog> Iterator for ConsumeStream<L> {
    type Item = std::result::Result<ConsumeResponse, Status>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.log.read(self.offset) {
                Ok(record) => {
                    self.offset += 1;
                    return Some(Ok(ConsumeResponse { record }));
                }
                Err(Error::OffsetOutOfRange(_)) => thread::sleep(self.poll_interval),
                Err(err) => return Some(Err(Status::from(err))),
            }
        }
    }
}
