//! Controller transports.
//!
//! A transport carries three logical channels: commands to the controller,
//! status snapshots from it, and operator messages from it. The session
//! only ever talks to the [`Transport`] trait; which implementation sits
//! behind it is decided by configuration.

pub mod pubsub;
pub mod shm;
pub mod wire;

use std::time::{Duration, Instant};

use copilot_common::command::CommandMessage;
use copilot_common::config::{ControllerConfig, DebugFlags, TransportKind};
use copilot_common::message::OperatorMessage;
use copilot_common::status::StatusSnapshot;
use tracing::{info, trace, warn};

use crate::error::{ConnectError, TransportError};

pub use pubsub::PubSubTransport;
pub use shm::ShmTransport;

/// Outcome of a non-blocking status poll.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusPoll {
    /// A snapshot newer than the last one returned.
    New(Box<StatusSnapshot>),
    /// Nothing published since the last poll.
    Unchanged,
}

/// Channel triple to one controller instance.
///
/// Every method is non-blocking. `open` is all-or-nothing: on failure no
/// channel stays open.
pub trait Transport: Send {
    /// Short name for logs.
    fn kind(&self) -> &'static str;

    /// One attempt to open command, status and error channels.
    fn open(&mut self) -> Result<(), TransportError>;

    fn is_open(&self) -> bool;

    fn close(&mut self);

    /// Hand one command to the controller.
    fn send(&mut self, message: &CommandMessage) -> Result<(), TransportError>;

    /// Latest status, if anything new was published.
    fn poll_status(&mut self) -> Result<StatusPoll, TransportError>;

    /// Next pending operator message, one per call.
    fn poll_error(&mut self) -> Result<Option<OperatorMessage>, TransportError>;
}

/// Build the transport selected in `[controller]`.
pub fn from_config(config: &ControllerConfig) -> Box<dyn Transport> {
    match config.transport {
        TransportKind::Shm => Box::new(ShmTransport::new(config.shm.clone())),
        TransportKind::PubSub => Box::new(PubSubTransport::new(config.pubsub.clone())),
    }
}

/// Open `transport`, retrying every `retry_interval` until `timeout` is spent.
///
/// At least one attempt is always made. Failed attempts are logged at trace
/// level unless `debug` has [`DebugFlags::CHANNEL`] set. Returns the number
/// of attempts it took.
pub fn connect_with_retry(
    transport: &mut dyn Transport,
    timeout: Duration,
    retry_interval: Duration,
    debug: DebugFlags,
) -> Result<u32, ConnectError> {
    let started = Instant::now();
    let mut remaining = timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let err = match transport.open() {
            Ok(()) => {
                info!(
                    kind = transport.kind(),
                    attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "controller channels open"
                );
                return Ok(attempts);
            }
            Err(err) => err,
        };

        if debug.contains(DebugFlags::CHANNEL) {
            warn!(kind = transport.kind(), attempt = attempts, error = %err, "open failed");
        } else {
            trace!(kind = transport.kind(), attempt = attempts, error = %err, "open failed");
        }

        std::thread::sleep(retry_interval);
        remaining = remaining.saturating_sub(retry_interval);
        if remaining.is_zero() {
            return Err(ConnectError::Exhausted {
                kind: transport.kind(),
                attempts,
                elapsed: started.elapsed(),
                last: err,
            });
        }
    }
}
