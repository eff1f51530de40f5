//! Error types for transports and sessions.

use std::time::Duration;

use copilot_common::status::TaskState;
use copilot_shared_memory::ShmError;
use thiserror::Error;

/// Failure of a single transport operation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Operation attempted before `open()` succeeded.
    #[error("transport is not open")]
    NotOpen,

    /// The controller has not consumed the previous command yet.
    #[error("command channel full: previous command not yet consumed")]
    ChannelFull,

    /// Shared-memory channel failure.
    #[error("shared memory: {0}")]
    Shm(#[from] ShmError),

    /// ZeroMQ failure on a pub/sub endpoint.
    #[error("zmq {endpoint}: {source}")]
    Zmq {
        endpoint: String,
        #[source]
        source: zmq::Error,
    },

    /// Payload could not be encoded or decoded.
    #[error("codec: {0}")]
    Codec(#[from] bincode::Error),

    /// A frame arrived that is not valid on this channel.
    #[error("malformed frame: {reason}")]
    MalformedFrame { reason: String },

    /// A message type tag this client does not know.
    #[error("unrecognized message type {tag}")]
    UnrecognizedMessage { tag: u32 },
}

impl TransportError {
    pub(crate) fn zmq(endpoint: &str, source: zmq::Error) -> Self {
        Self::Zmq {
            endpoint: endpoint.to_string(),
            source,
        }
    }
}

/// Connecting did not produce a usable channel within the budget.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The transport never opened.
    #[error("{kind} transport did not open after {attempts} attempts in {elapsed:?}: {last}")]
    Exhausted {
        kind: &'static str,
        attempts: u32,
        elapsed: Duration,
        #[source]
        last: TransportError,
    },

    /// The transport opened but no status snapshot arrived.
    #[error("{kind} transport opened but published no status within {waited:?}")]
    NoStatus { kind: &'static str, waited: Duration },
}

/// A command's preconditions do not hold; nothing was sent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("joint jog requested while trajectory mode is teleop")]
    JointJogInTeleop,

    #[error("axis jog requested while trajectory mode is not teleop")]
    AxisJogOutsideTeleop,

    #[error("joint {joint} out of range (machine has {count} joints)")]
    JointOutOfRange { joint: i32, count: usize },

    #[error("axis {axis} out of range (at most {max} axes)")]
    AxisOutOfRange { axis: i32, max: usize },

    #[error("spindle {spindle} out of range (at most {max} spindles)")]
    SpindleOutOfRange { spindle: i32, max: usize },

    #[error("machine must be on, task state is {state:?}")]
    MachineNotOn { state: TaskState },

    #[error("no tool table configured")]
    NoToolTable,
}

/// Failure of a session operation.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No successful `connect()` yet.
    #[error("session is not connected")]
    NotConnected,

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// No status snapshot has supplied the controller's serial yet.
    #[error("controller serial number not known yet")]
    SerialUnknown,

    /// The transport rejected the command; the serial number is unchanged.
    #[error("send failed: {0}")]
    Send(#[source] TransportError),

    /// Status or error channel could not be polled.
    #[error("poll failed: {0}")]
    Poll(#[source] TransportError),

    /// No acknowledgment within the budget. The controller may still have
    /// received the command.
    #[error("command {serial} not acknowledged after {waited:?}")]
    Timeout { serial: i32, waited: Duration },

    /// The controller reported the command as failed.
    #[error("controller reported an error for command {serial}")]
    Controller { serial: i32 },

    /// The background worker has shut down.
    #[error("session worker stopped")]
    WorkerStopped,
}

/// Integer status for callers that speak 0 / -1.
pub fn status_code<T>(result: &Result<T, SessionError>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(_) => -1,
    }
}
