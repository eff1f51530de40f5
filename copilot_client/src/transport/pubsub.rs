//! Publish/subscribe transport over ZeroMQ.
//!
//! The controller binds three endpoints: a PULL socket taking commands and
//! two PUB sockets (status, operator messages). The client connects a PUSH
//! socket to the first and a SUB socket, subscribed to everything, to each
//! publisher. Every call is `DONTWAIT`; the status subscription is drained
//! on each poll and only the newest frame is kept.

use copilot_common::command::CommandMessage;
use copilot_common::config::PubSubConfig;
use copilot_common::consts::STATUS_RECV_HWM;
use copilot_common::message::{MessageKind, OperatorMessage};
use copilot_common::status::StatusSnapshot;
use tracing::{debug, trace, warn};

use super::wire::{self, Frame};
use super::{StatusPoll, Transport};
use crate::error::TransportError;

struct Sockets {
    command: zmq::Socket,
    status: zmq::Socket,
    error: zmq::Socket,
}

/// Transport over ZeroMQ PUSH/SUB sockets with bincode frames.
pub struct PubSubTransport {
    config: PubSubConfig,
    sockets: Option<Sockets>,
    context: zmq::Context,
}

impl PubSubTransport {
    pub fn new(config: PubSubConfig) -> Self {
        Self {
            config,
            sockets: None,
            context: zmq::Context::new(),
        }
    }
}

/// Create a socket of `kind`, apply `setup`, then connect it to `endpoint`.
fn connect(
    context: &zmq::Context,
    kind: zmq::SocketType,
    endpoint: &str,
    setup: impl FnOnce(&zmq::Socket) -> zmq::Result<()>,
) -> Result<zmq::Socket, TransportError> {
    let err = |e| TransportError::zmq(endpoint, e);
    let socket = context.socket(kind).map_err(err)?;
    // Unsent commands must not hold up close().
    socket.set_linger(0).map_err(err)?;
    setup(&socket).map_err(err)?;
    socket.connect(endpoint).map_err(err)?;
    Ok(socket)
}

/// One message, or `None` if nothing is queued.
fn try_recv(socket: &zmq::Socket, endpoint: &str) -> Result<Option<Vec<u8>>, TransportError> {
    match socket.recv_bytes(zmq::DONTWAIT) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(zmq::Error::EAGAIN) => Ok(None),
        Err(e) => Err(TransportError::zmq(endpoint, e)),
    }
}

impl Transport for PubSubTransport {
    fn kind(&self) -> &'static str {
        "pubsub"
    }

    fn open(&mut self) -> Result<(), TransportError> {
        if self.sockets.is_some() {
            return Ok(());
        }
        let cfg = &self.config;

        let command = connect(&self.context, zmq::PUSH, &cfg.command_endpoint, |_| Ok(()))?;
        let status = connect(&self.context, zmq::SUB, &cfg.status_endpoint, |s| {
            s.set_rcvhwm(STATUS_RECV_HWM)?;
            s.set_subscribe(b"")
        })?;
        let error = connect(&self.context, zmq::SUB, &cfg.error_endpoint, |s| {
            s.set_subscribe(b"")
        })?;
        debug!(
            command = %cfg.command_endpoint,
            status = %cfg.status_endpoint,
            error = %cfg.error_endpoint,
            "pub/sub sockets connected"
        );

        self.sockets = Some(Sockets {
            command,
            status,
            error,
        });
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.sockets.is_some()
    }

    fn close(&mut self) {
        if self.sockets.take().is_some() {
            debug!("pub/sub sockets closed");
        }
    }

    fn send(&mut self, message: &CommandMessage) -> Result<(), TransportError> {
        let sockets = self.sockets.as_ref().ok_or(TransportError::NotOpen)?;
        let bytes = wire::encode(&Frame::Command(message.clone()))?;
        let len = bytes.len();
        match sockets.command.send(bytes, zmq::DONTWAIT) {
            Ok(()) => {
                trace!(serial = message.serial_number, len, "command sent");
                Ok(())
            }
            // Queue at its high-water mark.
            Err(zmq::Error::EAGAIN) => Err(TransportError::ChannelFull),
            Err(e) => Err(TransportError::zmq(&self.config.command_endpoint, e)),
        }
    }

    /// Drains every queued message and keeps the newest status.
    fn poll_status(&mut self) -> Result<StatusPoll, TransportError> {
        let sockets = self.sockets.as_ref().ok_or(TransportError::NotOpen)?;
        let endpoint = &self.config.status_endpoint;
        let mut latest = None;
        let mut drained = 0usize;
        let mut rejected = None;

        while let Some(bytes) = try_recv(&sockets.status, endpoint)? {
            drained += 1;
            match wire::decode(&bytes) {
                Ok(Frame::Status(record)) => latest = Some(record),
                Ok(other) => {
                    warn!(frame = other.name(), "unexpected frame on status channel");
                    rejected = Some(TransportError::MalformedFrame {
                        reason: format!("{} frame on status channel", other.name()),
                    });
                }
                Err(e) => {
                    warn!(error = %e, "undecodable status message");
                    rejected = Some(e);
                }
            }
        }

        match (latest, rejected) {
            (Some(record), _) => {
                if drained > 1 {
                    trace!(discarded = drained - 1, "kept latest status");
                }
                Ok(StatusPoll::New(Box::new(StatusSnapshot::try_from(record)?)))
            }
            (None, Some(err)) => Err(err),
            (None, None) => Ok(StatusPoll::Unchanged),
        }
    }

    fn poll_error(&mut self) -> Result<Option<OperatorMessage>, TransportError> {
        let sockets = self.sockets.as_ref().ok_or(TransportError::NotOpen)?;
        let Some(bytes) = try_recv(&sockets.error, &self.config.error_endpoint)? else {
            return Ok(None);
        };
        match wire::decode(&bytes)? {
            Frame::Operator { tag, text } => match MessageKind::from_tag(tag) {
                Some(kind) => Ok(Some(OperatorMessage { kind, text })),
                None => Err(TransportError::UnrecognizedMessage { tag }),
            },
            other => Err(TransportError::MalformedFrame {
                reason: format!("{} frame on error channel", other.name()),
            }),
        }
    }
}
