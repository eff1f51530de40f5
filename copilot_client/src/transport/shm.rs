//! Shared-memory transport.
//!
//! The controller creates three segments in one directory. The client
//! attaches as the writer of the command mailbox, as a peeking reader of
//! the status slot, and as the consuming reader of the error mailbox.

use copilot_common::command::CommandMessage;
use copilot_common::config::ShmChannelConfig;
use copilot_common::message::{MessageKind, OperatorMessage};
use copilot_common::status::{STATUS_TAG, StatusSnapshot};
use copilot_shared_memory::{SegmentReader, SegmentWriter, ShmError};
use tracing::{debug, trace};

use super::{StatusPoll, Transport};
use crate::error::TransportError;

struct Channels {
    command: SegmentWriter,
    status: SegmentReader,
    error: SegmentReader,
}

/// Transport over memory-mapped channel segments.
pub struct ShmTransport {
    config: ShmChannelConfig,
    channels: Option<Channels>,
}

impl ShmTransport {
    pub fn new(config: ShmChannelConfig) -> Self {
        Self {
            config,
            channels: None,
        }
    }

    fn channels(&mut self) -> Result<&mut Channels, TransportError> {
        self.channels.as_mut().ok_or(TransportError::NotOpen)
    }
}

impl Transport for ShmTransport {
    fn kind(&self) -> &'static str {
        "shm"
    }

    fn open(&mut self) -> Result<(), TransportError> {
        if self.channels.is_some() {
            return Ok(());
        }
        let dir = &self.config.dir;
        let command = SegmentWriter::attach(dir, &self.config.command)?;
        let status = SegmentReader::attach(dir, &self.config.status)?;
        let error = SegmentReader::attach(dir, &self.config.error)?;
        debug!(dir = %dir.display(), "shared-memory channels attached");

        self.channels = Some(Channels {
            command,
            status,
            error,
        });
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.channels.is_some()
    }

    fn close(&mut self) {
        if self.channels.take().is_some() {
            debug!("shared-memory channels detached");
        }
    }

    fn send(&mut self, message: &CommandMessage) -> Result<(), TransportError> {
        let channels = self.channels()?;
        let bytes = bincode::serialize(message)?;
        match channels.command.post(message.type_tag(), &bytes) {
            Ok(()) => {
                trace!(serial = message.serial_number, tag = message.type_tag(), "command posted");
                Ok(())
            }
            Err(ShmError::ChannelFull { .. }) => Err(TransportError::ChannelFull),
            Err(e) => Err(e.into()),
        }
    }

    fn poll_status(&mut self) -> Result<StatusPoll, TransportError> {
        let channels = self.channels()?;
        if !channels.status.has_changed() {
            return Ok(StatusPoll::Unchanged);
        }
        let frame = channels.status.read()?;
        if frame.tag != STATUS_TAG {
            return Err(TransportError::UnrecognizedMessage { tag: frame.tag });
        }
        let snapshot: StatusSnapshot = bincode::deserialize(frame.payload)?;
        Ok(StatusPoll::New(Box::new(snapshot)))
    }

    fn poll_error(&mut self) -> Result<Option<OperatorMessage>, TransportError> {
        let channels = self.channels()?;
        if !channels.error.is_pending() {
            return Ok(None);
        }
        let decoded = {
            let frame = channels.error.read()?;
            MessageKind::from_tag(frame.tag)
                .map(|kind| (kind, bincode::deserialize::<String>(frame.payload)))
                .ok_or(frame.tag)
        };
        // Consume even undecodable messages so the mailbox keeps flowing.
        channels.error.acknowledge();

        match decoded {
            Ok((kind, text)) => Ok(Some(OperatorMessage { kind, text: text? })),
            Err(tag) => Err(TransportError::UnrecognizedMessage { tag }),
        }
    }
}
