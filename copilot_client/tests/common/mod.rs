//! Test fixtures: a scriptable in-memory transport and controller-side
//! counterparts for both real transports.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use copilot_client::transport::wire::{self, Frame, StatusRecord};
use copilot_client::{
    Session, SessionError, SessionSettings, StatusPoll, Transport, TransportError,
};
use copilot_common::command::CommandMessage;
use copilot_common::config::{PubSubConfig, ShmChannelConfig};
use copilot_common::message::{OPERATOR_TEXT_TAG, OperatorMessage};
use copilot_common::status::{ExecStatus, STATUS_TAG, StatusSnapshot, TaskState};
use copilot_shared_memory::{SegmentReader, SegmentWriter};
use parking_lot::Mutex;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Mock transport
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockState {
    pub open: bool,
    /// Number of `open` calls that fail before one succeeds.
    pub open_failures: u32,
    pub never_opens: bool,
    pub open_attempts: u32,
    pub sent: Vec<CommandMessage>,
    pub fail_sends: bool,
    /// Polls answered `Unchanged` before the queue is served.
    pub silent_polls: u32,
    /// Snapshots handed out one per poll.
    pub statuses: VecDeque<StatusSnapshot>,
    /// `Err(tag)` simulates an unrecognized message type.
    pub errors: VecDeque<Result<OperatorMessage, u32>>,
    /// When set, every accepted send queues a snapshot echoing its serial.
    pub auto_echo: Option<ExecStatus>,
    /// Template for echoed snapshots.
    pub machine: StatusSnapshot,
}

#[derive(Clone, Default)]
pub struct MockTransport {
    pub state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock whose controller completes every command immediately.
    pub fn echoing(machine: StatusSnapshot) -> Self {
        let mock = Self::new();
        {
            let mut s = mock.state.lock();
            s.auto_echo = Some(ExecStatus::Done);
            s.statuses.push_back(machine.clone());
            s.machine = machine;
        }
        mock
    }

    pub fn push_status(&self, snapshot: StatusSnapshot) {
        self.state.lock().statuses.push_back(snapshot);
    }

    pub fn sent(&self) -> Vec<CommandMessage> {
        self.state.lock().sent.clone()
    }

    pub fn last_sent(&self) -> Option<CommandMessage> {
        self.state.lock().sent.last().cloned()
    }
}

impl Transport for MockTransport {
    fn kind(&self) -> &'static str {
        "mock"
    }

    fn open(&mut self) -> Result<(), TransportError> {
        let mut s = self.state.lock();
        s.open_attempts += 1;
        if s.never_opens {
            return Err(TransportError::NotOpen);
        }
        if s.open_failures > 0 {
            s.open_failures -= 1;
            return Err(TransportError::NotOpen);
        }
        s.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn close(&mut self) {
        self.state.lock().open = false;
    }

    fn send(&mut self, message: &CommandMessage) -> Result<(), TransportError> {
        let mut s = self.state.lock();
        if !s.open {
            return Err(TransportError::NotOpen);
        }
        if s.fail_sends {
            return Err(TransportError::ChannelFull);
        }
        s.sent.push(message.clone());
        if let Some(status) = s.auto_echo {
            let mut echo = s.machine.clone();
            echo.echo_serial_number = message.serial_number;
            echo.status = status;
            s.statuses.push_back(echo);
        }
        Ok(())
    }

    fn poll_status(&mut self) -> Result<StatusPoll, TransportError> {
        let mut s = self.state.lock();
        if !s.open {
            return Err(TransportError::NotOpen);
        }
        if s.silent_polls > 0 {
            s.silent_polls -= 1;
            return Ok(StatusPoll::Unchanged);
        }
        Ok(match s.statuses.pop_front() {
            Some(snapshot) => StatusPoll::New(Box::new(snapshot)),
            None => StatusPoll::Unchanged,
        })
    }

    fn poll_error(&mut self) -> Result<Option<OperatorMessage>, TransportError> {
        let mut s = self.state.lock();
        match s.errors.pop_front() {
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(tag)) => Err(TransportError::UnrecognizedMessage { tag }),
            None => Ok(None),
        }
    }
}

/// Settings with short timings for tests.
pub fn fast_settings() -> SessionSettings {
    SessionSettings {
        poll_interval: Duration::from_millis(10),
        connect_timeout: Duration::from_millis(100),
        retry_interval: Duration::from_millis(10),
        joints: 3,
        ..SessionSettings::default()
    }
}

/// A machine that is on, in free mode, with echo serial `echo`.
pub fn machine_on(echo: i32) -> StatusSnapshot {
    let mut s = StatusSnapshot {
        echo_serial_number: echo,
        ..StatusSnapshot::default()
    };
    s.task.state = TaskState::On;
    s.traj.joints = 3;
    s
}

/// Connected session over `mock`.
pub fn connected(mock: &MockTransport, settings: SessionSettings) -> Session {
    let mut session = Session::new(Box::new(mock.clone()), settings);
    session.connect().expect("mock connect");
    session
}

// ---------------------------------------------------------------------------
// Shared-memory controller
// ---------------------------------------------------------------------------

pub const SEGMENT_SIZE: usize = 64 * 1024;

/// Controller side of the three shared-memory channels.
pub struct ShmController {
    pub command: SegmentReader,
    pub status: SegmentWriter,
    pub error: SegmentWriter,
    command_owner: SegmentWriter,
    pub config: ShmChannelConfig,
    _dir: TempDir,
}

impl ShmController {
    pub fn start() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let config = ShmChannelConfig {
            dir: dir.path().to_path_buf(),
            ..ShmChannelConfig::default()
        };
        let command_owner =
            SegmentWriter::create(&config.dir, &config.command, SEGMENT_SIZE).expect("command");
        let status =
            SegmentWriter::create(&config.dir, &config.status, SEGMENT_SIZE).expect("status");
        let error =
            SegmentWriter::create(&config.dir, &config.error, SEGMENT_SIZE).expect("error");
        let command = SegmentReader::attach(&config.dir, &config.command).expect("command reader");
        Self {
            command,
            status,
            error,
            command_owner,
            config,
            _dir: dir,
        }
    }

    pub fn publish_status(&mut self, snapshot: &StatusSnapshot) {
        let bytes = bincode::serialize(snapshot).expect("encode status");
        self.status.write(STATUS_TAG, &bytes).expect("write status");
    }

    pub fn post_message(&mut self, tag: u32, text: &str) {
        let bytes = bincode::serialize(&text.to_string()).expect("encode text");
        self.error.post(tag, &bytes).expect("post message");
    }

    /// Take the pending command, if any, and free the mailbox.
    pub fn next_command(&mut self) -> Option<CommandMessage> {
        if !self.command.is_pending() {
            return None;
        }
        let message = {
            let frame = self.command.read().expect("read command");
            bincode::deserialize(frame.payload).expect("decode command")
        };
        self.command.acknowledge();
        Some(message)
    }
}

// ---------------------------------------------------------------------------
// Pub/sub controller
// ---------------------------------------------------------------------------

/// Controller side of the ZeroMQ endpoints: PULL for commands, PUB for
/// status and operator messages, all bound to `ipc://` paths in a tempdir.
pub struct PubSubController {
    command: Mutex<zmq::Socket>,
    status: Mutex<zmq::Socket>,
    error: Mutex<zmq::Socket>,
    pub config: PubSubConfig,
    _context: zmq::Context,
    _dir: TempDir,
}

/// Time for in-flight messages to land in the subscriber's queue.
pub const SETTLE: Duration = Duration::from_millis(50);

impl PubSubController {
    pub fn start() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let endpoint = |name: &str| format!("ipc://{}/{name}.ipc", dir.path().display());
        let config = PubSubConfig {
            command_endpoint: endpoint("command"),
            status_endpoint: endpoint("status"),
            error_endpoint: endpoint("error"),
        };
        let context = zmq::Context::new();
        let bind = |kind, endpoint: &str| {
            let socket = context.socket(kind).expect("socket");
            socket.set_linger(0).expect("linger");
            socket.bind(endpoint).expect("bind endpoint");
            socket
        };
        let command = bind(zmq::PULL, &config.command_endpoint);
        command.set_rcvtimeo(2000).expect("receive timeout");
        let status = bind(zmq::PUB, &config.status_endpoint);
        let error = bind(zmq::PUB, &config.error_endpoint);
        Self {
            command: Mutex::new(command),
            status: Mutex::new(status),
            error: Mutex::new(error),
            config,
            _context: context,
            _dir: dir,
        }
    }

    pub fn publish_status(&self, snapshot: &StatusSnapshot) {
        self.publish_frame(&Frame::Status(StatusRecord::from(snapshot)));
    }

    pub fn publish_frame(&self, frame: &Frame) {
        self.publish_raw(&wire::encode(frame).expect("encode"));
    }

    pub fn publish_raw(&self, bytes: &[u8]) {
        self.status.lock().send(bytes, 0).expect("publish status");
    }

    pub fn post_message(&self, tag: u32, text: &str) {
        let frame = Frame::Operator {
            tag,
            text: text.to_string(),
        };
        let bytes = wire::encode(&frame).expect("encode");
        self.error.lock().send(bytes, 0).expect("publish message");
    }

    pub fn next_command(&self) -> CommandMessage {
        let bytes = self.command.lock().recv_bytes(0).expect("command message");
        match wire::decode(&bytes).expect("decode") {
            Frame::Command(message) => message,
            other => panic!("expected command frame, got {}", other.name()),
        }
    }

    /// Publish `snapshot` until `transport` reports it, then drain anything
    /// still in flight. Afterwards the status subscription is live and empty.
    pub fn sync_status(&self, transport: &mut dyn Transport, snapshot: &StatusSnapshot) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            self.publish_status(snapshot);
            std::thread::sleep(Duration::from_millis(5));
            if let StatusPoll::New(_) = transport.poll_status().expect("poll status") {
                break;
            }
            assert!(Instant::now() < deadline, "status subscription never joined");
        }
        std::thread::sleep(SETTLE);
        transport.poll_status().expect("drain status");
    }

    /// Same as [`Self::sync_status`] for the error subscription.
    pub fn sync_errors(&self, transport: &mut dyn Transport) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            self.post_message(OPERATOR_TEXT_TAG, "sync");
            std::thread::sleep(Duration::from_millis(5));
            if transport.poll_error().expect("poll error").is_some() {
                break;
            }
            assert!(Instant::now() < deadline, "error subscription never joined");
        }
        std::thread::sleep(SETTLE);
        while transport.poll_error().expect("drain errors").is_some() {}
    }

    /// Run `session.connect()` while republishing `snapshot`, as a live
    /// controller does, then drain the extra copies.
    pub fn connect_while_publishing(
        &self,
        session: &mut Session,
        snapshot: &StatusSnapshot,
    ) -> Result<(), SessionError> {
        let done = AtomicBool::new(false);
        let result = std::thread::scope(|scope| {
            scope.spawn(|| {
                while !done.load(Ordering::Relaxed) {
                    self.publish_status(snapshot);
                    std::thread::sleep(Duration::from_millis(5));
                }
            });
            let result = session.connect();
            done.store(true, Ordering::Relaxed);
            result
        });
        if result.is_ok() {
            std::thread::sleep(SETTLE);
            session.update_status().expect("drain status");
        }
        result
    }
}

/// Settings for sessions over real sockets.
pub fn pubsub_settings() -> SessionSettings {
    SessionSettings {
        connect_timeout: Duration::from_secs(5),
        timeout: Duration::from_secs(2),
        ..fast_settings()
    }
}
