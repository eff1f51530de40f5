//! The command/status synchronizer.
//!
//! A [`Session`] owns one transport to one controller. Every operator action
//! is one `send_*` method that builds exactly one [`Command`], stamps it with
//! the next serial number and, unless the command is a jog, waits for the
//! controller per the configured [`WaitPolicy`].
//!
//! # Serial numbers
//!
//! [`Session::connect`] does not return until a status snapshot has arrived;
//! the serial starts at that snapshot's echo serial and advances by one on
//! every successful send. A failed send leaves it untouched. Sending before
//! the serial is known fails with [`SessionError::SerialUnknown`].
//!
//! # Status
//!
//! [`Session::status`] returns the cached snapshot and never polls. Call
//! [`Session::update_status`] first; snapshots replace the cache wholesale.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use copilot_common::command::{Command, CommandMessage, JogMode, ToolOffset};
use copilot_common::config::{
    ConfigError, CopilotConfig, DebugFlags, DisplayConfig, FilesConfig, JoggingConfig,
    UpdatePolicy, WaitPolicy,
};
use copilot_common::consts::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_RETRY_INTERVAL,
    DEFAULT_SPINDLE_SPEED, MAX_AXES, MAX_JOINTS, MAX_SPINDLES,
};
use copilot_common::message::{MessageKind, OperatorMessage};
use copilot_common::status::{Pose, StatusSnapshot, TaskMode, TaskState, TrajMode};
use copilot_common::units::{UnitContext, convert_angular, convert_linear};
use tracing::{debug, info, trace, warn};

use crate::error::{ConnectError, SessionError, TransportError, ValidationError};
use crate::messages::OperatorMessages;
use crate::transport::{self, StatusPoll, Transport, connect_with_retry};
use crate::wait::{CommandTracker, TrackerState};

/// Resolved session parameters.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub wait: WaitPolicy,
    /// Wait budget; zero waits forever.
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub update: UpdatePolicy,
    /// Configured joint count; joint indices at or above it are rejected.
    pub joints: usize,
    pub reopen_last_program: bool,
    pub display: DisplayConfig,
    pub jogging: JoggingConfig,
    pub files: FilesConfig,
    pub connect_timeout: Duration,
    pub retry_interval: Duration,
    pub debug: DebugFlags,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            wait: WaitPolicy::default(),
            timeout: Duration::ZERO,
            poll_interval: DEFAULT_POLL_INTERVAL,
            update: UpdatePolicy::default(),
            joints: MAX_JOINTS,
            reopen_last_program: true,
            display: DisplayConfig::default(),
            jogging: JoggingConfig::default(),
            files: FilesConfig::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            debug: DebugFlags::empty(),
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &CopilotConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            wait: config.session.wait,
            timeout: config.session.timeout()?,
            poll_interval: config.session.poll_interval(),
            update: config.session.update,
            joints: config.session.joints,
            reopen_last_program: config.session.reopen_last_program,
            display: config.display,
            jogging: config.jogging.clone(),
            files: config.files.clone(),
            connect_timeout: config.controller.connect_timeout()?,
            retry_interval: config.controller.retry_interval()?,
            debug: config.controller.debug_flags(),
        })
    }
}

/// One logical connection to one controller.
pub struct Session {
    transport: Box<dyn Transport>,
    settings: SessionSettings,
    serial: i32,
    serial_initialised: bool,
    status: StatusSnapshot,
    messages: OperatorMessages,
    last_program: Option<PathBuf>,
    program_start_line: i32,
    connected: bool,
}

impl Session {
    pub fn new(transport: Box<dyn Transport>, settings: SessionSettings) -> Self {
        Self {
            transport,
            settings,
            serial: 0,
            serial_initialised: false,
            status: StatusSnapshot::default(),
            messages: OperatorMessages::new(),
            last_program: None,
            program_start_line: 0,
            connected: false,
        }
    }

    /// Session over the transport selected in `config`. Does not connect.
    pub fn from_config(config: &CopilotConfig) -> Result<Self, ConfigError> {
        let settings = SessionSettings::from_config(config)?;
        Ok(Self::new(transport::from_config(&config.controller), settings))
    }

    // ---- connection ---------------------------------------------------

    /// Open the transport, then wait for the first status snapshot. Both
    /// share the connect timeout; the status is polled at least once.
    pub fn connect(&mut self) -> Result<(), SessionError> {
        let started = Instant::now();
        let budget = self.settings.connect_timeout;
        let attempts = connect_with_retry(
            self.transport.as_mut(),
            budget,
            self.settings.retry_interval,
            self.settings.debug,
        )?;
        self.connected = true;
        self.serial_initialised = false;

        loop {
            match self.update_status() {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => trace!(error = %e, "initial status poll failed"),
            }
            let left = budget.saturating_sub(started.elapsed());
            if left.is_zero() {
                let kind = self.transport.kind();
                warn!(kind, waited = ?started.elapsed(), "no status from controller");
                self.disconnect();
                return Err(ConnectError::NoStatus {
                    kind,
                    waited: started.elapsed(),
                }
                .into());
            }
            std::thread::sleep(left.min(self.settings.poll_interval));
        }
        debug!(
            kind = self.transport.kind(),
            attempts,
            serial = self.serial,
            "session connected"
        );
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if self.connected {
            self.transport.close();
            self.connected = false;
            info!(kind = self.transport.kind(), "session disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn ensure_connected(&self) -> Result<(), SessionError> {
        if self.connected {
            Ok(())
        } else {
            Err(SessionError::NotConnected)
        }
    }

    // ---- accessors ----------------------------------------------------

    /// Cached snapshot from the last successful [`Session::update_status`].
    pub fn status(&self) -> &StatusSnapshot {
        &self.status
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Serial number of the most recent successful send.
    pub fn serial(&self) -> i32 {
        self.serial
    }

    pub fn messages(&self) -> &OperatorMessages {
        &self.messages
    }

    pub fn messages_mut(&mut self) -> &mut OperatorMessages {
        &mut self.messages
    }

    /// Last program requested through [`Session::send_program_open`].
    pub fn last_program(&self) -> Option<&Path> {
        self.last_program.as_deref()
    }

    pub fn program_start_line(&self) -> i32 {
        self.program_start_line
    }

    pub fn transport_kind(&self) -> &'static str {
        self.transport.kind()
    }

    // ---- polling ------------------------------------------------------

    /// Pull the latest snapshot. Returns whether a new one arrived.
    pub fn update_status(&mut self) -> Result<bool, SessionError> {
        self.ensure_connected()?;
        match self.transport.poll_status().map_err(SessionError::Poll)? {
            StatusPoll::New(snapshot) => {
                if !self.serial_initialised {
                    self.serial = snapshot.echo_serial_number;
                    self.serial_initialised = true;
                    debug!(serial = self.serial, "serial initialised from echo");
                }
                self.status = *snapshot;
                Ok(true)
            }
            StatusPoll::Unchanged => Ok(false),
        }
    }

    /// Pull one operator message into its slot. Returns its kind.
    ///
    /// A message with an unknown type tag lands in the error slot as
    /// `unrecognized error type {tag}`.
    pub fn update_error(&mut self) -> Result<Option<MessageKind>, SessionError> {
        self.ensure_connected()?;
        let message = match self.transport.poll_error() {
            Ok(Some(message)) => message,
            Ok(None) => return Ok(None),
            Err(TransportError::UnrecognizedMessage { tag }) => {
                warn!(tag, "unrecognized operator message type");
                OperatorMessage::error(format!("unrecognized error type {tag}"))
            }
            Err(e) => return Err(SessionError::Poll(e)),
        };
        let kind = message.kind;
        match kind {
            MessageKind::Error => warn!(text = %message.text, "operator error"),
            MessageKind::Text | MessageKind::Display => {
                debug!(?kind, text = %message.text, "operator message")
            }
        }
        self.messages.store(message);
        Ok(Some(kind))
    }

    fn refresh_if_auto(&mut self) {
        if self.settings.update == UpdatePolicy::Auto {
            if let Err(e) = self.update_status() {
                debug!(error = %e, "status refresh failed");
            }
        }
    }

    // ---- send / wait --------------------------------------------------

    /// Send `command` with the next serial number. Does not wait.
    ///
    /// Returns the serial assigned. On failure the serial is not advanced.
    pub fn send(&mut self, command: Command) -> Result<i32, SessionError> {
        self.ensure_connected()?;
        if !self.serial_initialised {
            return Err(SessionError::SerialUnknown);
        }
        let serial = self.serial.wrapping_add(1);
        let message = CommandMessage::new(serial, command);
        self.transport.send(&message).map_err(SessionError::Send)?;
        self.serial = serial;

        if self.settings.debug.contains(DebugFlags::TASK_ISSUE) {
            info!(serial, command = message.command.name(), "command issued");
        } else {
            debug!(serial, command = message.command.name(), "command issued");
        }
        Ok(serial)
    }

    /// Tracker for `serial` under this session's wait policy and timeout.
    pub fn tracker(&self, serial: i32) -> CommandTracker {
        CommandTracker::new(serial, self.settings.wait, self.settings.timeout)
    }

    /// Block until `tracker` finishes, polling every poll interval.
    ///
    /// Poll failures are logged and polling continues; only the tracker's
    /// outcome ends the wait.
    pub fn wait(&mut self, tracker: &mut CommandTracker) -> Result<(), SessionError> {
        loop {
            let now = self.poll_tick(tracker);
            if let Some(result) = tracker.result() {
                return result;
            }
            let pause = match tracker.remaining(now) {
                Some(left) => left.min(self.settings.poll_interval),
                None => self.settings.poll_interval,
            };
            std::thread::sleep(pause);
        }
    }

    /// One non-blocking step of a wait: refresh status, advance `tracker`.
    pub fn poll_pending(&mut self, tracker: &mut CommandTracker) -> TrackerState {
        self.poll_tick(tracker);
        tracker.state()
    }

    fn poll_tick(&mut self, tracker: &mut CommandTracker) -> Instant {
        if let Err(e) = self.update_status() {
            trace!(serial = tracker.serial(), error = %e, "status poll failed while waiting");
        }
        tracker.observe(&self.status);
        let now = Instant::now();
        tracker.check_deadline(now);
        now
    }

    /// Send and wait per policy.
    pub fn send_and_wait(&mut self, command: Command) -> Result<(), SessionError> {
        let serial = self.send(command)?;
        self.wait_for(serial)
    }

    fn wait_for(&mut self, serial: i32) -> Result<(), SessionError> {
        let mut tracker = self.tracker(serial);
        self.wait(&mut tracker)
    }

    /// Jogs are sent without waiting; everything else waits per policy.
    fn execute(&mut self, command: Command) -> Result<(), SessionError> {
        if command.is_jog() {
            self.send(command).map(|_| ())
        } else {
            self.send_and_wait(command)
        }
    }

    // ---- validation ---------------------------------------------------

    fn check_joint(&self, joint: i32) -> Result<(), ValidationError> {
        let count = self.settings.joints;
        if joint < 0 || joint as usize >= count {
            return Err(ValidationError::JointOutOfRange { joint, count });
        }
        Ok(())
    }

    /// Negative joint numbers address every joint.
    fn check_joint_or_all(&self, joint: i32) -> Result<(), ValidationError> {
        if joint < 0 { Ok(()) } else { self.check_joint(joint) }
    }

    fn check_spindle(&self, spindle: i32) -> Result<(), ValidationError> {
        if spindle < 0 || spindle as usize >= MAX_SPINDLES {
            return Err(ValidationError::SpindleOutOfRange {
                spindle,
                max: MAX_SPINDLES,
            });
        }
        Ok(())
    }

    fn check_jog(
        &self,
        joint_or_axis: i32,
        mode: JogMode,
        needs_machine_on: bool,
    ) -> Result<(), ValidationError> {
        if needs_machine_on && self.status.task.state != TaskState::On {
            return Err(ValidationError::MachineNotOn {
                state: self.status.task.state,
            });
        }
        let teleop = self.status.traj.mode == TrajMode::Teleop;
        match mode {
            JogMode::Joint => {
                if teleop {
                    return Err(ValidationError::JointJogInTeleop);
                }
                self.check_joint(joint_or_axis)
            }
            JogMode::Teleop => {
                if !teleop {
                    return Err(ValidationError::AxisJogOutsideTeleop);
                }
                if joint_or_axis < 0 || joint_or_axis as usize >= MAX_AXES {
                    return Err(ValidationError::AxisOutOfRange {
                        axis: joint_or_axis,
                        max: MAX_AXES,
                    });
                }
                Ok(())
            }
        }
    }

    /// Per-minute jog speed to a signed per-second velocity.
    fn jog_velocity(&self, joint_or_axis: i32, mode: JogMode, speed_per_min: f64) -> f64 {
        let sign = match mode {
            JogMode::Joint => self.settings.jogging.polarity(joint_or_axis as usize).sign(),
            JogMode::Teleop => 1.0,
        };
        sign * speed_per_min / 60.0
    }

    // ---- task ---------------------------------------------------------

    pub fn send_debug(&mut self, level: u32) -> Result<(), SessionError> {
        self.execute(Command::SetDebug { level })
    }

    pub fn send_estop(&mut self) -> Result<(), SessionError> {
        self.execute(Command::TaskSetState {
            state: TaskState::Estop,
        })
    }

    pub fn send_estop_reset(&mut self) -> Result<(), SessionError> {
        self.execute(Command::TaskSetState {
            state: TaskState::EstopReset,
        })
    }

    pub fn send_machine_on(&mut self) -> Result<(), SessionError> {
        self.execute(Command::TaskSetState {
            state: TaskState::On,
        })
    }

    pub fn send_machine_off(&mut self) -> Result<(), SessionError> {
        self.execute(Command::TaskSetState {
            state: TaskState::Off,
        })
    }

    pub fn send_manual(&mut self) -> Result<(), SessionError> {
        self.execute(Command::TaskSetMode {
            mode: TaskMode::Manual,
        })
    }

    pub fn send_auto(&mut self) -> Result<(), SessionError> {
        self.execute(Command::TaskSetMode {
            mode: TaskMode::Auto,
        })
    }

    pub fn send_mdi(&mut self) -> Result<(), SessionError> {
        self.execute(Command::TaskSetMode {
            mode: TaskMode::Mdi,
        })
    }

    pub fn send_abort(&mut self) -> Result<(), SessionError> {
        self.execute(Command::TaskAbort)
    }

    pub fn send_task_plan_init(&mut self) -> Result<(), SessionError> {
        self.execute(Command::TaskPlanInit)
    }

    /// Open `program` on the controller and remember it for re-opening.
    pub fn send_program_open(&mut self, program: &Path) -> Result<(), SessionError> {
        let file = program.to_string_lossy().into_owned();
        let serial = self.send(Command::TaskPlanOpen { file })?;
        self.last_program = Some(program.to_path_buf());
        self.wait_for(serial)
    }

    /// Run the open program from `line`.
    ///
    /// If the controller has no program open, the last requested one is
    /// opened again first (unless disabled in configuration).
    pub fn send_program_run(&mut self, line: i32) -> Result<(), SessionError> {
        self.refresh_if_auto();
        if !self.status.has_program() && self.settings.reopen_last_program {
            if let Some(program) = self.last_program.clone() {
                info!(program = %program.display(), "no program open, re-opening last");
                self.send_program_open(&program)?;
            }
        }
        self.program_start_line = line;
        self.execute(Command::TaskPlanRun { line })
    }

    pub fn send_program_pause(&mut self) -> Result<(), SessionError> {
        self.execute(Command::TaskPlanPause)
    }

    pub fn send_program_resume(&mut self) -> Result<(), SessionError> {
        self.execute(Command::TaskPlanResume)
    }

    pub fn send_program_step(&mut self) -> Result<(), SessionError> {
        self.program_start_line = 0;
        self.execute(Command::TaskPlanStep)
    }

    pub fn send_set_optional_stop(&mut self, state: bool) -> Result<(), SessionError> {
        self.execute(Command::TaskPlanSetOptionalStop { state })
    }

    /// Execute one line of G-code in MDI mode.
    pub fn send_mdi_cmd(&mut self, line: &str) -> Result<(), SessionError> {
        self.execute(Command::TaskPlanExecute {
            command: line.to_string(),
        })
    }

    // ---- joints -------------------------------------------------------

    /// Override limits on `joint`; a negative joint switches the override off.
    pub fn send_override_limits(&mut self, joint: i32) -> Result<(), SessionError> {
        self.check_joint_or_all(joint)?;
        self.execute(Command::JointOverrideLimits { joint })
    }

    /// Home `joint`; `-1` homes every joint.
    pub fn send_home(&mut self, joint: i32) -> Result<(), SessionError> {
        self.check_joint_or_all(joint)?;
        self.execute(Command::JointHome { joint })
    }

    /// Unhome `joint`; `-1` unhomes every joint.
    pub fn send_unhome(&mut self, joint: i32) -> Result<(), SessionError> {
        self.check_joint_or_all(joint)?;
        self.execute(Command::JointUnhome { joint })
    }

    pub fn send_joint_set_backlash(&mut self, joint: i32, backlash: f64) -> Result<(), SessionError> {
        self.check_joint(joint)?;
        self.execute(Command::JointSetBacklash { joint, backlash })
    }

    pub fn send_joint_enable(&mut self, joint: i32, enable: bool) -> Result<(), SessionError> {
        self.check_joint(joint)?;
        if enable {
            self.execute(Command::JointEnable { joint })
        } else {
            self.execute(Command::JointDisable { joint })
        }
    }

    pub fn send_joint_load_comp(
        &mut self,
        joint: i32,
        file: &Path,
        comp_type: i32,
    ) -> Result<(), SessionError> {
        self.check_joint(joint)?;
        self.execute(Command::JointLoadComp {
            joint,
            file: file.to_string_lossy().into_owned(),
            comp_type,
        })
    }

    // ---- jogging ------------------------------------------------------

    pub fn send_jog_stop(&mut self, joint_or_axis: i32, mode: JogMode) -> Result<(), SessionError> {
        self.check_jog(joint_or_axis, mode, false)?;
        self.execute(Command::JogStop {
            joint_or_axis,
            mode,
        })
    }

    /// Continuous jog at `speed` units per minute.
    pub fn send_jog_cont(
        &mut self,
        joint_or_axis: i32,
        mode: JogMode,
        speed: f64,
    ) -> Result<(), SessionError> {
        self.check_jog(joint_or_axis, mode, true)?;
        let velocity = self.jog_velocity(joint_or_axis, mode, speed);
        self.execute(Command::JogCont {
            joint_or_axis,
            mode,
            velocity,
        })
    }

    /// Incremental jog of `increment` at `speed` units per minute.
    pub fn send_jog_incr(
        &mut self,
        joint_or_axis: i32,
        mode: JogMode,
        speed: f64,
        increment: f64,
    ) -> Result<(), SessionError> {
        self.check_jog(joint_or_axis, mode, true)?;
        let velocity = self.jog_velocity(joint_or_axis, mode, speed);
        self.execute(Command::JogIncr {
            joint_or_axis,
            mode,
            velocity,
            increment,
        })
    }

    // ---- coolant ------------------------------------------------------

    pub fn send_mist_on(&mut self) -> Result<(), SessionError> {
        self.execute(Command::CoolantMistOn)
    }

    pub fn send_mist_off(&mut self) -> Result<(), SessionError> {
        self.execute(Command::CoolantMistOff)
    }

    pub fn send_flood_on(&mut self) -> Result<(), SessionError> {
        self.execute(Command::CoolantFloodOn)
    }

    pub fn send_flood_off(&mut self) -> Result<(), SessionError> {
        self.execute(Command::CoolantFloodOff)
    }

    pub fn send_lube_on(&mut self) -> Result<(), SessionError> {
        self.execute(Command::LubeOn)
    }

    pub fn send_lube_off(&mut self) -> Result<(), SessionError> {
        self.execute(Command::LubeOff)
    }

    // ---- spindle ------------------------------------------------------

    /// Programmed S word, or the default speed when none is active.
    fn spindle_speed(&self) -> f64 {
        let speed = self.status.active_spindle_speed().abs();
        if speed == 0.0 { DEFAULT_SPINDLE_SPEED } else { speed }
    }

    pub fn send_spindle_forward(&mut self, spindle: i32) -> Result<(), SessionError> {
        self.check_spindle(spindle)?;
        self.refresh_if_auto();
        let speed = self.spindle_speed();
        self.execute(Command::SpindleOn { spindle, speed })
    }

    pub fn send_spindle_reverse(&mut self, spindle: i32) -> Result<(), SessionError> {
        self.check_spindle(spindle)?;
        self.refresh_if_auto();
        let speed = -self.spindle_speed();
        self.execute(Command::SpindleOn { spindle, speed })
    }

    pub fn send_spindle_off(&mut self, spindle: i32) -> Result<(), SessionError> {
        self.check_spindle(spindle)?;
        self.execute(Command::SpindleOff { spindle })
    }

    pub fn send_spindle_increase(&mut self, spindle: i32) -> Result<(), SessionError> {
        self.check_spindle(spindle)?;
        self.execute(Command::SpindleIncrease { spindle })
    }

    pub fn send_spindle_decrease(&mut self, spindle: i32) -> Result<(), SessionError> {
        self.check_spindle(spindle)?;
        self.execute(Command::SpindleDecrease { spindle })
    }

    pub fn send_spindle_constant(&mut self, spindle: i32) -> Result<(), SessionError> {
        self.check_spindle(spindle)?;
        self.execute(Command::SpindleConstant { spindle })
    }

    pub fn send_brake_engage(&mut self, spindle: i32) -> Result<(), SessionError> {
        self.check_spindle(spindle)?;
        self.execute(Command::SpindleBrakeEngage { spindle })
    }

    pub fn send_brake_release(&mut self, spindle: i32) -> Result<(), SessionError> {
        self.check_spindle(spindle)?;
        self.execute(Command::SpindleBrakeRelease { spindle })
    }

    // ---- overrides ----------------------------------------------------

    /// Feed override; negative values are sent as 0.
    pub fn send_feed_override(&mut self, scale: f64) -> Result<(), SessionError> {
        self.execute(Command::TrajSetScale {
            scale: scale.max(0.0),
        })
    }

    /// Rapid override, clamped to `[0, 1]`.
    pub fn send_rapid_override(&mut self, scale: f64) -> Result<(), SessionError> {
        self.execute(Command::TrajSetRapidScale {
            scale: scale.clamp(0.0, 1.0),
        })
    }

    /// Spindle override; negative values are sent as 0.
    pub fn send_spindle_override(&mut self, spindle: i32, scale: f64) -> Result<(), SessionError> {
        self.check_spindle(spindle)?;
        self.execute(Command::TrajSetSpindleScale {
            spindle,
            scale: scale.max(0.0),
        })
    }

    // ---- trajectory ---------------------------------------------------

    pub fn send_teleop_enable(&mut self, enable: bool) -> Result<(), SessionError> {
        self.execute(Command::TrajSetTeleopEnable { enable })
    }

    pub fn send_clear_probe_tripped_flag(&mut self) -> Result<(), SessionError> {
        self.execute(Command::TrajClearProbeTrippedFlag)
    }

    pub fn send_probe(&mut self, x: f64, y: f64, z: f64) -> Result<(), SessionError> {
        self.execute(Command::TrajProbe {
            pos: Pose::xyz(x, y, z),
        })
    }

    // ---- tools --------------------------------------------------------

    pub fn send_load_tool_table(&mut self, file: &Path) -> Result<(), SessionError> {
        self.execute(Command::ToolLoadToolTable {
            file: file.to_string_lossy().into_owned(),
        })
    }

    /// Reload the tool table named in `[files]`.
    pub fn send_reload_tool_table(&mut self) -> Result<(), SessionError> {
        let file = self
            .settings
            .files
            .tool_table
            .clone()
            .ok_or(ValidationError::NoToolTable)?;
        self.send_load_tool_table(&file)
    }

    /// Mill-style offset: length and diameter only.
    pub fn send_tool_set_offset(
        &mut self,
        toolno: i32,
        z_offset: f64,
        diameter: f64,
    ) -> Result<(), SessionError> {
        self.execute(Command::ToolSetOffset(ToolOffset {
            toolno,
            z_offset,
            diameter,
            ..ToolOffset::default()
        }))
    }

    pub fn send_tool_set_offset_full(&mut self, offset: ToolOffset) -> Result<(), SessionError> {
        self.execute(Command::ToolSetOffset(offset))
    }

    // ---- units --------------------------------------------------------

    /// Raw linear value in the configured display unit. Uses the cached
    /// snapshot; never polls.
    pub fn convert_linear_units(&self, value: f64) -> f64 {
        convert_linear(
            value,
            self.settings.display.linear_units,
            &UnitContext::from_status(&self.status),
        )
    }

    pub fn convert_angular_units(&self, value: f64) -> f64 {
        convert_angular(value, self.settings.display.angular_units)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("transport", &self.transport.kind())
            .field("connected", &self.connected)
            .field("serial", &self.serial)
            .field("last_program", &self.last_program)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Open transport that accepts sends and never publishes.
    struct Quiet;

    impl Transport for Quiet {
        fn kind(&self) -> &'static str {
            "quiet"
        }
        fn open(&mut self) -> Result<(), TransportError> {
            Ok(())
        }
        fn is_open(&self) -> bool {
            true
        }
        fn close(&mut self) {}
        fn send(&mut self, _: &CommandMessage) -> Result<(), TransportError> {
            Ok(())
        }
        fn poll_status(&mut self) -> Result<StatusPoll, TransportError> {
            Ok(StatusPoll::Unchanged)
        }
        fn poll_error(&mut self) -> Result<Option<OperatorMessage>, TransportError> {
            Ok(None)
        }
    }

    #[test]
    fn send_without_known_serial_is_refused() {
        let mut session = Session::new(Box::new(Quiet), SessionSettings::default());
        session.connected = true;

        let err = session.send(Command::TaskAbort).unwrap_err();
        assert!(matches!(err, SessionError::SerialUnknown));
        assert_eq!(session.serial(), 0);
    }

    #[test]
    fn known_serial_advances_by_one() {
        let mut session = Session::new(Box::new(Quiet), SessionSettings::default());
        session.connected = true;
        session.serial_initialised = true;
        session.serial = 500;

        assert_eq!(session.send(Command::TaskAbort).unwrap(), 501);
        assert_eq!(session.serial(), 501);
    }
}
