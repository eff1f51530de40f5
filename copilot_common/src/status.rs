//! Controller status snapshot.
//!
//! A [`StatusSnapshot`] is the complete picture the controller publishes
//! on its status channel. Clients never patch individual fields: a newer
//! snapshot replaces the cached one wholesale, so every field a caller
//! reads came from the same controller tick.

use serde::{Deserialize, Serialize};

use crate::consts::ACTIVE_SETTINGS_LEN;

/// Type tag of a full status snapshot on a tagged channel.
pub const STATUS_TAG: u32 = 0x0A01;

/// Execution state of the most recently received command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum ExecStatus {
    /// Command finished successfully.
    #[default]
    Done = 1,
    /// Command is still executing.
    Exec = 2,
    /// Command ended in an error.
    Error = 3,
}

impl ExecStatus {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Done),
            2 => Some(Self::Exec),
            3 => Some(Self::Error),
            _ => None,
        }
    }
}

/// Task operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum TaskMode {
    #[default]
    Manual = 1,
    Auto = 2,
    Mdi = 3,
}

impl TaskMode {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Manual),
            2 => Some(Self::Auto),
            3 => Some(Self::Mdi),
            _ => None,
        }
    }
}

/// Task machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum TaskState {
    /// Emergency stop engaged.
    #[default]
    Estop = 1,
    /// Emergency stop released, machine still off.
    EstopReset = 2,
    /// Machine off.
    Off = 3,
    /// Machine on; jogging and program execution allowed.
    On = 4,
}

impl TaskState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Estop),
            2 => Some(Self::EstopReset),
            3 => Some(Self::Off),
            4 => Some(Self::On),
            _ => None,
        }
    }
}

/// Task executor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum ExecState {
    Error = 1,
    #[default]
    Done = 2,
    WaitingForMotion = 3,
    WaitingForMotionQueue = 4,
    WaitingForIo = 5,
    WaitingForMotionAndIo = 7,
    WaitingForDelay = 8,
    WaitingForSystemCmd = 9,
    WaitingForSpindleOriented = 10,
}

impl ExecState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Error),
            2 => Some(Self::Done),
            3 => Some(Self::WaitingForMotion),
            4 => Some(Self::WaitingForMotionQueue),
            5 => Some(Self::WaitingForIo),
            7 => Some(Self::WaitingForMotionAndIo),
            8 => Some(Self::WaitingForDelay),
            9 => Some(Self::WaitingForSystemCmd),
            10 => Some(Self::WaitingForSpindleOriented),
            _ => None,
        }
    }
}

/// G-code interpreter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum InterpState {
    #[default]
    Idle = 1,
    Reading = 2,
    Paused = 3,
    Waiting = 4,
}

impl InterpState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Idle),
            2 => Some(Self::Reading),
            3 => Some(Self::Paused),
            4 => Some(Self::Waiting),
            _ => None,
        }
    }
}

/// Length unit declared by the loaded program (G20/G21).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum ProgramUnits {
    Inches = 1,
    #[default]
    Mm = 2,
    Cm = 3,
}

impl ProgramUnits {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Inches),
            2 => Some(Self::Mm),
            3 => Some(Self::Cm),
            _ => None,
        }
    }
}

/// Trajectory planner mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum TrajMode {
    /// Independent joint motion; joint jogging allowed.
    #[default]
    Free = 1,
    /// Coordinated motion (program execution).
    Coord = 2,
    /// Cartesian teleoperation; axis jogging allowed.
    Teleop = 3,
}

impl TrajMode {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Free),
            2 => Some(Self::Coord),
            3 => Some(Self::Teleop),
            _ => None,
        }
    }
}

/// Nine-axis pose (XYZ, ABC, UVW).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub u: f64,
    pub v: f64,
    pub w: f64,
}

impl Pose {
    /// Pose with only the linear XYZ components set.
    pub const fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            a: 0.0,
            b: 0.0,
            c: 0.0,
            u: 0.0,
            v: 0.0,
            w: 0.0,
        }
    }

    /// Components in axis-letter order.
    pub const fn to_array(&self) -> [f64; 9] {
        [
            self.x, self.y, self.z, self.a, self.b, self.c, self.u, self.v, self.w,
        ]
    }

    /// Inverse of [`Pose::to_array`].
    pub const fn from_array(v: [f64; 9]) -> Self {
        Self {
            x: v[0],
            y: v[1],
            z: v[2],
            a: v[3],
            b: v[4],
            c: v[5],
            u: v[6],
            v: v[7],
            w: v[8],
        }
    }
}

/// Task (interpreter/program) status block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TaskStatus {
    pub mode: TaskMode,
    pub state: TaskState,
    pub exec_state: ExecState,
    pub interp_state: InterpState,
    pub program_units: ProgramUnits,
    /// Currently open program; empty when none is open.
    pub file: String,
    pub current_line: i32,
    pub motion_line: i32,
    pub read_line: i32,
    /// Active feed rate, spindle speed and friends, in controller order.
    pub active_settings: [f64; ACTIVE_SETTINGS_LEN],
    pub optional_stop: bool,
    /// Configuration file the controller was started with.
    pub ini_filename: String,
}

/// Trajectory planner status block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajStatus {
    pub mode: TrajMode,
    /// User linear units per millimetre.
    pub linear_units: f64,
    /// User angular units per degree.
    pub angular_units: f64,
    /// Number of joints the controller is configured with.
    pub joints: u32,
    pub enabled: bool,
    pub inpos: bool,
    pub queue: i32,
    pub position: Pose,
    pub actual_position: Pose,
    pub feed_scale: f64,
    pub rapid_scale: f64,
    pub teleop_enabled: bool,
    pub probe_tripped: bool,
    pub probing: bool,
}

impl Default for TrajStatus {
    fn default() -> Self {
        Self {
            mode: TrajMode::Free,
            linear_units: 1.0,
            angular_units: 1.0,
            joints: 0,
            enabled: false,
            inpos: true,
            queue: 0,
            position: Pose::default(),
            actual_position: Pose::default(),
            feed_scale: 1.0,
            rapid_scale: 1.0,
            teleop_enabled: false,
            probe_tripped: false,
            probing: false,
        }
    }
}

/// Per-joint status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct JointStatus {
    pub homed: bool,
    pub homing: bool,
    pub enabled: bool,
    pub fault: bool,
    pub min_soft_limit: bool,
    pub max_soft_limit: bool,
    pub position: f64,
    pub ferror: f64,
    pub backlash: f64,
}

/// Spindle rotation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SpindleDirection {
    Reverse,
    #[default]
    Stopped,
    Forward,
}

/// Per-spindle status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpindleStatus {
    pub speed: f64,
    pub direction: SpindleDirection,
    pub brake_engaged: bool,
    pub override_scale: f64,
    pub at_speed: bool,
}

impl Default for SpindleStatus {
    fn default() -> Self {
        Self {
            speed: 0.0,
            direction: SpindleDirection::Stopped,
            brake_engaged: true,
            override_scale: 1.0,
            at_speed: false,
        }
    }
}

/// Tool changer status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ToolStatus {
    /// Tool number loaded in the spindle (0 = none).
    pub tool_in_spindle: i32,
    /// Pocket prepared for the next change (-1 = none).
    pub pocket_prepped: i32,
}

/// Coolant and lubrication outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CoolantStatus {
    pub mist: bool,
    pub flood: bool,
    pub lube: bool,
}

/// Full controller status, as published on one controller tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StatusSnapshot {
    /// Serial number of the last command the controller has taken in.
    pub echo_serial_number: i32,
    /// Execution state of that command.
    pub status: ExecStatus,
    pub task: TaskStatus,
    pub traj: TrajStatus,
    pub joints: Vec<JointStatus>,
    pub spindles: Vec<SpindleStatus>,
    pub tool: ToolStatus,
    pub coolant: CoolantStatus,
    /// Controller-side debug word.
    pub debug: u32,
}

impl StatusSnapshot {
    /// True once every configured joint reports homed.
    pub fn all_homed(&self) -> bool {
        !self.joints.is_empty() && self.joints.iter().all(|j| j.homed)
    }

    /// True when a program file is open on the controller.
    pub fn has_program(&self) -> bool {
        !self.task.file.is_empty()
    }

    /// Spindle speed setting, the third active setting.
    pub fn active_spindle_speed(&self) -> f64 {
        self.task.active_settings[2]
    }
}
