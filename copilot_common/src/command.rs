//! Operator command set.
//!
//! Every operator action maps onto exactly one [`Command`]. On the wire a
//! command travels inside a [`CommandMessage`] carrying the serial number
//! the sending session assigned to it; transports that need a numeric
//! discriminator use [`Command::type_tag`].

use serde::{Deserialize, Serialize};

use crate::status::{Pose, TaskMode, TaskState};

/// Joint-space or Cartesian (teleop) jogging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum JogMode {
    /// Jog an axis letter in teleop mode.
    Teleop = 0,
    /// Jog an individual joint in free mode.
    Joint = 1,
}

/// Full tool-table offset entry (lathe style).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ToolOffset {
    pub toolno: i32,
    pub z_offset: f64,
    pub x_offset: f64,
    pub diameter: f64,
    pub front_angle: f64,
    pub back_angle: f64,
    /// Lathe tool orientation (0 for mill-style tools).
    pub orientation: i32,
}

/// A discrete command for the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    SetDebug { level: u32 },
    TaskSetState { state: TaskState },
    TaskSetMode { mode: TaskMode },
    TaskAbort,
    TaskPlanInit,
    TaskPlanOpen { file: String },
    TaskPlanRun { line: i32 },
    TaskPlanPause,
    TaskPlanResume,
    TaskPlanStep,
    TaskPlanSetOptionalStop { state: bool },
    TaskPlanExecute { command: String },
    JointOverrideLimits { joint: i32 },
    JointHome { joint: i32 },
    JointUnhome { joint: i32 },
    JointSetBacklash { joint: i32, backlash: f64 },
    JointEnable { joint: i32 },
    JointDisable { joint: i32 },
    JointLoadComp { joint: i32, file: String, comp_type: i32 },
    JogStop { joint_or_axis: i32, mode: JogMode },
    JogCont { joint_or_axis: i32, mode: JogMode, velocity: f64 },
    JogIncr { joint_or_axis: i32, mode: JogMode, velocity: f64, increment: f64 },
    CoolantMistOn,
    CoolantMistOff,
    CoolantFloodOn,
    CoolantFloodOff,
    LubeOn,
    LubeOff,
    SpindleOn { spindle: i32, speed: f64 },
    SpindleOff { spindle: i32 },
    SpindleIncrease { spindle: i32 },
    SpindleDecrease { spindle: i32 },
    SpindleConstant { spindle: i32 },
    SpindleBrakeEngage { spindle: i32 },
    SpindleBrakeRelease { spindle: i32 },
    TrajSetScale { scale: f64 },
    TrajSetRapidScale { scale: f64 },
    TrajSetSpindleScale { spindle: i32, scale: f64 },
    TrajSetTeleopEnable { enable: bool },
    TrajClearProbeTrippedFlag,
    TrajProbe { pos: Pose },
    ToolLoadToolTable { file: String },
    ToolSetOffset(ToolOffset),
}

impl Command {
    /// Numeric type tag written into shared-memory channel headers.
    pub const fn type_tag(&self) -> u32 {
        match self {
            Self::SetDebug { .. } => 0x0101,
            Self::TaskSetState { .. } => 0x0201,
            Self::TaskSetMode { .. } => 0x0202,
            Self::TaskAbort => 0x0203,
            Self::TaskPlanInit => 0x0204,
            Self::TaskPlanOpen { .. } => 0x0205,
            Self::TaskPlanRun { .. } => 0x0206,
            Self::TaskPlanPause => 0x0207,
            Self::TaskPlanResume => 0x0208,
            Self::TaskPlanStep => 0x0209,
            Self::TaskPlanSetOptionalStop { .. } => 0x020A,
            Self::TaskPlanExecute { .. } => 0x020B,
            Self::JointOverrideLimits { .. } => 0x0301,
            Self::JointHome { .. } => 0x0302,
            Self::JointUnhome { .. } => 0x0303,
            Self::JointSetBacklash { .. } => 0x0304,
            Self::JointEnable { .. } => 0x0305,
            Self::JointDisable { .. } => 0x0306,
            Self::JointLoadComp { .. } => 0x0307,
            Self::JogStop { .. } => 0x0401,
            Self::JogCont { .. } => 0x0402,
            Self::JogIncr { .. } => 0x0403,
            Self::CoolantMistOn => 0x0501,
            Self::CoolantMistOff => 0x0502,
            Self::CoolantFloodOn => 0x0503,
            Self::CoolantFloodOff => 0x0504,
            Self::LubeOn => 0x0505,
            Self::LubeOff => 0x0506,
            Self::SpindleOn { .. } => 0x0601,
            Self::SpindleOff { .. } => 0x0602,
            Self::SpindleIncrease { .. } => 0x0603,
            Self::SpindleDecrease { .. } => 0x0604,
            Self::SpindleConstant { .. } => 0x0605,
            Self::SpindleBrakeEngage { .. } => 0x0606,
            Self::SpindleBrakeRelease { .. } => 0x0607,
            Self::TrajSetScale { .. } => 0x0701,
            Self::TrajSetRapidScale { .. } => 0x0702,
            Self::TrajSetSpindleScale { .. } => 0x0703,
            Self::TrajSetTeleopEnable { .. } => 0x0704,
            Self::TrajClearProbeTrippedFlag => 0x0705,
            Self::TrajProbe { .. } => 0x0706,
            Self::ToolLoadToolTable { .. } => 0x0801,
            Self::ToolSetOffset(_) => 0x0802,
        }
    }

    /// Short human-readable name for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetDebug { .. } => "set_debug",
            Self::TaskSetState { .. } => "task_set_state",
            Self::TaskSetMode { .. } => "task_set_mode",
            Self::TaskAbort => "task_abort",
            Self::TaskPlanInit => "task_plan_init",
            Self::TaskPlanOpen { .. } => "task_plan_open",
            Self::TaskPlanRun { .. } => "task_plan_run",
            Self::TaskPlanPause => "task_plan_pause",
            Self::TaskPlanResume => "task_plan_resume",
            Self::TaskPlanStep => "task_plan_step",
            Self::TaskPlanSetOptionalStop { .. } => "task_plan_set_optional_stop",
            Self::TaskPlanExecute { .. } => "task_plan_execute",
            Self::JointOverrideLimits { .. } => "joint_override_limits",
            Self::JointHome { .. } => "joint_home",
            Self::JointUnhome { .. } => "joint_unhome",
            Self::JointSetBacklash { .. } => "joint_set_backlash",
            Self::JointEnable { .. } => "joint_enable",
            Self::JointDisable { .. } => "joint_disable",
            Self::JointLoadComp { .. } => "joint_load_comp",
            Self::JogStop { .. } => "jog_stop",
            Self::JogCont { .. } => "jog_cont",
            Self::JogIncr { .. } => "jog_incr",
            Self::CoolantMistOn => "coolant_mist_on",
            Self::CoolantMistOff => "coolant_mist_off",
            Self::CoolantFloodOn => "coolant_flood_on",
            Self::CoolantFloodOff => "coolant_flood_off",
            Self::LubeOn => "lube_on",
            Self::LubeOff => "lube_off",
            Self::SpindleOn { .. } => "spindle_on",
            Self::SpindleOff { .. } => "spindle_off",
            Self::SpindleIncrease { .. } => "spindle_increase",
            Self::SpindleDecrease { .. } => "spindle_decrease",
            Self::SpindleConstant { .. } => "spindle_constant",
            Self::SpindleBrakeEngage { .. } => "spindle_brake_engage",
            Self::SpindleBrakeRelease { .. } => "spindle_brake_release",
            Self::TrajSetScale { .. } => "traj_set_scale",
            Self::TrajSetRapidScale { .. } => "traj_set_rapid_scale",
            Self::TrajSetSpindleScale { .. } => "traj_set_spindle_scale",
            Self::TrajSetTeleopEnable { .. } => "traj_set_teleop_enable",
            Self::TrajClearProbeTrippedFlag => "traj_clear_probe_tripped_flag",
            Self::TrajProbe { .. } => "traj_probe",
            Self::ToolLoadToolTable { .. } => "tool_load_tool_table",
            Self::ToolSetOffset(_) => "tool_set_offset",
        }
    }

    /// Jog commands are fire-and-forget: the sender never waits on them.
    pub const fn is_jog(&self) -> bool {
        matches!(
            self,
            Self::JogStop { .. } | Self::JogCont { .. } | Self::JogIncr { .. }
        )
    }
}

/// A command stamped with the serial number assigned by its session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMessage {
    pub serial_number: i32,
    pub command: Command,
}

impl CommandMessage {
    pub fn new(serial_number: i32, command: Command) -> Self {
        Self {
            serial_number,
            command,
        }
    }

    #[inline]
    pub const fn type_tag(&self) -> u32 {
        self.command.type_tag()
    }
}
