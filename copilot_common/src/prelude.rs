//! Prelude module for common re-exports.
//!
//! ```rust
//! use copilot_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    load_config, ConfigError, ConfigLoader, CopilotConfig, DebugFlags, JogPolarity, LogLevel,
    TransportKind, UpdatePolicy, WaitPolicy,
};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{MAX_AXES, MAX_JOINTS, MAX_SPINDLES};

// ─── Commands & Messages ────────────────────────────────────────────
pub use crate::command::{Command, CommandMessage, JogMode, ToolOffset};
pub use crate::message::{MessageKind, OperatorMessage};

// ─── Status ─────────────────────────────────────────────────────────
pub use crate::status::{
    ExecStatus, Pose, ProgramUnits, StatusSnapshot, TaskMode, TaskState, TrajMode,
};

// ─── Units ──────────────────────────────────────────────────────────
pub use crate::units::{convert_angular, convert_linear, AngularUnits, LinearUnits, UnitContext};
