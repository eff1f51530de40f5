//! Pub/sub wire format.
//!
//! Every ZeroMQ message is `MAGIC (4) | VERSION (1) | bincode(Frame)`. Status
//! travels as a flat [`StatusRecord`]: enums as their numeric codes, joint
//! and spindle arrays as parallel vectors.

use bitflags::bitflags;
use copilot_common::command::CommandMessage;
use copilot_common::consts::ACTIVE_SETTINGS_LEN;
use copilot_common::status::{
    CoolantStatus, ExecState, ExecStatus, InterpState, JointStatus, Pose, ProgramUnits,
    SpindleDirection, SpindleStatus, StatusSnapshot, TaskMode, TaskState, TaskStatus, ToolStatus,
    TrajMode, TrajStatus,
};
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Message prefix.
pub const WIRE_MAGIC: [u8; 4] = *b"CPLT";
/// Current wire version.
pub const WIRE_VERSION: u8 = 1;
/// Largest message either side sends.
pub const MAX_FRAME: usize = 64 * 1024;

const HEADER_LEN: usize = WIRE_MAGIC.len() + 1;

/// One message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Frame {
    /// Client to controller.
    Command(CommandMessage),
    /// Publisher to subscriber.
    Status(StatusRecord),
    /// Publisher to subscriber; `tag` selects the message kind.
    Operator { tag: u32, text: String },
}

impl Frame {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Command(_) => "command",
            Self::Status(_) => "status",
            Self::Operator { .. } => "operator",
        }
    }
}

pub fn encode(frame: &Frame) -> Result<Vec<u8>, TransportError> {
    let mut out = Vec::with_capacity(256);
    out.extend_from_slice(&WIRE_MAGIC);
    out.push(WIRE_VERSION);
    bincode::serialize_into(&mut out, frame)?;
    if out.len() > MAX_FRAME {
        return Err(TransportError::MalformedFrame {
            reason: format!("{} frame of {} bytes exceeds frame limit", frame.name(), out.len()),
        });
    }
    Ok(out)
}

pub fn decode(bytes: &[u8]) -> Result<Frame, TransportError> {
    if bytes.len() < HEADER_LEN || bytes[..WIRE_MAGIC.len()] != WIRE_MAGIC {
        return Err(TransportError::MalformedFrame {
            reason: "bad magic".to_string(),
        });
    }
    let version = bytes[WIRE_MAGIC.len()];
    if version != WIRE_VERSION {
        return Err(TransportError::MalformedFrame {
            reason: format!("wire version {version}, expected {WIRE_VERSION}"),
        });
    }
    Ok(bincode::deserialize(&bytes[HEADER_LEN..])?)
}

bitflags! {
    /// Per-joint boolean state packed into one byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct JointFlags: u8 {
        const HOMED = 1 << 0;
        const HOMING = 1 << 1;
        const ENABLED = 1 << 2;
        const FAULT = 1 << 3;
        const MIN_SOFT_LIMIT = 1 << 4;
        const MAX_SOFT_LIMIT = 1 << 5;
    }
}

/// Flattened status snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusRecord {
    pub echo_serial_number: i32,
    pub status: u8,
    pub task_mode: u8,
    pub task_state: u8,
    pub exec_state: u8,
    pub interp_state: u8,
    pub program_units: u8,
    pub file: String,
    pub current_line: i32,
    pub motion_line: i32,
    pub read_line: i32,
    pub active_settings: [f64; ACTIVE_SETTINGS_LEN],
    pub optional_stop: bool,
    pub ini_filename: String,
    pub traj_mode: u8,
    pub linear_units: f64,
    pub angular_units: f64,
    pub joint_count: u32,
    pub traj_enabled: bool,
    pub inpos: bool,
    pub queue: i32,
    pub position: [f64; 9],
    pub actual_position: [f64; 9],
    pub feed_scale: f64,
    pub rapid_scale: f64,
    pub teleop_enabled: bool,
    pub probe_tripped: bool,
    pub probing: bool,
    pub joint_flags: Vec<u8>,
    pub joint_position: Vec<f64>,
    pub joint_ferror: Vec<f64>,
    pub joint_backlash: Vec<f64>,
    pub spindle_speed: Vec<f64>,
    pub spindle_direction: Vec<i8>,
    pub spindle_brake: Vec<bool>,
    pub spindle_override: Vec<f64>,
    pub spindle_at_speed: Vec<bool>,
    pub tool_in_spindle: i32,
    pub pocket_prepped: i32,
    pub mist: bool,
    pub flood: bool,
    pub lube: bool,
    pub debug: u32,
}

impl From<&StatusSnapshot> for StatusRecord {
    fn from(s: &StatusSnapshot) -> Self {
        let joint_flags = s
            .joints
            .iter()
            .map(|j| {
                let mut f = JointFlags::empty();
                f.set(JointFlags::HOMED, j.homed);
                f.set(JointFlags::HOMING, j.homing);
                f.set(JointFlags::ENABLED, j.enabled);
                f.set(JointFlags::FAULT, j.fault);
                f.set(JointFlags::MIN_SOFT_LIMIT, j.min_soft_limit);
                f.set(JointFlags::MAX_SOFT_LIMIT, j.max_soft_limit);
                f.bits()
            })
            .collect();

        Self {
            echo_serial_number: s.echo_serial_number,
            status: s.status as u8,
            task_mode: s.task.mode as u8,
            task_state: s.task.state as u8,
            exec_state: s.task.exec_state as u8,
            interp_state: s.task.interp_state as u8,
            program_units: s.task.program_units as u8,
            file: s.task.file.clone(),
            current_line: s.task.current_line,
            motion_line: s.task.motion_line,
            read_line: s.task.read_line,
            active_settings: s.task.active_settings,
            optional_stop: s.task.optional_stop,
            ini_filename: s.task.ini_filename.clone(),
            traj_mode: s.traj.mode as u8,
            linear_units: s.traj.linear_units,
            angular_units: s.traj.angular_units,
            joint_count: s.traj.joints,
            traj_enabled: s.traj.enabled,
            inpos: s.traj.inpos,
            queue: s.traj.queue,
            position: s.traj.position.to_array(),
            actual_position: s.traj.actual_position.to_array(),
            feed_scale: s.traj.feed_scale,
            rapid_scale: s.traj.rapid_scale,
            teleop_enabled: s.traj.teleop_enabled,
            probe_tripped: s.traj.probe_tripped,
            probing: s.traj.probing,
            joint_flags,
            joint_position: s.joints.iter().map(|j| j.position).collect(),
            joint_ferror: s.joints.iter().map(|j| j.ferror).collect(),
            joint_backlash: s.joints.iter().map(|j| j.backlash).collect(),
            spindle_speed: s.spindles.iter().map(|sp| sp.speed).collect(),
            spindle_direction: s
                .spindles
                .iter()
                .map(|sp| match sp.direction {
                    SpindleDirection::Reverse => -1,
                    SpindleDirection::Stopped => 0,
                    SpindleDirection::Forward => 1,
                })
                .collect(),
            spindle_brake: s.spindles.iter().map(|sp| sp.brake_engaged).collect(),
            spindle_override: s.spindles.iter().map(|sp| sp.override_scale).collect(),
            spindle_at_speed: s.spindles.iter().map(|sp| sp.at_speed).collect(),
            tool_in_spindle: s.tool.tool_in_spindle,
            pocket_prepped: s.tool.pocket_prepped,
            mist: s.coolant.mist,
            flood: s.coolant.flood,
            lube: s.coolant.lube,
            debug: s.debug,
        }
    }
}

fn code<T>(field: &str, value: u8, parse: fn(u8) -> Option<T>) -> Result<T, TransportError> {
    parse(value).ok_or_else(|| TransportError::MalformedFrame {
        reason: format!("invalid {field} code {value}"),
    })
}

fn same_len(field: &str, len: usize, expected: usize) -> Result<(), TransportError> {
    if len != expected {
        return Err(TransportError::MalformedFrame {
            reason: format!("{field} has {len} entries, expected {expected}"),
        });
    }
    Ok(())
}

impl TryFrom<StatusRecord> for StatusSnapshot {
    type Error = TransportError;

    fn try_from(r: StatusRecord) -> Result<Self, Self::Error> {
        let joints = r.joint_flags.len();
        same_len("joint_position", r.joint_position.len(), joints)?;
        same_len("joint_ferror", r.joint_ferror.len(), joints)?;
        same_len("joint_backlash", r.joint_backlash.len(), joints)?;
        let spindles = r.spindle_speed.len();
        same_len("spindle_direction", r.spindle_direction.len(), spindles)?;
        same_len("spindle_brake", r.spindle_brake.len(), spindles)?;
        same_len("spindle_override", r.spindle_override.len(), spindles)?;
        same_len("spindle_at_speed", r.spindle_at_speed.len(), spindles)?;

        let joints = (0..joints)
            .map(|i| {
                let f = JointFlags::from_bits_truncate(r.joint_flags[i]);
                JointStatus {
                    homed: f.contains(JointFlags::HOMED),
                    homing: f.contains(JointFlags::HOMING),
                    enabled: f.contains(JointFlags::ENABLED),
                    fault: f.contains(JointFlags::FAULT),
                    min_soft_limit: f.contains(JointFlags::MIN_SOFT_LIMIT),
                    max_soft_limit: f.contains(JointFlags::MAX_SOFT_LIMIT),
                    position: r.joint_position[i],
                    ferror: r.joint_ferror[i],
                    backlash: r.joint_backlash[i],
                }
            })
            .collect();

        let spindles = (0..spindles)
            .map(|i| SpindleStatus {
                speed: r.spindle_speed[i],
                direction: match r.spindle_direction[i] {
                    d if d < 0 => SpindleDirection::Reverse,
                    0 => SpindleDirection::Stopped,
                    _ => SpindleDirection::Forward,
                },
                brake_engaged: r.spindle_brake[i],
                override_scale: r.spindle_override[i],
                at_speed: r.spindle_at_speed[i],
            })
            .collect();

        Ok(StatusSnapshot {
            echo_serial_number: r.echo_serial_number,
            status: code("status", r.status, ExecStatus::from_u8)?,
            task: TaskStatus {
                mode: code("task_mode", r.task_mode, TaskMode::from_u8)?,
                state: code("task_state", r.task_state, TaskState::from_u8)?,
                exec_state: code("exec_state", r.exec_state, ExecState::from_u8)?,
                interp_state: code("interp_state", r.interp_state, InterpState::from_u8)?,
                program_units: code("program_units", r.program_units, ProgramUnits::from_u8)?,
                file: r.file,
                current_line: r.current_line,
                motion_line: r.motion_line,
                read_line: r.read_line,
                active_settings: r.active_settings,
                optional_stop: r.optional_stop,
                ini_filename: r.ini_filename,
            },
            traj: TrajStatus {
                mode: code("traj_mode", r.traj_mode, TrajMode::from_u8)?,
                linear_units: r.linear_units,
                angular_units: r.angular_units,
                joints: r.joint_count,
                enabled: r.traj_enabled,
                inpos: r.inpos,
                queue: r.queue,
                position: Pose::from_array(r.position),
                actual_position: Pose::from_array(r.actual_position),
                feed_scale: r.feed_scale,
                rapid_scale: r.rapid_scale,
                teleop_enabled: r.teleop_enabled,
                probe_tripped: r.probe_tripped,
                probing: r.probing,
            },
            joints,
            spindles,
            tool: ToolStatus {
                tool_in_spindle: r.tool_in_spindle,
                pocket_prepped: r.pocket_prepped,
            },
            coolant: CoolantStatus {
                mist: r.mist,
                flood: r.flood,
                lube: r.lube,
            },
            debug: r.debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copilot_common::command::Command;

    fn busy_snapshot() -> StatusSnapshot {
        let mut s = StatusSnapshot::default();
        s.echo_serial_number = 41;
        s.status = ExecStatus::Exec;
        s.task.state = TaskState::On;
        s.task.program_units = ProgramUnits::Inches;
        s.task.file = "/nc/part.ngc".into();
        s.traj.mode = TrajMode::Teleop;
        s.traj.position = Pose::xyz(1.0, 2.0, 3.0);
        s.joints = vec![
            JointStatus {
                homed: true,
                enabled: true,
                position: 1.5,
                ..Default::default()
            },
            JointStatus {
                fault: true,
                max_soft_limit: true,
                ..Default::default()
            },
        ];
        s.spindles = vec![SpindleStatus {
            speed: -1200.0,
            direction: SpindleDirection::Reverse,
            brake_engaged: false,
            ..Default::default()
        }];
        s.coolant.flood = true;
        s
    }

    #[test]
    fn status_survives_the_wire() {
        let snapshot = busy_snapshot();
        let bytes = encode(&Frame::Status(StatusRecord::from(&snapshot))).unwrap();
        let Frame::Status(record) = decode(&bytes).unwrap() else {
            panic!("expected a status frame");
        };
        assert_eq!(StatusSnapshot::try_from(record).unwrap(), snapshot);
    }

    #[test]
    fn command_frame_carries_serial() {
        let msg = CommandMessage::new(7, Command::TaskPlanRun { line: 12 });
        let bytes = encode(&Frame::Command(msg.clone())).unwrap();
        assert_eq!(&bytes[..4], b"CPLT");
        assert_eq!(decode(&bytes).unwrap(), Frame::Command(msg));
    }

    #[test]
    fn bad_magic_and_version_rejected() {
        assert!(matches!(
            decode(b"NOPE\x01rest"),
            Err(TransportError::MalformedFrame { .. })
        ));
        let mut bytes = encode(&Frame::Operator {
            tag: 1,
            text: String::new(),
        })
        .unwrap();
        bytes[4] = 99;
        assert!(matches!(
            decode(&bytes),
            Err(TransportError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn invalid_enum_code_rejected() {
        let mut record = StatusRecord::from(&StatusSnapshot::default());
        record.task_state = 0;
        assert!(matches!(
            StatusSnapshot::try_from(record),
            Err(TransportError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn ragged_arrays_rejected() {
        let mut record = StatusRecord::from(&busy_snapshot());
        record.joint_position.pop();
        assert!(StatusSnapshot::try_from(record).is_err());
    }
}
