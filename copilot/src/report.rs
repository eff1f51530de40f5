//! Text rendering of a status snapshot.

use std::fmt::Write as _;

use copilot_common::config::DisplayConfig;
use copilot_common::status::StatusSnapshot;
use copilot_common::units::{UnitContext, convert_angular, convert_linear, linear_suffix};

const AXES: [&str; 9] = ["X", "Y", "Z", "A", "B", "C", "U", "V", "W"];

/// Multi-line summary with positions in display units.
pub fn summary(status: &StatusSnapshot, display: &DisplayConfig) -> String {
    let ctx = UnitContext::from_status(status);
    let suffix = linear_suffix(display.linear_units, status.task.program_units);
    let mut out = String::new();

    let _ = writeln!(
        out,
        "serial {} ({:?})  state {:?}  mode {:?}  traj {:?}",
        status.echo_serial_number, status.status, status.task.state, status.task.mode, status.traj.mode
    );
    let program = if status.has_program() {
        status.task.file.as_str()
    } else {
        "-"
    };
    let _ = writeln!(
        out,
        "program {program}  line {}  interp {:?}",
        status.task.current_line, status.task.interp_state
    );

    let pos = status.traj.actual_position.to_array();
    let mut line = String::from("pos");
    for (i, (axis, value)) in AXES.iter().zip(pos).enumerate() {
        // XYZ and UVW are linear, ABC angular.
        let shown = if (3..6).contains(&i) {
            convert_angular(value, display.angular_units)
        } else {
            convert_linear(value, display.linear_units, &ctx)
        };
        let _ = write!(line, "  {axis} {shown:.4}");
    }
    let _ = writeln!(out, "{line}  [{}]", if suffix.is_empty() { "user" } else { suffix });

    let homed: String = status
        .joints
        .iter()
        .map(|j| if j.homed { 'H' } else { '-' })
        .collect();
    let _ = writeln!(
        out,
        "joints [{homed}]  feed {:.0}%  rapid {:.0}%  tool {}",
        status.traj.feed_scale * 100.0,
        status.traj.rapid_scale * 100.0,
        status.tool.tool_in_spindle
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use copilot_common::status::{JointStatus, Pose, ProgramUnits};
    use copilot_common::units::LinearUnits;

    #[test]
    fn positions_follow_display_units() {
        let mut s = StatusSnapshot::default();
        s.task.program_units = ProgramUnits::Inches;
        s.traj.actual_position = Pose::xyz(25.4, 0.0, -50.8);
        s.joints = vec![
            JointStatus {
                homed: true,
                ..Default::default()
            },
            JointStatus::default(),
        ];

        let display = DisplayConfig {
            linear_units: LinearUnits::Auto,
            ..Default::default()
        };
        let text = summary(&s, &display);
        assert!(text.contains("X 1.0000"), "{text}");
        assert!(text.contains("Z -2.0000"), "{text}");
        assert!(text.contains("[in]"), "{text}");
        assert!(text.contains("joints [H-]"), "{text}");
        assert!(text.contains("program -"), "{text}");
    }

    #[test]
    fn custom_units_show_raw_values() {
        let mut s = StatusSnapshot::default();
        s.traj.actual_position = Pose::xyz(12.5, 0.0, 0.0);
        let display = DisplayConfig {
            linear_units: LinearUnits::Custom,
            ..Default::default()
        };
        let text = summary(&s, &display);
        assert!(text.contains("X 12.5000"), "{text}");
        assert!(text.contains("[user]"), "{text}");
    }
}
