//! Maps CLI actions onto session operations.

use copilot_client::{Session, SessionError};
use copilot_common::command::JogMode;

use crate::cli::{Action, SpindleOp};

fn jog_mode(teleop: bool) -> JogMode {
    if teleop { JogMode::Teleop } else { JogMode::Joint }
}

pub fn dispatch(session: &mut Session, action: &Action) -> Result<(), SessionError> {
    match action {
        Action::Debug { level } => session.send_debug(*level),
        Action::Estop => session.send_estop(),
        Action::EstopReset => session.send_estop_reset(),
        Action::On => session.send_machine_on(),
        Action::Off => session.send_machine_off(),
        Action::Manual => session.send_manual(),
        Action::Auto => session.send_auto(),
        Action::Mdi { line } => {
            session.send_mdi()?;
            match line {
                Some(line) => session.send_mdi_cmd(line),
                None => Ok(()),
            }
        }
        Action::Abort => session.send_abort(),
        Action::Home { joint } => session.send_home(*joint),
        Action::Unhome { joint } => session.send_unhome(*joint),
        Action::OverrideLimits { joint } => session.send_override_limits(*joint),
        Action::Jog {
            joint_or_axis,
            speed,
            increment,
            teleop,
        } => {
            let mode = jog_mode(*teleop);
            match increment {
                Some(increment) => session.send_jog_incr(*joint_or_axis, mode, *speed, *increment),
                None => session.send_jog_cont(*joint_or_axis, mode, *speed),
            }
        }
        Action::JogStop {
            joint_or_axis,
            teleop,
        } => session.send_jog_stop(*joint_or_axis, jog_mode(*teleop)),
        Action::Mist { state } => {
            if state.is_on() {
                session.send_mist_on()
            } else {
                session.send_mist_off()
            }
        }
        Action::Flood { state } => {
            if state.is_on() {
                session.send_flood_on()
            } else {
                session.send_flood_off()
            }
        }
        Action::Lube { state } => {
            if state.is_on() {
                session.send_lube_on()
            } else {
                session.send_lube_off()
            }
        }
        Action::Spindle { spindle, op } => spindle_op(session, *spindle, op),
        Action::Feed { scale } => session.send_feed_override(*scale),
        Action::Rapid { scale } => session.send_rapid_override(*scale),
        Action::TaskPlanInit => session.send_task_plan_init(),
        Action::Open { program } => session.send_program_open(program),
        Action::Run { line } => session.send_program_run(*line),
        Action::Pause => session.send_program_pause(),
        Action::Resume => session.send_program_resume(),
        Action::Step => session.send_program_step(),
        Action::OptionalStop { state } => session.send_set_optional_stop(state.is_on()),
        Action::LoadToolTable { file } => match file {
            Some(file) => session.send_load_tool_table(file),
            None => session.send_reload_tool_table(),
        },
        Action::ToolOffset {
            toolno,
            z_offset,
            diameter,
        } => session.send_tool_set_offset(*toolno, *z_offset, *diameter),
        Action::Backlash { joint, backlash } => session.send_joint_set_backlash(*joint, *backlash),
        Action::Joint { joint, state } => session.send_joint_enable(*joint, state.is_on()),
        Action::LoadComp {
            joint,
            file,
            comp_type,
        } => session.send_joint_load_comp(*joint, file, *comp_type),
        Action::Teleop { state } => session.send_teleop_enable(state.is_on()),
        Action::ClearProbe => session.send_clear_probe_tripped_flag(),
        Action::Probe { x, y, z } => session.send_probe(*x, *y, *z),
    }
}

fn spindle_op(session: &mut Session, spindle: i32, op: &SpindleOp) -> Result<(), SessionError> {
    match op {
        SpindleOp::Forward => session.send_spindle_forward(spindle),
        SpindleOp::Reverse => session.send_spindle_reverse(spindle),
        SpindleOp::Off => session.send_spindle_off(spindle),
        SpindleOp::Increase => session.send_spindle_increase(spindle),
        SpindleOp::Decrease => session.send_spindle_decrease(spindle),
        SpindleOp::Constant => session.send_spindle_constant(spindle),
        SpindleOp::BrakeEngage => session.send_brake_engage(spindle),
        SpindleOp::BrakeRelease => session.send_brake_release(spindle),
        SpindleOp::Override { scale } => session.send_spindle_override(spindle, *scale),
    }
}
