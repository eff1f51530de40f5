//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use copilot_common::config::TransportKind;

/// Copilot - operator console for a CNC controller
#[derive(Parser, Debug)]
#[command(name = "copilot")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Send operator commands to a CNC controller and show its status")]
#[command(long_about = None)]
pub struct Args {
    /// Path to copilot.toml. Defaults to /etc/copilot/copilot.toml when present.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the transport selected in the configuration
    #[arg(short, long, value_enum)]
    pub transport: Option<TransportArg>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Cmd,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportArg {
    Shm,
    Pubsub,
}

impl From<TransportArg> for TransportKind {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Shm => TransportKind::Shm,
            TransportArg::Pubsub => TransportKind::PubSub,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Print one status snapshot
    Status {
        /// Print the raw snapshot as JSON
        #[arg(long)]
        raw: bool,
    },
    /// Print status changes and operator messages until interrupted
    Watch {
        /// Refresh interval in milliseconds
        #[arg(long, default_value_t = 250)]
        interval_ms: u64,
    },
    /// Send one operator command and wait per the configured policy
    Send {
        #[command(subcommand)]
        action: Action,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn is_on(self) -> bool {
        self == Switch::On
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum SpindleOp {
    Forward,
    Reverse,
    Off,
    Increase,
    Decrease,
    Constant,
    BrakeEngage,
    BrakeRelease,
    /// Set the spindle override scale
    Override { scale: f64 },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Action {
    /// Set the controller debug word
    Debug { level: u32 },
    Estop,
    EstopReset,
    /// Machine on
    On,
    /// Machine off
    Off,
    Manual,
    Auto,
    /// Switch to MDI mode, optionally executing one line
    Mdi { line: Option<String> },
    Abort,
    /// Home a joint (-1 for all)
    Home {
        #[arg(default_value_t = -1, allow_hyphen_values = true)]
        joint: i32,
    },
    /// Unhome a joint (-1 for all)
    Unhome {
        #[arg(default_value_t = -1, allow_hyphen_values = true)]
        joint: i32,
    },
    /// Override soft limits on a joint (negative to clear)
    OverrideLimits {
        #[arg(allow_hyphen_values = true)]
        joint: i32,
    },
    /// Jog a joint, or an axis with --teleop; continuous unless --increment is given
    Jog {
        joint_or_axis: i32,
        /// Speed in units per minute; the sign selects the direction
        #[arg(allow_hyphen_values = true)]
        speed: f64,
        #[arg(long)]
        increment: Option<f64>,
        #[arg(long)]
        teleop: bool,
    },
    JogStop {
        joint_or_axis: i32,
        #[arg(long)]
        teleop: bool,
    },
    Mist { state: Switch },
    Flood { state: Switch },
    Lube { state: Switch },
    Spindle {
        #[arg(short, long, default_value_t = 0)]
        spindle: i32,
        #[command(subcommand)]
        op: SpindleOp,
    },
    /// Feed override scale
    Feed { scale: f64 },
    /// Rapid override scale (0..1)
    Rapid { scale: f64 },
    TaskPlanInit,
    Open { program: PathBuf },
    Run {
        #[arg(default_value_t = 0)]
        line: i32,
    },
    Pause,
    Resume,
    Step,
    OptionalStop { state: Switch },
    /// Load a tool table; without a file, reload the configured one
    LoadToolTable { file: Option<PathBuf> },
    /// Mill-style tool offset
    ToolOffset {
        toolno: i32,
        #[arg(allow_hyphen_values = true)]
        z_offset: f64,
        diameter: f64,
    },
    Backlash { joint: i32, backlash: f64 },
    Joint { joint: i32, state: Switch },
    LoadComp {
        joint: i32,
        file: PathBuf,
        #[arg(long, default_value_t = 0)]
        comp_type: i32,
    },
    Teleop { state: Switch },
    ClearProbe,
    Probe {
        #[arg(allow_hyphen_values = true)]
        x: f64,
        #[arg(allow_hyphen_values = true)]
        y: f64,
        #[arg(allow_hyphen_values = true)]
        z: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(args).expect("valid command line")
    }

    #[test]
    fn global_flags() {
        let args = parse(&["copilot", "-v", "--transport", "pubsub", "status", "--raw"]);
        assert!(args.verbose);
        assert_eq!(args.transport.map(TransportKind::from), Some(TransportKind::PubSub));
        assert!(matches!(args.command, Cmd::Status { raw: true }));
    }

    #[test]
    fn home_defaults_to_all_joints() {
        let args = parse(&["copilot", "send", "home"]);
        assert!(matches!(
            args.command,
            Cmd::Send {
                action: Action::Home { joint: -1 }
            }
        ));
    }

    #[test]
    fn negative_jog_speed() {
        let args = parse(&["copilot", "send", "jog", "2", "-300", "--increment", "0.1"]);
        let Cmd::Send { action } = args.command else {
            panic!("expected send");
        };
        assert_eq!(
            action,
            Action::Jog {
                joint_or_axis: 2,
                speed: -300.0,
                increment: Some(0.1),
                teleop: false,
            }
        );
    }

    #[test]
    fn spindle_subcommands() {
        let args = parse(&["copilot", "send", "spindle", "-s", "1", "override", "0.8"]);
        let Cmd::Send { action } = args.command else {
            panic!("expected send");
        };
        assert_eq!(
            action,
            Action::Spindle {
                spindle: 1,
                op: SpindleOp::Override { scale: 0.8 },
            }
        );
    }

    #[test]
    fn unknown_transport_is_rejected() {
        assert!(Args::try_parse_from(["copilot", "--transport", "zmq", "status"]).is_err());
    }
}
