//! Workspace-wide constants.
//!
//! Single source of truth for numeric limits and default paths.

use std::time::Duration;

/// Maximum number of joints a controller can be configured with.
pub const MAX_JOINTS: usize = 16;

/// Number of Cartesian axes addressable by teleop jogging (XYZABCUVW).
pub const MAX_AXES: usize = 9;

/// Maximum number of spindles.
pub const MAX_SPINDLES: usize = 8;

/// Length of the task `active_settings` array.
pub const ACTIVE_SETTINGS_LEN: usize = 5;

/// Spindle speed used for forward/reverse when no S word is active.
pub const DEFAULT_SPINDLE_SPEED: f64 = 500.0;

/// Interval between status polls while waiting on a command.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default budget for establishing the controller connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default pause between connection attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/copilot/copilot.toml";

/// Default directory holding shared-memory channels.
pub const DEFAULT_SHM_DIR: &str = "/dev/shm";

/// Default channel names, matching the controller's buffer names.
pub const DEFAULT_COMMAND_CHANNEL: &str = "emcCommand";
pub const DEFAULT_STATUS_CHANNEL: &str = "emcStatus";
pub const DEFAULT_ERROR_CHANNEL: &str = "emcError";

/// Default pub/sub endpoints (abstract-namespace IPC).
pub const DEFAULT_COMMAND_ENDPOINT: &str = "ipc://@/tmp/linuxcnc-command";
pub const DEFAULT_STATUS_ENDPOINT: &str = "ipc://@/tmp/linuxcnc-status";
pub const DEFAULT_ERROR_ENDPOINT: &str = "ipc://@/tmp/linuxcnc-error";

/// Receive high-water mark of the status subscription.
pub const STATUS_RECV_HWM: i32 = 100;

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Inches per millimetre.
pub const INCH_PER_MM: f64 = 1.0 / MM_PER_INCH;

/// Centimetres per millimetre.
pub const CM_PER_MM: f64 = 0.1;
