//! Configuration loading traits and types.
//!
//! The operator console reads one TOML file at startup. Every section and
//! key is optional; missing values fall back to the defaults documented on
//! each field.
//!
//! # Usage
//!
//! ```rust,no_run
//! use copilot_common::config::{load_config, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = load_config(Path::new("copilot.toml"))?;
//!     println!("Transport: {:?}", config.controller.transport);
//!     Ok(())
//! }
//! ```
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! log_level = "debug"
//! service_name = "copilot-mill"
//!
//! [controller]
//! debug = 0x40
//! transport = "shm"
//! connect_timeout_s = 10.0
//! retry_interval_s = 1.0
//!
//! [session]
//! wait = "done"
//! timeout_s = 0.0
//!
//! [display]
//! linear_units = "auto"
//!
//! [jogging]
//! polarity = ["forward", "forward", "reverse"]
//!
//! [files]
//! tool_table = "tool.tbl"
//! parameter_file = "sim.var"
//! ```

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::consts::{
    DEFAULT_COMMAND_CHANNEL, DEFAULT_COMMAND_ENDPOINT, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_ERROR_CHANNEL, DEFAULT_ERROR_ENDPOINT, DEFAULT_POLL_INTERVAL, DEFAULT_RETRY_INTERVAL,
    DEFAULT_SHM_DIR, DEFAULT_STATUS_CHANNEL, DEFAULT_STATUS_ENDPOINT, MAX_JOINTS,
};
use crate::units::{AngularUnits, LinearUnits};

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared by every copilot binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    "copilot".to_string()
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

bitflags! {
    /// Controller debug word.
    ///
    /// Only [`DebugFlags::CHANNEL`] changes client behaviour: it makes
    /// connection retries log every failed attempt.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DebugFlags: u32 {
        const CONFIG = 0x0000_0002;
        const VERSIONS = 0x0000_0008;
        const TASK_ISSUE = 0x0000_0010;
        const CHANNEL = 0x0000_0040;
        const MOTION_TIME = 0x0000_0080;
        const INTERP = 0x0000_0100;
        const RCS = 0x0000_0200;
        const INTERP_LIST = 0x0000_0800;
        const IOCONTROL = 0x0000_1000;
        const OWORD = 0x0000_2000;
        const REMAP = 0x0000_4000;
        const PYTHON = 0x0000_8000;
        const NAMEDPARAM = 0x0001_0000;
        const GDBONSIGNAL = 0x0002_0000;
        const STATE_TAGS = 0x0004_0000;
    }
}

/// Which transport carries commands and status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Shared-memory message channels.
    #[default]
    Shm,
    /// ZeroMQ publish/subscribe endpoints.
    PubSub,
}

/// Shared-memory channel naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShmChannelConfig {
    /// Directory the controller creates its channels in.
    pub dir: PathBuf,
    pub command: String,
    pub status: String,
    pub error: String,
}

impl Default for ShmChannelConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_SHM_DIR),
            command: DEFAULT_COMMAND_CHANNEL.to_string(),
            status: DEFAULT_STATUS_CHANNEL.to_string(),
            error: DEFAULT_ERROR_CHANNEL.to_string(),
        }
    }
}

/// Publish/subscribe endpoint addressing.
///
/// Endpoints are ZeroMQ addresses (`ipc://...`, `tcp://...`). The client
/// connects a PUSH socket to the command endpoint and SUB sockets to the
/// two publishers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PubSubConfig {
    pub command_endpoint: String,
    pub status_endpoint: String,
    pub error_endpoint: String,
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            command_endpoint: DEFAULT_COMMAND_ENDPOINT.to_string(),
            status_endpoint: DEFAULT_STATUS_ENDPOINT.to_string(),
            error_endpoint: DEFAULT_ERROR_ENDPOINT.to_string(),
        }
    }
}

/// `[controller]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Debug word (default 0).
    pub debug: u32,
    pub transport: TransportKind,
    pub shm: ShmChannelConfig,
    pub pubsub: PubSubConfig,
    /// Total connection budget in seconds.
    pub connect_timeout_s: f64,
    /// Pause between connection attempts in seconds.
    pub retry_interval_s: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            debug: 0,
            transport: TransportKind::default(),
            shm: ShmChannelConfig::default(),
            pubsub: PubSubConfig::default(),
            connect_timeout_s: DEFAULT_CONNECT_TIMEOUT.as_secs_f64(),
            retry_interval_s: DEFAULT_RETRY_INTERVAL.as_secs_f64(),
        }
    }
}

impl ControllerConfig {
    pub fn debug_flags(&self) -> DebugFlags {
        DebugFlags::from_bits_retain(self.debug)
    }

    pub fn connect_timeout(&self) -> Result<Duration, ConfigError> {
        seconds("controller.connect_timeout_s", self.connect_timeout_s)
    }

    pub fn retry_interval(&self) -> Result<Duration, ConfigError> {
        seconds("controller.retry_interval_s", self.retry_interval_s)
    }
}

/// What a blocking command call waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WaitPolicy {
    /// The controller has taken the command in.
    Received,
    /// The controller has finished the command.
    #[default]
    Done,
}

/// Whether status is refreshed implicitly before decisions that depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UpdatePolicy {
    None,
    #[default]
    Auto,
}

/// `[session]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub wait: WaitPolicy,
    /// Wait budget in seconds; 0 waits forever.
    pub timeout_s: f64,
    pub poll_interval_ms: u64,
    pub update: UpdatePolicy,
    /// Number of joints the machine is configured with.
    pub joints: usize,
    /// Re-open the last requested program when a run finds none open.
    pub reopen_last_program: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            wait: WaitPolicy::default(),
            timeout_s: 0.0,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            update: UpdatePolicy::default(),
            joints: MAX_JOINTS,
            reopen_last_program: true,
        }
    }
}

impl SessionConfig {
    /// Wait budget; `Duration::ZERO` means unbounded.
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        seconds("session.timeout_s", self.timeout_s)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// `[display]` section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DisplayConfig {
    pub linear_units: LinearUnits,
    pub angular_units: AngularUnits,
}

/// Direction a positive jog request moves a joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JogPolarity {
    #[default]
    Forward,
    Reverse,
}

impl JogPolarity {
    /// Sign applied to jog velocity and increment.
    pub const fn sign(self) -> f64 {
        match self {
            Self::Forward => 1.0,
            Self::Reverse => -1.0,
        }
    }
}

/// `[jogging]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JoggingConfig {
    /// Per-joint polarity, indexed by joint number.
    pub polarity: Vec<JogPolarity>,
}

impl JoggingConfig {
    /// Polarity of `joint`; joints without an entry jog forward.
    pub fn polarity(&self, joint: usize) -> JogPolarity {
        self.polarity.get(joint).copied().unwrap_or_default()
    }
}

/// `[files]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FilesConfig {
    pub tool_table: Option<PathBuf>,
    pub parameter_file: Option<PathBuf>,
}

/// Complete operator console configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CopilotConfig {
    pub shared: SharedConfig,
    pub controller: ControllerConfig,
    pub session: SessionConfig,
    pub display: DisplayConfig,
    pub jogging: JoggingConfig,
    pub files: FilesConfig,
}

impl CopilotConfig {
    /// Validate cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` on the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        self.controller.connect_timeout()?;
        if self.controller.retry_interval()?.is_zero() {
            return Err(ConfigError::ValidationError(
                "controller.retry_interval_s must be positive".to_string(),
            ));
        }
        let shm = &self.controller.shm;
        for (key, name) in [
            ("command", &shm.command),
            ("status", &shm.status),
            ("error", &shm.error),
        ] {
            if name.is_empty() || name.contains('/') {
                return Err(ConfigError::ValidationError(format!(
                    "controller.shm.{key} must be a non-empty name without '/'"
                )));
            }
        }

        let pubsub = &self.controller.pubsub;
        for (key, endpoint) in [
            ("command_endpoint", &pubsub.command_endpoint),
            ("status_endpoint", &pubsub.status_endpoint),
            ("error_endpoint", &pubsub.error_endpoint),
        ] {
            if !endpoint.contains("://") {
                return Err(ConfigError::ValidationError(format!(
                    "controller.pubsub.{key} must be a transport address like ipc://..., got {endpoint:?}"
                )));
            }
        }

        self.session.timeout()?;
        if self.session.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "session.poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.session.joints == 0 || self.session.joints > MAX_JOINTS {
            return Err(ConfigError::ValidationError(format!(
                "session.joints must be in 1..={MAX_JOINTS}, got {}",
                self.session.joints
            )));
        }
        if self.jogging.polarity.len() > MAX_JOINTS {
            return Err(ConfigError::ValidationError(format!(
                "jogging.polarity has {} entries, at most {MAX_JOINTS} joints exist",
                self.jogging.polarity.len()
            )));
        }
        Ok(())
    }
}

fn seconds(key: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        ConfigError::ValidationError(format!(
            "{key} must be a finite, non-negative number of seconds, got {value}"
        ))
    })
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// Load and validate the console configuration.
pub fn load_config(path: &Path) -> Result<CopilotConfig, ConfigError> {
    let config = CopilotConfig::load(path)?;
    config.validate()?;
    tracing::debug!(
        path = %path.display(),
        transport = ?config.controller.transport,
        wait = ?config.session.wait,
        "configuration loaded"
    );
    Ok(config)
}
