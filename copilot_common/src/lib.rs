//! Copilot Common Library
//!
//! Shared types for the operator console workspace: configuration loading,
//! the controller status model, the operator command set, operator
//! messages, and display unit conversion.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and the console config
//! - [`consts`] - Numeric limits and default paths
//! - [`status`] - Controller status snapshot
//! - [`command`] - Operator commands and their wire envelope
//! - [`message`] - Operator error/text/display messages
//! - [`units`] - Display unit conversion
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use copilot_common::prelude::*;
//!
//! let status = StatusSnapshot::default();
//! let ctx = UnitContext::from_status(&status);
//! assert_eq!(convert_linear(1.0, LinearUnits::Mm, &ctx), 1.0);
//! ```

pub mod command;
pub mod config;
pub mod consts;
pub mod message;
pub mod prelude;
pub mod status;
pub mod units;
