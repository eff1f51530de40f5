//! Display unit conversion.
//!
//! Status values arrive in the controller's user units. A display value is
//! produced by first normalising to millimetres (dividing by the status's
//! user-units-per-mm factor) and then scaling into the configured display
//! unit. `Custom` skips both steps and shows the raw value; callers must
//! not convert a custom value a second time.
//!
//! Angular values are shown as published: the controller's angular unit is
//! degrees and no other display unit is supported.

use serde::{Deserialize, Serialize};

use crate::consts::{CM_PER_MM, INCH_PER_MM};
use crate::status::{ProgramUnits, StatusSnapshot};

/// Linear display unit selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinearUnits {
    /// Show raw user units.
    Custom,
    /// Follow the units declared by the loaded program.
    #[default]
    Auto,
    Mm,
    Inch,
    Cm,
}

/// Angular display unit selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AngularUnits {
    #[default]
    Custom,
    Auto,
    Deg,
    Rad,
    Grad,
}

/// Live status fields that conversion depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitContext {
    /// User linear units per millimetre.
    pub linear_units_per_mm: f64,
    /// Units declared by the loaded program.
    pub program_units: ProgramUnits,
}

impl Default for UnitContext {
    fn default() -> Self {
        Self {
            linear_units_per_mm: 1.0,
            program_units: ProgramUnits::Mm,
        }
    }
}

impl UnitContext {
    pub fn from_status(status: &StatusSnapshot) -> Self {
        Self {
            linear_units_per_mm: status.traj.linear_units,
            program_units: status.task.program_units,
        }
    }

    fn user_units_per_mm(&self) -> f64 {
        let f = self.linear_units_per_mm;
        if f.is_finite() && f != 0.0 { f } else { 1.0 }
    }
}

/// Scale from millimetres into the given program unit.
const fn program_unit_scale(units: ProgramUnits) -> f64 {
    match units {
        ProgramUnits::Mm => 1.0,
        ProgramUnits::Inches => INCH_PER_MM,
        ProgramUnits::Cm => CM_PER_MM,
    }
}

/// Multiplicative factor turning a raw user-unit value into a display value.
pub fn linear_factor(mode: LinearUnits, ctx: &UnitContext) -> f64 {
    let per_mm = 1.0 / ctx.user_units_per_mm();
    match mode {
        LinearUnits::Custom => 1.0,
        LinearUnits::Mm => per_mm,
        LinearUnits::Inch => per_mm * INCH_PER_MM,
        LinearUnits::Cm => per_mm * CM_PER_MM,
        LinearUnits::Auto => per_mm * program_unit_scale(ctx.program_units),
    }
}

/// Factor turning a display value back into raw user units.
pub fn inverse_linear_factor(mode: LinearUnits, ctx: &UnitContext) -> f64 {
    1.0 / linear_factor(mode, ctx)
}

/// Convert a raw linear value into the configured display unit.
pub fn convert_linear(value: f64, mode: LinearUnits, ctx: &UnitContext) -> f64 {
    match mode {
        LinearUnits::Custom => value,
        _ => value * linear_factor(mode, ctx),
    }
}

/// Convert a raw angular value; identity for every mode.
pub fn convert_angular(value: f64, _mode: AngularUnits) -> f64 {
    value
}

/// Short unit suffix for labels.
pub const fn linear_suffix(mode: LinearUnits, program_units: ProgramUnits) -> &'static str {
    match mode {
        LinearUnits::Custom => "",
        LinearUnits::Mm => "mm",
        LinearUnits::Inch => "in",
        LinearUnits::Cm => "cm",
        LinearUnits::Auto => match program_units {
            ProgramUnits::Mm => "mm",
            ProgramUnits::Inches => "in",
            ProgramUnits::Cm => "cm",
        },
    }
}
