//! Property tests for display unit conversion.

use copilot_common::consts::{INCH_PER_MM, MM_PER_INCH};
use copilot_common::status::{ProgramUnits, StatusSnapshot};
use copilot_common::units::{
    convert_linear, inverse_linear_factor, linear_factor, LinearUnits, UnitContext,
};
use proptest::prelude::*;

fn any_mode() -> impl Strategy<Value = LinearUnits> {
    prop_oneof![
        Just(LinearUnits::Custom),
        Just(LinearUnits::Auto),
        Just(LinearUnits::Mm),
        Just(LinearUnits::Inch),
        Just(LinearUnits::Cm),
    ]
}

fn any_program_units() -> impl Strategy<Value = ProgramUnits> {
    prop_oneof![
        Just(ProgramUnits::Inches),
        Just(ProgramUnits::Mm),
        Just(ProgramUnits::Cm),
    ]
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

proptest! {
    #[test]
    fn display_value_maps_back_to_raw(
        value in -1.0e4f64..1.0e4,
        mode in any_mode(),
        program_units in any_program_units(),
        per_mm in prop_oneof![Just(1.0), Just(INCH_PER_MM), 0.01f64..100.0],
    ) {
        let ctx = UnitContext { linear_units_per_mm: per_mm, program_units };
        let shown = convert_linear(value, mode, &ctx);
        prop_assert!(close(shown * inverse_linear_factor(mode, &ctx), value));
    }

    #[test]
    fn custom_never_scales(value in -1.0e6f64..1.0e6, per_mm in 0.01f64..100.0) {
        let ctx = UnitContext { linear_units_per_mm: per_mm, program_units: ProgramUnits::Inches };
        prop_assert_eq!(convert_linear(value, LinearUnits::Custom, &ctx), value);
        prop_assert_eq!(linear_factor(LinearUnits::Custom, &ctx), 1.0);
    }

    #[test]
    fn auto_matches_the_fixed_mode_for_program_units(
        value in -1.0e4f64..1.0e4,
        program_units in any_program_units(),
    ) {
        let ctx = UnitContext { linear_units_per_mm: 1.0, program_units };
        let fixed = match program_units {
            ProgramUnits::Inches => LinearUnits::Inch,
            ProgramUnits::Mm => LinearUnits::Mm,
            ProgramUnits::Cm => LinearUnits::Cm,
        };
        prop_assert!(close(
            convert_linear(value, LinearUnits::Auto, &ctx),
            convert_linear(value, fixed, &ctx),
        ));
    }
}

#[test]
fn context_is_read_from_status() {
    let mut status = StatusSnapshot::default();
    status.traj.linear_units = INCH_PER_MM;
    status.task.program_units = ProgramUnits::Inches;

    let ctx = UnitContext::from_status(&status);
    // One inch of machine travel shown in program inches.
    assert!(close(convert_linear(1.0, LinearUnits::Auto, &ctx), 1.0));
    assert!(close(convert_linear(1.0, LinearUnits::Mm, &ctx), MM_PER_INCH));
}
