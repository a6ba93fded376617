//! Bodyweight dynamics under a GLP-1 agonist.
//!
//! Bodyweight is split into a fixed lean part (Boer formula) and a fat part
//! whose change is driven by a Hill effect of the plasma drug concentration
//! `D`. Derived observables report absolute change, ratio and relative change
//! to baseline, body surface area (Haycock) and BMI.

use crate::model::expr::{num, sym};
use crate::model::{AssignmentRule, Model, Parameter, RateRule};
use crate::units::Unit;

pub fn bodyweight() -> Model {
    Model::new("bodyweight")
        .name("Model for bodyweight changes")
        .parameter(Parameter::constant("BW0", 75.0, Unit::Kg).name("initial bodyweight"))
        .parameter(Parameter::dynamic("BW", 75.0, Unit::Kg).name("bodyweight"))
        .parameter(
            Parameter::dynamic("BW_change", f64::NAN, Unit::Kg)
                .notes("Absolute change to baseline bodyweight"),
        )
        .parameter(
            Parameter::dynamic("BW_ratio", f64::NAN, Unit::Dimensionless)
                .notes("Ratio relative to baseline bodyweight"),
        )
        .parameter(
            Parameter::dynamic("BW_relchange", f64::NAN, Unit::Dimensionless)
                .notes("Change relative to baseline bodyweight"),
        )
        .parameter(Parameter::dynamic("LBW0", f64::NAN, Unit::Kg).name("lean bodyweight"))
        .parameter(Parameter::dynamic("FAT0", f64::NAN, Unit::Kg).name("initial fat mass"))
        .parameter(Parameter::dynamic("FAT", 0.0, Unit::Kg).name("additional fat to LBM"))
        .parameter(Parameter::dynamic("DFAT", 0.0, Unit::Kg).name("change in additional fat to LBM"))
        .parameter(Parameter::constant("HEIGHT", 170.0, Unit::Cm).name("height"))
        .parameter(
            Parameter::constant("SEX", 0.0, Unit::Dimensionless)
                .name("sex")
                .notes("Flag to switch sex in model: 0: male, 1: female"),
        )
        .parameter(
            Parameter::constant("conversion_cm_per_m", 100.0, Unit::Dimensionless)
                .name("Conversion factor cm to m"),
        )
        .parameter(
            Parameter::dynamic("D", 0.0, Unit::MilliMolar)
                .name("GLP-1 agonist concentration in plasma"),
        )
        .parameter(
            Parameter::constant("Emax_FAT", 1.0e-5, Unit::PerMin)
                .name("Emax for GLP-1 agonist on fat loss (rate of fat change)"),
        )
        .parameter(
            Parameter::constant("gamma_FAT", 1.0, Unit::Dimensionless)
                .name("gamma for GLP-1 agonist on fat loss"),
        )
        .parameter(
            Parameter::constant("EC50_FAT", 2.5e-5, Unit::MilliMolar)
                .name("EC50 for GLP-1 agonist on fat loss"),
        )
        .parameter(Parameter::dynamic("BSA", f64::NAN, Unit::M2).name("body surface area"))
        .parameter(Parameter::dynamic("BMI", f64::NAN, Unit::KgPerM2).name("body mass index"))
        // FIXME: sex dependency of the Boer formula (female coefficients differ)
        .assignment_rule(AssignmentRule::new(
            "LBW0",
            num(0.407) * sym("BW0") + num(0.267) * sym("HEIGHT") - 19.2,
            Unit::Kg,
        ))
        .assignment_rule(AssignmentRule::new(
            "FAT0",
            sym("BW0") - sym("LBW0"),
            Unit::Kg,
        ))
        .assignment_rule(AssignmentRule::new(
            "FAT",
            sym("FAT0") + sym("DFAT"),
            Unit::Kg,
        ))
        .assignment_rule(AssignmentRule::new(
            "BW",
            sym("LBW0") + sym("FAT"),
            Unit::Kg,
        ))
        .assignment_rule(AssignmentRule::new(
            "BW_change",
            sym("BW") - sym("BW0"),
            Unit::Kg,
        ))
        .assignment_rule(AssignmentRule::new(
            "BW_ratio",
            sym("BW") / sym("BW0"),
            Unit::Dimensionless,
        ))
        .assignment_rule(AssignmentRule::new(
            "BW_relchange",
            (sym("BW") - sym("BW0")) / sym("BW0"),
            Unit::Dimensionless,
        ))
        // body surface area (Haycock1978)
        .assignment_rule(AssignmentRule::new(
            "BSA",
            num(0.024265) * sym("BW").pow(0.5378) * sym("HEIGHT").pow(0.3964),
            Unit::M2,
        ))
        .assignment_rule(AssignmentRule::new(
            "BMI",
            sym("BW")
                / ((sym("HEIGHT") / sym("conversion_cm_per_m"))
                    * (sym("HEIGHT") / sym("conversion_cm_per_m"))),
            Unit::KgPerM2,
        ))
        .rate_rule(RateRule::new(
            "DFAT",
            -(sym("FAT") * sym("Emax_FAT") * sym("D").pow(sym("gamma_FAT"))
                / (sym("D").pow(sym("gamma_FAT")) + sym("EC50_FAT").pow(sym("gamma_FAT")))),
            Unit::KgPerMin,
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{simulate, Timecourse, TimecourseSim};
    use crate::units::Quantity;
    use approx::assert_relative_eq;

    #[test]
    fn test_boer_split() {
        let compiled = bodyweight().compile().unwrap();
        let sim = TimecourseSim::single(Timecourse::new(0.0, 10.0, 10));
        let result = simulate(
            &compiled,
            &sim,
            &["BW".to_string(), "LBW0".to_string(), "FAT".to_string()],
            false,
        )
        .unwrap();
        let lbw = 0.407 * 75.0 + 0.267 * 170.0 - 19.2;
        assert_relative_eq!(result.column("LBW0").unwrap()[0], lbw, max_relative = 1e-12);
        assert_relative_eq!(result.column("BW").unwrap()[0], 75.0, max_relative = 1e-9);
        assert_relative_eq!(
            result.column("FAT").unwrap()[0],
            75.0 - lbw,
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_no_drug_no_weight_loss() {
        let compiled = bodyweight().compile().unwrap();
        let sim = TimecourseSim::single(Timecourse::new(0.0, 26.0 * 7.0 * 24.0 * 60.0, 100));
        let result = simulate(&compiled, &sim, &["BW_change".to_string()], false).unwrap();
        for value in result.column("BW_change").unwrap() {
            assert_relative_eq!(*value, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_drug_reduces_bodyweight() {
        let compiled = bodyweight().compile().unwrap();
        // saturating drug concentration held constant
        let sim = TimecourseSim::single(
            Timecourse::new(0.0, 26.0 * 7.0 * 24.0 * 60.0, 100)
                .change("D", Quantity::new(1.0, Unit::MilliMolar)),
        );
        let result = simulate(
            &compiled,
            &sim,
            &["BW_change".to_string(), "BW_ratio".to_string()],
            false,
        )
        .unwrap();
        let last = result.len() - 1;
        assert!(result.column("BW_change").unwrap()[last] < -0.5);
        assert!(result.column("BW_ratio").unwrap()[last] < 1.0);
    }
}
