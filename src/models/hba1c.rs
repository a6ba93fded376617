//! HbA1c and fasting plasma glucose dynamics.
//!
//! Hemoglobin is synthesized and degraded with the erythrocyte turnover rate
//! and glycated proportionally to FPG; the HbA1c fraction follows. FPG is
//! normalized toward the healthy value by the GLP-1 agonist concentration
//! `glp1`. Both quantities carry change/ratio/relchange observables relative
//! to their baselines.

use crate::model::expr::{num, sym};
use crate::model::{
    AssignmentRule, Compartment, InitialAssignment, Model, Parameter, Reaction, Species,
};
use crate::units::Unit;

/// Erythrocyte turnover rate, halflife of 3 months [1/min].
pub fn k_turnover() -> f64 {
    std::f64::consts::LN_2 / (3.0 * 30.0 * 24.0 * 60.0)
}

pub fn hba1c() -> Model {
    let k_turn = k_turnover();
    Model::new("hba1c")
        .name("Model for HbA1c and FPG changes")
        .compartment(Compartment::new("Vext", 1.5, Unit::Litre).name("plasma"))
        .species(
            Species::amount("hba1c", "Vext", 0.05)
                .name("HbA1c")
                .unit(Unit::Dimensionless),
        )
        .species(
            Species::concentration("fpg", "Vext", 5.0).name("fasting plasma glucose (FPG)"),
        )
        .species(
            Species::amount("hb", "Vext", 0.95)
                .name("Hb")
                .unit(Unit::Dimensionless),
        )
        .parameter(Parameter::constant("hba1c0", 0.05, Unit::Dimensionless).name("initial HbA1c"))
        .parameter(Parameter::constant("fpg0", 5.0, Unit::MilliMolar).name("initial FPG"))
        .initial_assignment(InitialAssignment::new("hba1c", sym("hba1c0")))
        .initial_assignment(InitialAssignment::new("fpg", sym("fpg0")))
        .initial_assignment(InitialAssignment::new("hb", num(1.0) - sym("hba1c0")))
        .parameter(
            Parameter::dynamic("hba1c_change", f64::NAN, Unit::Dimensionless)
                .notes("Absolute change to baseline HbA1c"),
        )
        .parameter(Parameter::dynamic("hba1c_ratio", f64::NAN, Unit::Dimensionless))
        .parameter(Parameter::dynamic("hba1c_relchange", f64::NAN, Unit::Dimensionless))
        .parameter(
            Parameter::dynamic("fpg_change", f64::NAN, Unit::MilliMolar)
                .notes("Absolute change to baseline FPG"),
        )
        .parameter(Parameter::dynamic("fpg_ratio", f64::NAN, Unit::Dimensionless))
        .parameter(Parameter::dynamic("fpg_relchange", f64::NAN, Unit::Dimensionless))
        .parameter(Parameter::dynamic("hb_total", f64::NAN, Unit::Dimensionless).name("Hb total"))
        .assignment_rule(AssignmentRule::new(
            "hba1c_change",
            sym("hba1c") - sym("hba1c0"),
            Unit::Dimensionless,
        ))
        .assignment_rule(AssignmentRule::new(
            "hba1c_ratio",
            sym("hba1c") / sym("hba1c0"),
            Unit::Dimensionless,
        ))
        .assignment_rule(AssignmentRule::new(
            "hba1c_relchange",
            (sym("hba1c") - sym("hba1c0")) / sym("hba1c0"),
            Unit::Dimensionless,
        ))
        .assignment_rule(AssignmentRule::new(
            "fpg_change",
            sym("fpg") - sym("fpg0"),
            Unit::MilliMolar,
        ))
        .assignment_rule(AssignmentRule::new(
            "fpg_ratio",
            sym("fpg") / sym("fpg0"),
            Unit::Dimensionless,
        ))
        .assignment_rule(AssignmentRule::new(
            "fpg_relchange",
            (sym("fpg") - sym("fpg0")) / sym("fpg0"),
            Unit::Dimensionless,
        ))
        .assignment_rule(AssignmentRule::new(
            "hb_total",
            sym("hb") + sym("hba1c"),
            Unit::Dimensionless,
        ))
        // GLP-1 drug effect
        .parameter(
            Parameter::dynamic("glp1", 0.0, Unit::MilliMolar)
                .name("GLP-1 agonist concentration in plasma"),
        )
        .parameter(
            Parameter::dynamic("E_glp1", f64::NAN, Unit::Dimensionless).name("Effect of glp1"),
        )
        .parameter(
            Parameter::constant("EC50_glp1", 25e-6, Unit::MilliMolar)
                .name("half-maximal effective concentration"),
        )
        .parameter(
            Parameter::constant("Emax_glp1", 1.0, Unit::Dimensionless)
                .name("maximum drug efficacy")
                .notes("Maximum effect between 0 and 1"),
        )
        .parameter(
            Parameter::constant("gamma_glp1", 1.0, Unit::Dimensionless).name("Hill coefficient"),
        )
        .assignment_rule(
            AssignmentRule::new(
                "E_glp1",
                sym("Emax_glp1") * sym("glp1").pow(sym("gamma_glp1"))
                    / (sym("EC50_glp1").pow(sym("gamma_glp1"))
                        + sym("glp1").pow(sym("gamma_glp1"))),
                Unit::Dimensionless,
            )
            .notes("Hill equation for drug effect"),
        )
        // FPG turnover
        .parameter(
            Parameter::constant("fpg_healthy", 5.0, Unit::MilliMolar)
                .name("healthy fasting plasma glucose"),
        )
        .parameter(
            Parameter::constant("k_fpg", 1.0, Unit::LitreSquaredPerMinPerMMole)
                .name("rate normalization FPG with GLP-1 agonist"),
        )
        .reaction(
            Reaction::new("FPGC", sym("k_fpg") * sym("glp1") * (sym("fpg") - sym("fpg_healthy")))
                .name("fpg change")
                .compartment("Vext")
                .reactant("fpg"),
        )
        // Hb turnover
        .parameter(
            Parameter::constant("k_hb_syn", k_turn, Unit::MMolePerMin)
                .name("hb synthesis rate")
                .notes("set based on turnover of erythrocytes"),
        )
        .parameter(Parameter::constant("k_hb_turn", k_turn, Unit::PerMin).name("hb turnover rate"))
        .parameter(
            Parameter::constant("k_hb_gly", k_turn * 0.05 / 5.0, Unit::LitrePerMin)
                .name("hb glycation rate")
                .notes("set so that the HbA1c is 5% at steady state for 5 mM FPG"),
        )
        .reaction(
            Reaction::new("HBSYN", sym("k_hb_syn"))
                .name("HB synthesis")
                .compartment("Vext")
                .product("hb"),
        )
        .reaction(
            Reaction::new("HBDEG", sym("k_hb_turn") * sym("hb"))
                .name("HB degradation")
                .compartment("Vext")
                .reactant("hb"),
        )
        .reaction(
            Reaction::new("HBA1CDEG", sym("k_hb_turn") * sym("hba1c"))
                .name("HBA1C degradation")
                .compartment("Vext")
                .reactant("hba1c"),
        )
        .reaction(
            Reaction::new("HBGLYC", sym("k_hb_gly") * sym("fpg") * sym("hb"))
                .name("HB glycation")
                .compartment("Vext")
                .reactant("hb")
                .product("hba1c"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{simulate, Timecourse, TimecourseSim};
    use crate::units::Quantity;
    use approx::assert_relative_eq;

    const WEEK: f64 = 7.0 * 24.0 * 60.0;

    #[test]
    fn test_baseline_initial_assignments() {
        let compiled = hba1c().compile().unwrap();
        let sim = TimecourseSim::single(
            Timecourse::new(0.0, 10.0, 10)
                .change("hba1c0", Quantity::new(8.1, Unit::Percent))
                .change("hba1c", Quantity::new(8.1, Unit::Percent))
                .change("fpg0", Quantity::new(11.7, Unit::MilliMolar))
                .change("[fpg]", Quantity::new(11.7, Unit::MilliMolar)),
        );
        let result = simulate(
            &compiled,
            &sim,
            &["hba1c".to_string(), "[fpg]".to_string(), "hba1c_ratio".to_string()],
            false,
        )
        .unwrap();
        assert_relative_eq!(result.column("hba1c").unwrap()[0], 0.081);
        assert_relative_eq!(result.column("[fpg]").unwrap()[0], 11.7);
        assert_relative_eq!(result.column("hba1c_ratio").unwrap()[0], 1.0);
    }

    #[test]
    fn test_glp1_normalizes_fpg() {
        let compiled = hba1c().compile().unwrap();
        let elevated = |drug: f64| {
            TimecourseSim::single(
                Timecourse::new(0.0, 26.0 * WEEK, 200)
                    .change("fpg0", Quantity::new(11.7, Unit::MilliMolar))
                    .change("[fpg]", Quantity::new(11.7, Unit::MilliMolar))
                    .change("glp1", Quantity::new(drug, Unit::MilliMolar)),
            )
        };
        let selections = vec!["[fpg]".to_string(), "hba1c".to_string()];
        let treated = simulate(&compiled, &elevated(1e-4), &selections, false).unwrap();
        let untreated = simulate(&compiled, &elevated(0.0), &selections, false).unwrap();
        let last = treated.len() - 1;
        // FPG decays toward the healthy value under drug, stays elevated without
        assert!(treated.column("[fpg]").unwrap()[last] < 6.0);
        assert_relative_eq!(
            untreated.column("[fpg]").unwrap()[last],
            11.7,
            max_relative = 1e-6
        );
        assert!(
            treated.column("hba1c").unwrap()[last] < untreated.column("hba1c").unwrap()[last]
        );
    }
}
