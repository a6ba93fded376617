//! Whole-body dulaglutide pharmacokinetics.
//!
//! Subcutaneous depot absorption into venous plasma, proteolytic cleavage to
//! metabolites, renal excretion into urine, and a hepatic enterohepatic route
//! through bile and a segmented intestinal transit chain into feces. Submodel
//! quantities carry their tissue prefix (`KI__`, `LI__`, `GU__`).

use crate::model::annotation::{Annotation, Qualifier, SboTerm};
use crate::model::expr::{num, sym};
use crate::model::{
    AssignmentRule, Compartment, DoseParameter, Model, Parameter, Reaction, Species,
};
use crate::units::Unit;

/// Molecular weight of dulaglutide and its metabolites [g/mole].
pub const MR_DUL: f64 = 3314.6;

/// Number of intestinal transit segments.
pub const N_CHAIN: usize = 5;

pub fn dulaglutide_pk() -> Model {
    let mut m = Model::new("dulaglutide_pk")
        .name("Model for dulaglutide pharmacokinetics")
        .annotate(Annotation::new(Qualifier::HasProperty, "NCIT:C79369"))
        .annotate(Annotation::new(Qualifier::HasProperty, "NCIT:C79372"))
        // compartments
        .compartment(
            Compartment::new("Vext", 1.5, Unit::Litre)
                .name("plasma")
                .annotate(Annotation::new(Qualifier::Is, "bto/BTO:0000131")),
        )
        .compartment(
            Compartment::new("Vki", 0.3, Unit::Litre)
                .name("kidney")
                .annotate(Annotation::new(Qualifier::Is, "fma/FMA:7203")),
        )
        .compartment(
            Compartment::new("Vli", 1.5, Unit::Litre)
                .name("liver")
                .annotate(Annotation::new(Qualifier::Is, "fma/FMA:7197")),
        )
        .compartment(
            Compartment::new("Vgu", 1.2825, Unit::Litre)
                .name("intestine")
                .annotate(Annotation::new(Qualifier::Is, "fma/FMA:7199")),
        )
        // 0.0171 [l/kg] * 75 kg * 0.9
        .compartment(Compartment::new("Vlumen", 1.2825 * 0.9, Unit::Litre).name("intestinal lumen"))
        .compartment(Compartment::new("Vbi", 1.0, Unit::Litre).name("bile"))
        .compartment(Compartment::new("Vurine", 1.0, Unit::Litre).name("urine"))
        .compartment(Compartment::new("Vfeces", 1.0, Unit::Litre).name("feces"))
        // species
        .species(
            Species::amount("dul_sc", "Vext", 0.0)
                .name("dulaglutide (subcutaneous depot)")
                .annotate(Annotation::new(Qualifier::Is, "pkdb/PKDB00574")),
        )
        .species(
            Species::concentration("Cve_dul", "Vext", 0.0)
                .name("dulaglutide (plasma)")
                .annotate(Annotation::new(Qualifier::Is, "pkdb/PKDB00574")),
        )
        .species(
            Species::concentration("Cve_dm", "Vext", 0.0).name("dulaglutide metabolites (plasma)"),
        )
        .species(Species::concentration("dm_li", "Vli", 0.0).name("dulaglutide metabolites (liver)"))
        .species(Species::amount("dm_bi", "Vbi", 0.0).name("dulaglutide metabolites (bile)"))
        .species(
            Species::concentration("dm_lumen", "Vlumen", 0.0)
                .name("dulaglutide metabolites (lumen)"),
        )
        .species(Species::amount("dm_urine", "Vurine", 0.0).name("dulaglutide metabolites (urine)"))
        .species(Species::amount("dm_feces", "Vfeces", 0.0).name("dulaglutide metabolites (feces)"))
        // dosing
        .parameter(
            Parameter::constant("Mr_dul", MR_DUL, Unit::GramPerMole)
                .name("molecular weight dulaglutide")
                .sbo(SboTerm::QuantitativeParameter),
        )
        .parameter(
            Parameter::constant("SCDOSE_dul", 0.0, Unit::Mg).name("subcutaneous dulaglutide dose"),
        )
        .parameter(
            Parameter::constant("IVDOSE_dul", 0.0, Unit::Mg).name("intravenous dulaglutide dose"),
        )
        .dose(DoseParameter::new(
            "SCDOSE_dul",
            "dul_sc",
            sym("SCDOSE_dul") / sym("Mr_dul"),
        ))
        .dose(DoseParameter::new(
            "IVDOSE_dul",
            "Cve_dul",
            sym("IVDOSE_dul") / sym("Mr_dul"),
        ))
        // kinetic constants
        .parameter(
            Parameter::constant("Ksc_dul", 0.001, Unit::PerMin)
                .name("rate subcutaneous dulaglutide absorption")
                .sbo(SboTerm::KineticConstant),
        )
        .parameter(
            Parameter::constant("DUL2DM_k", 0.001, Unit::LitrePerMin)
                .name("rate plasma cleavage of dulaglutide")
                .sbo(SboTerm::KineticConstant),
        )
        .parameter(
            Parameter::constant("KI__DMEX_k", 0.1, Unit::PerMin)
                .name("rate urinary excretion of dulaglutide metabolites")
                .sbo(SboTerm::KineticConstant),
        )
        .parameter(
            Parameter::constant("KI__f_renal_function", 1.0, Unit::Dimensionless)
                .name("parameter for renal function")
                .notes(
                    "scaling factor for renal function. 1.0: normal renal function; \
                     <1.0: reduced renal function; >1.0: increased renal function.",
                ),
        )
        .parameter(
            Parameter::constant("LI__LMEX_k", 0.003949307625018046, Unit::PerMin)
                .name("rate hepatic metabolite transport")
                .sbo(SboTerm::KineticConstant),
        )
        .parameter(
            Parameter::constant("f_cirrhosis", 0.0, Unit::Dimensionless)
                .name("severity of cirrhosis")
                .notes(
                    "0.0: healthy liver; fraction of functional liver tissue lost \
                     with increasing severity (CPT A/B/C).",
                ),
        )
        .parameter(
            Parameter::constant("GU__DMEXC_k", 0.0003920629361513939, Unit::PerMin)
                .name("rate of dulaglutide metabolite fecal excretion")
                .sbo(SboTerm::KineticConstant),
        )
        // observables
        .parameter(
            Parameter::dynamic("Cve_dmtot", f64::NAN, Unit::MilliMolar)
                .name("dulaglutide and metabolites (plasma)"),
        )
        .parameter(Parameter::dynamic("Aurine_dm", f64::NAN, Unit::MMole))
        .parameter(Parameter::dynamic("Afeces_dm", f64::NAN, Unit::MMole))
        .assignment_rule(AssignmentRule::new(
            "Cve_dmtot",
            sym("Cve_dul") + sym("Cve_dm"),
            Unit::MilliMolar,
        ))
        .assignment_rule(AssignmentRule::new(
            "Aurine_dm",
            sym("dm_urine"),
            Unit::MMole,
        ))
        .assignment_rule(AssignmentRule::new(
            "Afeces_dm",
            sym("dm_feces"),
            Unit::MMole,
        ))
        // absorption and cleavage
        .reaction(
            Reaction::new("DULABS", sym("Ksc_dul") * sym("dul_sc"))
                .name("dulaglutide absorption from subcutaneous depot")
                .compartment("Vext")
                .sbo(SboTerm::TransportReaction)
                .reactant("dul_sc")
                .product("Cve_dul"),
        )
        .reaction(
            Reaction::new("DUL2DM", sym("DUL2DM_k") * sym("Cve_dul"))
                .name("plasma cleavage dulaglutide to metabolites")
                .compartment("Vext")
                .sbo(SboTerm::BiochemicalReaction)
                .reactant("Cve_dul")
                .product("Cve_dm"),
        )
        // kidney
        .reaction(
            Reaction::new(
                "KI__DMEX",
                sym("KI__f_renal_function") * sym("KI__DMEX_k") * sym("Vki") * sym("Cve_dm"),
            )
            .name("urinary dulaglutide metabolite excretion")
            .compartment("Vki")
            .sbo(SboTerm::TransportReaction)
            .reactant("Cve_dm")
            .product("dm_urine"),
        )
        // liver: import, bile export, enterohepatic circulation
        .reaction(
            Reaction::new(
                "LI__LMIM",
                (num(1.0) - sym("f_cirrhosis")) * sym("LI__LMEX_k") * sym("Vli") * sym("Cve_dm"),
            )
            .name("hepatic dulaglutide metabolite import")
            .compartment("Vli")
            .sbo(SboTerm::TransportReaction)
            .reactant("Cve_dm")
            .product("dm_li"),
        )
        .reaction(
            Reaction::new(
                "LI__LMEX",
                (num(1.0) - sym("f_cirrhosis")) * sym("LI__LMEX_k") * sym("Vli") * sym("dm_li"),
            )
            .name("hepatic dulaglutide metabolite bile export")
            .compartment("Vli")
            .sbo(SboTerm::TransportReaction)
            .reactant("dm_li")
            .product("dm_bi"),
        )
        .reaction(
            Reaction::new("LI__LMEHC", sym("LI__LMEX_k") * sym("dm_bi"))
                .name("dulaglutide metabolite enterohepatic circulation")
                .compartment("Vlumen")
                .sbo(SboTerm::TransportReaction)
                .reactant("dm_bi")
                .product("dm_lumen"),
        )
        // intestine: lumen into the transit chain
        .reaction(
            Reaction::new("GU__DMEXC", sym("GU__DMEXC_k") * sym("Vgu") * sym("dm_lumen"))
                .name("dulaglutide metabolite transit into intestine")
                .compartment("Vlumen")
                .sbo(SboTerm::TransportReaction)
                .reactant("dm_lumen")
                .product("dm_int_0"),
        );

    for k in 0..N_CHAIN {
        m = m
            .compartment(
                Compartment::new(format!("Vint_{k}"), 0.1, Unit::Litre).name("intestinal segment"),
            )
            .species(
                Species::concentration(format!("dm_int_{k}"), format!("Vint_{k}"), 0.0)
                    .name(format!("dulaglutide metabolites (intestine) {k}")),
            );
    }
    for k in 0..N_CHAIN {
        let source = format!("dm_int_{k}");
        let target = if k < N_CHAIN - 1 {
            format!("dm_int_{}", k + 1)
        } else {
            "dm_feces".to_string()
        };
        m = m.reaction(
            Reaction::new(
                format!("GU__DMEXC_{k}"),
                sym("GU__DMEXC_k") * sym(format!("Vint_{k}")) * sym(&*source),
            )
            .name(format!("dulaglutide metabolite transit {k}"))
            .compartment("Vlumen")
            .sbo(SboTerm::TransportReaction)
            .reactant(source)
            .product(target),
        );
    }

    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{simulate, Timecourse, TimecourseSim};
    use crate::units::Quantity;
    use approx::assert_relative_eq;

    #[test]
    fn test_pk_model_compiles() {
        let compiled = dulaglutide_pk().compile().unwrap();
        // 8 named species plus the transit chain
        assert_eq!(compiled.nstates(), 8 + N_CHAIN);
    }

    #[test]
    fn test_mass_balance_sc_dose() {
        let compiled = dulaglutide_pk().compile().unwrap();
        let sim = TimecourseSim::single(
            Timecourse::new(0.0, 7.0 * 24.0 * 60.0, 500)
                .change("SCDOSE_dul", Quantity::new(1.5, Unit::Mg)),
        );
        let mut selections: Vec<String> = [
            "dul_sc",
            "[Cve_dul]",
            "[Cve_dm]",
            "[dm_li]",
            "dm_bi",
            "[dm_lumen]",
            "Aurine_dm",
            "Afeces_dm",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        for k in 0..N_CHAIN {
            selections.push(format!("[dm_int_{k}]"));
        }
        let result = simulate(&compiled, &sim, &selections, false).unwrap();

        let dose = 1.5 / MR_DUL;
        let last = result.len() - 1;
        let mut total = result.column("dul_sc").unwrap()[last]
            + result.column("[Cve_dul]").unwrap()[last] * 1.5
            + result.column("[Cve_dm]").unwrap()[last] * 1.5
            + result.column("[dm_li]").unwrap()[last] * 1.5
            + result.column("dm_bi").unwrap()[last]
            + result.column("[dm_lumen]").unwrap()[last] * 1.2825 * 0.9
            + result.column("Aurine_dm").unwrap()[last]
            + result.column("Afeces_dm").unwrap()[last];
        for k in 0..N_CHAIN {
            total += result.column(&format!("[dm_int_{k}]")).unwrap()[last] * 0.1;
        }
        assert_relative_eq!(total, dose, max_relative = 1e-2);
    }

    #[test]
    fn test_renal_impairment_slows_excretion() {
        let compiled = dulaglutide_pk().compile().unwrap();
        let base = Timecourse::new(0.0, 14.0 * 24.0 * 60.0, 500)
            .change("SCDOSE_dul", Quantity::new(1.5, Unit::Mg));
        let impaired = base
            .clone()
            .change("KI__f_renal_function", Quantity::new(0.19, Unit::Dimensionless));
        let selections = vec!["Aurine_dm".to_string()];
        let normal = simulate(&compiled, &TimecourseSim::single(base), &selections, false).unwrap();
        let reduced =
            simulate(&compiled, &TimecourseSim::single(impaired), &selections, false).unwrap();
        let last = normal.len() - 1;
        assert!(
            reduced.column("Aurine_dm").unwrap()[last]
                < normal.column("Aurine_dm").unwrap()[last]
        );
    }
}
