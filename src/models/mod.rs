//! Model definitions for dulaglutide kinetics and effects.
//!
//! Three submodels are composed into the whole-body model used by the
//! experiments: the physiological dulaglutide PK model, the bodyweight
//! model and the HbA1c/FPG model. Coupling is through assignment rules
//! mapping the venous dulaglutide concentration onto the PD drug inputs.

use crate::error::DulasimError;
use crate::model::expr::sym;
use crate::model::{AssignmentRule, Model, Parameter};
use crate::units::Unit;

mod bodyweight;
mod dulaglutide;
mod hba1c;

pub use bodyweight::bodyweight;
pub use dulaglutide::{dulaglutide_pk, MR_DUL, N_CHAIN};
pub use hba1c::{hba1c, k_turnover};

/// Whole-body model: PK coupled to bodyweight and HbA1c/FPG dynamics.
///
/// The PD submodels take their drug inputs (`D`, `glp1`) as plain dynamic
/// parameters; here both are driven by the venous plasma concentration
/// `Cve_dul` of the PK submodel.
pub fn dulaglutide_body() -> Result<Model, DulasimError> {
    let coupling = Model::new("coupling")
        .parameter(
            Parameter::dynamic("D", 0.0, Unit::MilliMolar)
                .name("GLP-1 agonist concentration in plasma"),
        )
        .parameter(
            Parameter::dynamic("glp1", 0.0, Unit::MilliMolar)
                .name("GLP-1 agonist concentration in plasma"),
        )
        .assignment_rule(AssignmentRule::new("D", sym("Cve_dul"), Unit::MilliMolar))
        .assignment_rule(AssignmentRule::new("glp1", sym("Cve_dul"), Unit::MilliMolar));

    let mut model = dulaglutide_pk()
        .merge(coupling)?
        .merge(bodyweight())?
        .merge(hba1c())?;
    model.sid = "dulaglutide_body".to_string();
    model.name = Some("Whole-body model of dulaglutide and its effects".to_string());
    Ok(model)
}
