//! Physiologically based models of dulaglutide pharmacokinetics and its
//! effects on bodyweight, HbA1c and fasting plasma glucose.
//!
//! Models are built declaratively ([`model`]), compiled to flat ODE systems
//! and integrated piecewise ([`simulator`]). Clinical studies are described
//! as [`experiment::Experiment`]s pairing simulations with reference data;
//! the [`fit`] layer estimates parameters against them, [`pk`] derives
//! non-compartmental parameters and [`sensitivity`] quantifies local
//! parameter influence.

pub mod data;
pub mod error;
pub mod experiment;
pub mod fit;
pub mod model;
pub mod models;
pub mod pk;
pub mod run;
pub mod sensitivity;
pub mod simulator;
pub mod units;

pub use error::DulasimError;

pub mod prelude {
    pub use crate::error::DulasimError;
    pub use crate::experiment::{Experiment, FitData, FitMapping};
    pub use crate::model::expr::{num, sym};
    pub use crate::model::{
        AssignmentRule, Compartment, DoseParameter, InitialAssignment, Model, Parameter, RateRule,
        Reaction, Species,
    };
    pub use crate::models::{bodyweight, dulaglutide_body, dulaglutide_pk, hba1c};
    pub use crate::run::ExperimentRunner;
    pub use crate::simulator::{simulate, SimResult, Timecourse, TimecourseSim};
    pub use crate::units::{Quantity, Unit};
}
