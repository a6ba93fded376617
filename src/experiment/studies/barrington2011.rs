//! Barrington2011: single-dose escalation (0.1 - 12 mg sc) in healthy
//! subjects, dulaglutide plasma concentrations over 18 days.

use std::collections::BTreeMap;
use std::path::Path;

use crate::data::{load_datasets, DataSet};
use crate::error::DulasimError;
use crate::experiment::base::{self, MR_DUL};
use crate::experiment::metadata::{
    ApplicationForm, Coadministration, Dosing, Fasting, Health, MappingMetaData, Route, Tissue,
};
use crate::experiment::{Experiment, FitData, FitMapping};
use crate::simulator::{Timecourse, TimecourseSim};
use crate::units::{Quantity, Unit};

pub struct Barrington2011;

const INTERVENTIONS: [(&str, f64); 6] = [
    ("DUL01", 0.1),
    ("DUL03", 0.3),
    ("DUL1", 1.0),
    ("DUL3", 3.0),
    ("DUL6", 6.0),
    ("DUL12", 12.0),
];
const BODYWEIGHT: f64 = 74.6;

impl Experiment for Barrington2011 {
    fn name(&self) -> &str {
        "Barrington2011"
    }

    fn simulations(&self) -> BTreeMap<String, TimecourseSim> {
        let mut tcsims = BTreeMap::new();
        for (intervention, dose) in INTERVENTIONS {
            let tc = Timecourse::new(0.0, 18.0 * 24.0 * 60.0, 1000)
                .changes(base::default_changes())
                .changes(base::healthy_changes(BODYWEIGHT))
                .change("SCDOSE_dul", Quantity::new(dose, Unit::Mg));
            tcsims.insert(format!("dul_{intervention}"), TimecourseSim::single(tc));
        }
        tcsims
    }

    fn datasets(&self, data_path: &Path) -> Result<BTreeMap<String, DataSet>, DulasimError> {
        let mut dsets = BTreeMap::new();
        for fig_id in ["Fig1"] {
            for (label, mut dset) in load_datasets(&format!("Barrington2011_{fig_id}"), data_path)?
            {
                // mass to molar concentration
                if label.starts_with("dulaglutide_") {
                    dset.unit_conversion("mean", 1.0 / MR_DUL)?;
                }
                dsets.insert(label, dset);
            }
        }
        Ok(dsets)
    }

    fn fit_mappings(&self) -> BTreeMap<String, FitMapping> {
        let mut mappings = BTreeMap::new();
        for (intervention, _) in INTERVENTIONS {
            mappings.insert(
                format!("fm_dul_{intervention}"),
                FitMapping::new(
                    FitData::reference(format!("dulaglutide_{intervention}"), "mean"),
                    FitData::observable(format!("task_dul_{intervention}"), "[Cve_dul]"),
                    MappingMetaData::new(
                        Tissue::Plasma,
                        Route::Sc,
                        ApplicationForm::Solution,
                        Dosing::Single,
                        Health::Healthy,
                        Fasting::Fasted,
                        Coadministration::None,
                    ),
                ),
            );
        }
        mappings
    }
}
