//! Zhang2023: single 0.75 mg sc in healthy Chinese subjects (pilot and
//! formal study arms), dulaglutide plasma concentrations over 18 days.

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

pub struct Zhang2023;

// intervention, dose [mg], bodyweight [kg]
const ARMS: [(&str, f64, f64); 2] = [("DULP", 0.75, 63.43), ("DULF", 0.75, 65.98)];

impl Experiment for Zhang2023 {
    fn name(&self) -> &str {
        "Zhang2023"
    }

    fn simulations(&self) -> BTreeMap<String, TimecourseSim> {
        let mut tcsims = BTreeMap::new();
        for (intervention, dose, bodyweight) in ARMS {
            let tc = Timecourse::new(0.0, 18.0 * 24.0 * 60.0, 1000)
                .changes(base::default_changes())
                .changes(base::healthy_changes(bodyweight))
                .change("SCDOSE_dul", Quantity::new(dose, Unit::Mg));
            tcsims.insert(format!("dul_{intervention}"), TimecourseSim::single(tc));
        }
        tcsims
    }

    fn datasets(&self, data_path: &Path) -> Result<BTreeMap<String, DataSet>, DulasimError> {
        let mut dsets = BTreeMap::new();
        for fig_id in ["Fig2"] {
            for (label, mut dset) in load_datasets(&format!("Zhang2023_{fig_id}"), data_path)? {
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
        for (intervention, ..) in ARMS {
            mappings.insert(
                format!("fm_dul_{intervention}"),
                FitMapping::new(
                    FitData::reference(format!("dulaglutide_{intervention}"), "mean")
                        .sd("mean_sd"),
                    FitData::observable(format!("task_dul_{intervention}"), "[Cve_dul]"),
                    MappingMetaData::new(
                        Tissue::Plasma,
                        Route::Sc,
                        ApplicationForm::Solution,
                        Dosing::Single,
                        Health::Healthy,
                        Fasting::NotReported,
                        Coadministration::None,
                    ),
                ),
            );
        }
        mappings
    }
}
