//! Nauck2014: placebo, 0.75 and 1.5 mg weekly over 52 weeks in T2DM on
//! metformin; HbA1c, FPG change and bodyweight change.

use std::collections::BTreeMap;
use std::path::Path;

use crate::data::{load_datasets, DataSet};
use crate::error::DulasimError;
use crate::experiment::base::{self, apg_from_hba1c, MR_GLC, WEEK};
use crate::experiment::metadata::{
    ApplicationForm, Coadministration, Dosing, Fasting, Health, MappingMetaData, Route, Tissue,
};
use crate::experiment::{Experiment, FitData, FitMapping};
use crate::simulator::{Timecourse, TimecourseSim};
use crate::units::{Quantity, Unit};

pub struct Nauck2014;

// intervention, dose [mg], bodyweight [kg], hba1c [percent]
const ARMS: [(&str, f64, f64, f64); 3] = [
    ("PLAC", 0.0, 87.0, 8.1),
    ("DUL075", 0.75, 86.0, 8.2),
    ("DUL15", 1.5, 87.0, 8.1),
];
const WEEKS: usize = 52;

const INFO: [(&str, &str); 3] = [
    ("hba1c", "hba1c"),
    ("fpg_change", "fpg_change"),
    ("BW_change", "bodyweight_change"),
];

impl Experiment for Nauck2014 {
    fn name(&self) -> &str {
        "Nauck2014"
    }

    fn simulations(&self) -> BTreeMap<String, TimecourseSim> {
        let mut tcsims = BTreeMap::new();
        for (intervention, dose, bodyweight, hba1c) in ARMS {
            let tc0 = Timecourse::new(0.0, WEEK, 1000)
                .changes(base::default_changes())
                .changes(base::baseline_changes(
                    bodyweight,
                    hba1c,
                    apg_from_hba1c(hba1c),
                ))
                .change("SCDOSE_dul", Quantity::new(dose, Unit::Mg));
            let tc1 =
                Timecourse::new(0.0, WEEK, 1000).change("SCDOSE_dul", Quantity::new(dose, Unit::Mg));
            let mut timecourses = vec![tc0];
            timecourses.extend(std::iter::repeat(tc1).take(WEEKS));
            tcsims.insert(format!("dul_{intervention}"), TimecourseSim::new(timecourses));
        }
        tcsims
    }

    fn datasets(&self, data_path: &Path) -> Result<BTreeMap<String, DataSet>, DulasimError> {
        let mut dsets = BTreeMap::new();
        for fig_id in ["Fig2b", "Fig2d", "Fig2e"] {
            for (label, mut dset) in load_datasets(&format!("Nauck2014_{fig_id}"), data_path)? {
                // mass to molar concentration
                if label.starts_with("fpg_change_") {
                    dset.unit_conversion("mean", 1.0 / MR_GLC)?;
                }
                dsets.insert(label, dset);
            }
        }
        Ok(dsets)
    }

    fn fit_mappings(&self) -> BTreeMap<String, FitMapping> {
        let mut mappings = BTreeMap::new();
        for (sid, name) in INFO {
            for (intervention, ..) in ARMS {
                mappings.insert(
                    format!("fm_dul_{intervention}__{name}"),
                    FitMapping::new(
                        FitData::reference(format!("{name}_{intervention}"), "mean").sd("mean_sd"),
                        FitData::observable(format!("task_dul_{intervention}"), sid),
                        MappingMetaData::new(
                            Tissue::Plasma,
                            Route::Sc,
                            ApplicationForm::Solution,
                            Dosing::Multiple,
                            Health::T2dm,
                            Fasting::NotReported,
                            Coadministration::Metformin,
                        ),
                    ),
                );
            }
        }
        mappings
    }
}
