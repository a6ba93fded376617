//! Liu2025: biosimilar LY05008 vs dulaglutide, 1.5 mg weekly over 24 weeks;
//! dulaglutide plasma concentrations and HbA1c change.

use std::collections::BTreeMap;
use std::path::Path;

use crate::data::{load_datasets, DataSet};
use crate::error::DulasimError;
use crate::experiment::base::{self, apg_from_hba1c, MR_DUL, WEEK};
use crate::experiment::metadata::{
    ApplicationForm, Coadministration, Dosing, Fasting, Health, MappingMetaData, Route, Tissue,
};
use crate::experiment::{Experiment, FitData, FitMapping};
use crate::simulator::{Timecourse, TimecourseSim};
use crate::units::{Quantity, Unit};

pub struct Liu2025;

// intervention, dose [mg], bodyweight [kg], hba1c [percent]
const ARMS: [(&str, f64, f64, f64); 2] = [
    ("LY05008", 1.5, 73.40, 8.23),
    ("DUL15", 1.5, 73.94, 8.09),
];
const WEEKS: usize = 24;

impl Experiment for Liu2025 {
    fn name(&self) -> &str {
        "Liu2025"
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
        for fig_id in ["Fig3", "Tab2"] {
            for (label, mut dset) in load_datasets(&format!("Liu2025_{fig_id}"), data_path)? {
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
        // pharmacokinetics
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
                        Dosing::Multiple,
                        Health::Healthy,
                        Fasting::NotReported,
                        Coadministration::Metformin,
                    ),
                ),
            );
        }
        // pharmacodynamics
        for (intervention, ..) in ARMS {
            mappings.insert(
                format!("fm_dul_hba1c_change_{intervention}"),
                FitMapping::new(
                    FitData::reference(format!("hba1c_change_{intervention}"), "mean")
                        .sd("mean_sd"),
                    FitData::observable(format!("task_dul_{intervention}"), "hba1c_change"),
                    MappingMetaData::new(
                        Tissue::Plasma,
                        Route::Sc,
                        ApplicationForm::Solution,
                        Dosing::Multiple,
                        Health::T2dm,
                        Fasting::NotReported,
                        Coadministration::None,
                    ),
                ),
            );
        }
        mappings
    }
}
