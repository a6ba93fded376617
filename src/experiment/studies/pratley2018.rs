//! Pratley2018: 0.75 and 1.5 mg weekly over 40 weeks in T2DM on metformin;
//! HbA1c, HbA1c change, FPG change and bodyweight change.

use std::collections::BTreeMap;
use std::path::Path;

use crate::data::{load_datasets, DataSet};
use crate::error::DulasimError;
use crate::experiment::base::{self, WEEK};
use crate::experiment::metadata::{
    ApplicationForm, Coadministration, Dosing, Fasting, Health, MappingMetaData, Route, Tissue,
};
use crate::experiment::{Experiment, FitData, FitMapping};
use crate::simulator::{Timecourse, TimecourseSim};
use crate::units::{Quantity, Unit};

pub struct Pratley2018;

// intervention, dose [mg], bodyweight [kg], hba1c [percent], fpg [mM]
const ARMS: [(&str, f64, f64, f64, f64); 2] = [
    ("DUL075", 0.75, 95.6, 8.2, 9.7),
    ("DUL15", 1.5, 93.4, 8.2, 9.6),
];
const WEEKS: usize = 40;

const INFO: [(&str, &str); 4] = [
    ("hba1c", "hba1c"),
    ("hba1c_change", "hba1c_change"),
    ("BW_change", "bodyweight_change"),
    ("fpg_change", "fpg_change"),
];

impl Experiment for Pratley2018 {
    fn name(&self) -> &str {
        "Pratley2018"
    }

    fn simulations(&self) -> BTreeMap<String, TimecourseSim> {
        let mut tcsims = BTreeMap::new();
        for (intervention, dose, bodyweight, hba1c, fpg) in ARMS {
            let tc0 = Timecourse::new(0.0, WEEK, 1000)
                .changes(base::default_changes())
                .changes(base::baseline_changes(bodyweight, hba1c, fpg))
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
        for fig_id in ["Fig2a", "Fig2c", "Fig2g"] {
            dsets.extend(load_datasets(&format!("Pratley2018_{fig_id}"), data_path)?);
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
