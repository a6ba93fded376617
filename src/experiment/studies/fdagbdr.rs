//! FDA GBDR trial: absolute bioavailability study, 0.1 mg iv versus 0.75 and
//! 1.5 mg sc (plus a 0.75 mg im arm treated as sc).

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

pub struct FdaGbdr;

// group, dose [mg], dose parameter, duration [days]
const GROUPS: [(&str, f64, &str, f64); 4] = [
    ("DUL01IV", 0.1, "IVDOSE_dul", 6.0),
    ("DUL15SC", 1.5, "SCDOSE_dul", 15.0),
    ("DUL075SC", 0.75, "SCDOSE_dul", 15.0),
    // no im route in the model, applied as sc
    ("DUL075IM", 0.75, "SCDOSE_dul", 8.0),
];
const BODYWEIGHT: f64 = 70.0;

impl Experiment for FdaGbdr {
    fn name(&self) -> &str {
        "FDAGBDR"
    }

    fn simulations(&self) -> BTreeMap<String, TimecourseSim> {
        let mut tcsims = BTreeMap::new();
        for (group, dose, dose_parameter, days) in GROUPS {
            let tc = Timecourse::new(0.0, days * 24.0 * 60.0, 1000)
                .changes(base::default_changes())
                .changes(base::healthy_changes(BODYWEIGHT))
                .change(dose_parameter, Quantity::new(dose, Unit::Mg));
            tcsims.insert(format!("dul_{group}"), TimecourseSim::single(tc));
        }
        tcsims
    }

    fn datasets(&self, data_path: &Path) -> Result<BTreeMap<String, DataSet>, DulasimError> {
        let mut dsets = BTreeMap::new();
        for fig_id in ["Fig15", "Fig32"] {
            for (label, mut dset) in load_datasets(&format!("FDAGBDR_{fig_id}"), data_path)? {
                dset.unit_conversion("mean", 1.0 / MR_DUL)?;
                dsets.insert(label, dset);
            }
        }
        Ok(dsets)
    }

    fn fit_mappings(&self) -> BTreeMap<String, FitMapping> {
        let mut mappings = BTreeMap::new();
        for (group, route) in [
            ("DUL01IV", Route::Iv),
            ("DUL15SC", Route::Sc),
            ("DUL075SC", Route::Sc),
        ] {
            mappings.insert(
                format!("fm_dul_{group}"),
                FitMapping::new(
                    FitData::reference(format!("dulaglutide_{group}"), "mean").sd("mean_sd"),
                    FitData::observable(format!("task_dul_{group}"), "[Cve_dul]"),
                    MappingMetaData::new(
                        Tissue::Plasma,
                        route,
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
