//! FDA GBCN trial: single 1.5 mg sc at different injection sites (abdomen,
//! upper arm, thigh) in healthy subjects.

use std::collections::BTreeMap;
use std::path::Path;

use crate::data::{load_datasets, DataSet};
use crate::error::DulasimError;
use crate::experiment::base::{self, MR_DUL};
use crate::experiment::metadata::{
    ApplicationForm, Coadministration, Dosing, Fasting, Health, InjectionSite, MappingMetaData,
    Route, Tissue,
};
use crate::experiment::{Experiment, FitData, FitMapping};
use crate::simulator::{Timecourse, TimecourseSim};
use crate::units::{Quantity, Unit};

pub struct FdaGbcn;

const GROUPS: [(&str, InjectionSite); 3] = [
    ("abdomen", InjectionSite::Abdomen),
    ("arm", InjectionSite::UpperArm),
    ("thigh", InjectionSite::Thigh),
];
const BODYWEIGHT: f64 = 84.53;
const DOSE: f64 = 1.5;

impl Experiment for FdaGbcn {
    fn name(&self) -> &str {
        "FDAGBCN"
    }

    fn simulations(&self) -> BTreeMap<String, TimecourseSim> {
        let mut tcsims = BTreeMap::new();
        for (group, _) in GROUPS {
            let tc = Timecourse::new(0.0, 16.0 * 24.0 * 60.0, 1000)
                .changes(base::default_changes())
                .changes(base::healthy_changes(BODYWEIGHT))
                .change("SCDOSE_dul", Quantity::new(DOSE, Unit::Mg));
            tcsims.insert(format!("dul_{group}"), TimecourseSim::single(tc));
        }
        tcsims
    }

    fn datasets(&self, data_path: &Path) -> Result<BTreeMap<String, DataSet>, DulasimError> {
        let mut dsets = BTreeMap::new();
        for fig_id in ["Fig34"] {
            for (label, mut dset) in load_datasets(&format!("FDAGBCN_{fig_id}"), data_path)? {
                dset.unit_conversion("mean", 1.0 / MR_DUL)?;
                dsets.insert(label, dset);
            }
        }
        Ok(dsets)
    }

    fn fit_mappings(&self) -> BTreeMap<String, FitMapping> {
        let mut mappings = BTreeMap::new();
        for (group, site) in GROUPS {
            mappings.insert(
                format!("fm_dul_{group}"),
                FitMapping::new(
                    FitData::reference(format!("dulaglutide_{group}"), "mean").sd("mean_sd"),
                    FitData::observable(format!("task_dul_{group}"), "[Cve_dul]"),
                    MappingMetaData::new(
                        Tissue::Plasma,
                        Route::Sc,
                        ApplicationForm::Solution,
                        Dosing::Single,
                        Health::Healthy,
                        Fasting::NotReported,
                        Coadministration::None,
                    )
                    .injection_site(site),
                ),
            );
        }
        mappings
    }
}
