//! FDA GBDO trial: single 1.5 mg sc in hepatic impairment (Child-Pugh A-C)
//! versus control.

use std::collections::BTreeMap;
use std::path::Path;

use crate::data::{load_datasets, DataSet};
use crate::error::DulasimError;
use crate::experiment::base::{self, CIRRHOSIS_MAP, MR_DUL};
use crate::experiment::metadata::{
    ApplicationForm, Coadministration, Dosing, Fasting, Health, MappingMetaData, Route, Tissue,
};
use crate::experiment::{Experiment, FitData, FitMapping};
use crate::simulator::{Timecourse, TimecourseSim};
use crate::units::{Quantity, Unit};

pub struct FdaGbdo;

const GROUPS: [(&str, &str); 4] = [
    ("control", "Control"),
    ("mildH", "Mild cirrhosis"),
    ("modH", "Moderate cirrhosis"),
    ("sevH", "Severe cirrhosis"),
];
const BODYWEIGHT: f64 = 80.0;
const DOSE: f64 = 1.5;

impl Experiment for FdaGbdo {
    fn name(&self) -> &str {
        "FDAGBDO"
    }

    fn simulations(&self) -> BTreeMap<String, TimecourseSim> {
        let mut tcsims = BTreeMap::new();
        for (group, grade) in GROUPS {
            let tc = Timecourse::new(0.0, 18.0 * 24.0 * 60.0, 1000)
                .changes(base::default_changes())
                // healthy baseline (2/48 subjects T2DM)
                .changes(base::healthy_changes(BODYWEIGHT))
                .change(
                    "f_cirrhosis",
                    Quantity::new(CIRRHOSIS_MAP[grade], Unit::Dimensionless),
                )
                .change("SCDOSE_dul", Quantity::new(DOSE, Unit::Mg));
            tcsims.insert(format!("dul_{group}"), TimecourseSim::single(tc));
        }
        tcsims
    }

    fn datasets(&self, data_path: &Path) -> Result<BTreeMap<String, DataSet>, DulasimError> {
        let mut dsets = BTreeMap::new();
        for fig_id in ["Fig45", "Fig45M"] {
            for (label, mut dset) in load_datasets(&format!("FDAGBDO_{fig_id}"), data_path)? {
                // individual readings are plotted only, not fitted
                if label.starts_with("indiv_") {
                    continue;
                }
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
        for (group, _) in GROUPS {
            let health = if group == "control" {
                Health::Healthy
            } else {
                Health::HepaticImpairment
            };
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
                        health,
                        Fasting::NotReported,
                        Coadministration::None,
                    ),
                ),
            );
        }
        mappings
    }
}
