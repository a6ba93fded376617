//! Dungan2014: 1.5 mg weekly over 26 weeks in T2DM, HbA1c and bodyweight
//! change.

use std::collections::BTreeMap;
use std::path::Path;

use crate::data::{load_datasets, DataSet};
use crate::error::DulasimError;
use crate::experiment::base::{self, apg_from_hba1c, WEEK};
use crate::experiment::metadata::{
    ApplicationForm, Coadministration, Dosing, Fasting, Health, MappingMetaData, Route, Tissue,
};
use crate::experiment::{Experiment, FitData, FitMapping};
use crate::simulator::{Timecourse, TimecourseSim};
use crate::units::{Quantity, Unit};

pub struct Dungan2014;

const INTERVENTION: &str = "DUL15";
const DOSE: f64 = 1.5;
const BODYWEIGHT: f64 = 93.8;
const HBA1C: f64 = 8.1;
const WEEKS: usize = 26;

// observable -> dataset label prefix
const INFO: [(&str, &str); 2] = [
    ("hba1c", "hba1c"),
    ("BW_change", "bodyweight_change"),
];

impl Experiment for Dungan2014 {
    fn name(&self) -> &str {
        "Dungan2014"
    }

    fn simulations(&self) -> BTreeMap<String, TimecourseSim> {
        let tc0 = Timecourse::new(0.0, WEEK, 1000)
            .changes(base::default_changes())
            .changes(base::baseline_changes(
                BODYWEIGHT,
                HBA1C,
                apg_from_hba1c(HBA1C),
            ))
            .change("SCDOSE_dul", Quantity::new(DOSE, Unit::Mg));
        let tc1 =
            Timecourse::new(0.0, WEEK, 1000).change("SCDOSE_dul", Quantity::new(DOSE, Unit::Mg));
        let mut timecourses = vec![tc0];
        timecourses.extend(std::iter::repeat(tc1).take(WEEKS));

        BTreeMap::from([(
            format!("dul_{INTERVENTION}"),
            TimecourseSim::new(timecourses),
        )])
    }

    fn datasets(&self, data_path: &Path) -> Result<BTreeMap<String, DataSet>, DulasimError> {
        let mut dsets = BTreeMap::new();
        for fig_id in ["Fig2b", "Fig2f"] {
            dsets.extend(load_datasets(&format!("Dungan2014_{fig_id}"), data_path)?);
        }
        Ok(dsets)
    }

    fn fit_mappings(&self) -> BTreeMap<String, FitMapping> {
        let mut mappings = BTreeMap::new();
        for (sid, name) in INFO {
            mappings.insert(
                format!("fm_dul_{name}_{INTERVENTION}"),
                FitMapping::new(
                    FitData::reference(format!("{name}_{INTERVENTION}"), "mean").sd("mean_sd"),
                    FitData::observable(format!("task_dul_{INTERVENTION}"), sid),
                    MappingMetaData::new(
                        Tissue::Plasma,
                        Route::Sc,
                        ApplicationForm::Solution,
                        Dosing::Multiple,
                        Health::T2dm,
                        Fasting::NotReported,
                        Coadministration::AntihyperglycemicMedication,
                    ),
                ),
            );
        }
        mappings
    }
}
