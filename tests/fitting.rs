//! Parameter recovery on synthetic bodyweight data.

use std::collections::BTreeMap;
use std::path::Path;

use dulasim::data::{load_datasets, DataSet};
use dulasim::error::DulasimError;
use dulasim::experiment::metadata::{
    ApplicationForm, Coadministration, Dosing, Fasting, Health, MappingMetaData, Route, Tissue,
};
use dulasim::experiment::{Experiment, FitData, FitMapping};
use dulasim::fit::{FitParameter, FitProblem};
use dulasim::model::compile::CompiledModel;
use dulasim::prelude::*;

const TEND: f64 = 8.0 * 7.0 * 24.0 * 60.0;
const EMAX_TRUE: f64 = 2.0e-5;

fn drug_sim() -> TimecourseSim {
    // saturating drug level, fat loss rate is then Emax_FAT itself
    TimecourseSim::single(
        Timecourse::new(0.0, TEND, 40).change("D", Quantity::new(1.0, Unit::MilliMolar)),
    )
}

struct SyntheticWeightLoss;

impl Experiment for SyntheticWeightLoss {
    fn name(&self) -> &str {
        "SyntheticWeightLoss"
    }

    fn model(&self) -> Result<CompiledModel, DulasimError> {
        bodyweight().compile()
    }

    fn simulations(&self) -> BTreeMap<String, TimecourseSim> {
        BTreeMap::from([("weightloss".to_string(), drug_sim())])
    }

    fn datasets(&self, data_path: &Path) -> Result<BTreeMap<String, DataSet>, DulasimError> {
        load_datasets("SyntheticWeightLoss_Fig1", data_path)
    }

    fn fit_mappings(&self) -> BTreeMap<String, FitMapping> {
        BTreeMap::from([(
            "fm_weightloss".to_string(),
            FitMapping::new(
                FitData::reference("bodyweight_change", "mean"),
                FitData::observable("task_weightloss", "BW_change"),
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
        )])
    }
}

/// Simulate the reference trajectory with the known parameter and write it as
/// a study data file.
fn write_synthetic_data(data_dir: &Path) {
    std::fs::create_dir_all(data_dir).unwrap();
    let model = bodyweight().compile().unwrap();
    let mut sim = drug_sim();
    sim.timecourses[0]
        .changes
        .push(("Emax_FAT".to_string(), Quantity::new(EMAX_TRUE, Unit::PerMin)));
    let result = simulate(&model, &sim, &["BW_change".to_string()], false).unwrap();
    let values = result.column("BW_change").unwrap();

    let mut csv = String::from("label,time,mean\n");
    for (t, v) in result.time().iter().zip(values) {
        csv.push_str(&format!("bodyweight_change,{t},{v}\n"));
    }
    std::fs::write(data_dir.join("SyntheticWeightLoss_Fig1.csv"), csv).unwrap();
}

#[test]
fn recovers_fat_loss_rate() {
    let data_dir = std::env::temp_dir().join("dulasim_it_fit");
    write_synthetic_data(&data_dir);

    let model = bodyweight().compile().unwrap();
    let parameters = vec![FitParameter::new(
        "Emax_FAT",
        1e-7,
        1.0e-5,
        1e-3,
        Unit::PerMin,
    )];
    let mut problem = FitProblem::new(model, parameters);
    problem
        .add_experiment(&SyntheticWeightLoss, &data_dir, &[])
        .unwrap();
    assert_eq!(problem.nentries(), 1);

    let result = problem.optimize().unwrap();
    let (name, value) = &result.parameters[0];
    assert_eq!(name, "Emax_FAT");
    // synthetic data is noise free, Nelder-Mead gets close to the truth
    assert!((value - EMAX_TRUE).abs() / EMAX_TRUE < 0.2, "value = {value}");
    assert!(result.cost < 1.0);
}
