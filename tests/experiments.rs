//! End-to-end runs of the experiment layer on a small synthetic experiment.

use std::collections::BTreeMap;
use std::path::Path;

use dulasim::data::{load_datasets, DataSet};
use dulasim::error::DulasimError;
use dulasim::experiment::{Experiment, Task};
use dulasim::model::compile::CompiledModel;
use dulasim::prelude::*;
use dulasim::run::ExperimentRunner;

struct BodyweightDecay;

impl Experiment for BodyweightDecay {
    fn name(&self) -> &str {
        "BodyweightDecay"
    }

    fn model(&self) -> Result<CompiledModel, DulasimError> {
        bodyweight().compile()
    }

    fn simulations(&self) -> BTreeMap<String, TimecourseSim> {
        let tc = Timecourse::new(0.0, 4.0 * 7.0 * 24.0 * 60.0, 50)
            .change("D", Quantity::new(1.0, Unit::MilliMolar));
        BTreeMap::from([("decay".to_string(), TimecourseSim::single(tc))])
    }

    fn datasets(&self, data_path: &Path) -> Result<BTreeMap<String, DataSet>, DulasimError> {
        load_datasets("BodyweightDecay_Fig1", data_path)
    }
}

fn write_reference_data(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        dir.join("BodyweightDecay_Fig1.csv"),
        "label,time,mean,mean_sd,unit\n\
         bodyweight_decay,0,75.0,1.0,kg\n\
         bodyweight_decay,20160,74.2,1.0,kg\n\
         bodyweight_decay,40320,73.5,1.1,kg\n",
    )
    .unwrap();
}

#[test]
fn runner_writes_task_results() {
    let base = std::env::temp_dir().join("dulasim_it_runner");
    let data_dir = base.join("data");
    let out_dir = base.join("results");
    write_reference_data(&data_dir);

    let runner = ExperimentRunner::new(&data_dir, &out_dir);
    let results = runner.run_experiment(&BodyweightDecay).unwrap();
    assert_eq!(results.len(), 1);
    let result = &results["task_decay"];
    assert_eq!(result.len(), 51);

    let csv = out_dir.join("BodyweightDecay").join("task_decay.csv");
    let content = std::fs::read_to_string(csv).unwrap();
    let mut lines = content.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("time,"));
    assert!(header.contains("BW_change"));
    assert_eq!(lines.count(), 51);
}

#[test]
fn missing_reference_data_is_reported() {
    let base = std::env::temp_dir().join("dulasim_it_runner_missing");
    std::fs::create_dir_all(base.join("data")).unwrap();
    let runner = ExperimentRunner::new(base.join("data"), base.join("results"));
    let err = runner.run_experiment(&BodyweightDecay).unwrap_err();
    assert!(matches!(err, DulasimError::MissingDataset { .. }));
}

#[test]
fn unknown_group_keeps_other_selections() {
    let base = std::env::temp_dir().join("dulasim_it_runner_groups");
    let runner = ExperimentRunner::new(base.join("data"), base.join("results"));
    let summary = runner.run(&["no-such-group"]);
    assert_eq!(summary.failures.len(), 1);
    let (group, err) = &summary.failures[0];
    assert_eq!(group, "no-such-group");
    assert!(err.to_string().contains("studies"));
}

#[test]
fn study_definitions_are_consistent() {
    use dulasim::experiment::studies;
    let model = dulaglutide_body().unwrap().compile().unwrap();
    for experiment in studies::experiments() {
        let sims = experiment.simulations();
        assert!(!sims.is_empty(), "{}", experiment.name());
        for Task { name, simulation } in experiment.tasks() {
            assert_eq!(name, format!("task_{simulation}"));
        }
        // every change target resolves against the whole-body model
        for sim in sims.values() {
            for tc in &sim.timecourses {
                assert!(tc.end > tc.start);
                for (key, _) in &tc.changes {
                    let sid = key.trim_start_matches('[').trim_end_matches(']');
                    assert!(
                        model.declared_unit(sid).is_some(),
                        "{}: unresolved '{key}'",
                        experiment.name()
                    );
                }
            }
        }
    }
}
