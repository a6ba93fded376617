//! Experiment execution.
//!
//! The runner resolves named experiment groups, executes every task of every
//! experiment in the group and writes one CSV result table per task to the
//! output directory. Group selections fail independently: an unknown group
//! name aborts only that selection, results from the other groups are kept.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::error::DulasimError;
use crate::experiment::{base, misc, studies, Experiment};
use crate::simulator::{simulate, SimResult};

pub const GROUPS: [&str; 3] = ["studies", "misc", "all"];

fn group_experiments(name: &str) -> Result<Vec<Box<dyn Experiment>>, DulasimError> {
    match name {
        "studies" => Ok(studies::experiments()),
        "misc" => Ok(misc::experiments()),
        "all" => {
            let mut experiments = studies::experiments();
            experiments.extend(misc::experiments());
            Ok(experiments)
        }
        _ => Err(DulasimError::UnknownGroup(
            name.to_string(),
            GROUPS.join(", "),
        )),
    }
}

/// Results of one experiment, keyed by task name.
pub type ExperimentResults = BTreeMap<String, SimResult>;

#[derive(Debug, Default)]
pub struct RunSummary {
    /// Results per experiment name.
    pub results: BTreeMap<String, ExperimentResults>,
    /// Group selections that failed, with their error.
    pub failures: Vec<(String, DulasimError)>,
}

pub struct ExperimentRunner {
    data_path: PathBuf,
    output_dir: PathBuf,
    cache: bool,
}

impl ExperimentRunner {
    pub fn new(data_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            output_dir: output_dir.into(),
            cache: true,
        }
    }

    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache = enabled;
        self
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Run the given group selections. Failed selections are recorded in the
    /// summary, successful ones are unaffected.
    pub fn run(&self, groups: &[&str]) -> RunSummary {
        let mut summary = RunSummary::default();
        for group in groups {
            match self.run_group(group) {
                Ok(results) => summary.results.extend(results),
                Err(err) => {
                    error!(group, %err, "group selection failed");
                    summary.failures.push((group.to_string(), err));
                }
            }
        }
        summary
    }

    pub fn run_group(
        &self,
        name: &str,
    ) -> Result<BTreeMap<String, ExperimentResults>, DulasimError> {
        let experiments = group_experiments(name)?;
        info!(group = name, n = experiments.len(), "running experiments");
        let mut all_results = BTreeMap::new();
        for experiment in experiments {
            let results = self.run_experiment(experiment.as_ref())?;
            all_results.insert(experiment.name().to_string(), results);
        }
        Ok(all_results)
    }

    /// Execute all tasks of one experiment and write the result tables.
    pub fn run_experiment(
        &self,
        experiment: &dyn Experiment,
    ) -> Result<ExperimentResults, DulasimError> {
        let name = experiment.name();
        let model = experiment.model()?;
        let simulations = experiment.simulations();
        let datasets = experiment.datasets(&self.data_path)?;
        info!(
            experiment = name,
            tasks = simulations.len(),
            datasets = datasets.len(),
            "running experiment"
        );

        let selections = base::selections();
        let mut results = ExperimentResults::new();
        let experiment_dir = self.output_dir.join(name);
        std::fs::create_dir_all(&experiment_dir)?;
        for task in experiment.tasks() {
            // tasks are derived from simulations, the key is always present
            let sim = &simulations[&task.simulation];
            let result = simulate(&model, sim, &selections, self.cache)?;
            let file = std::fs::File::create(experiment_dir.join(format!("{}.csv", task.name)))?;
            result.write_csv(file)?;
            results.insert(task.name, result);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_group_aborts_only_selection() {
        let runner = ExperimentRunner::new("data", std::env::temp_dir().join("dulasim_run_test"));
        let summary = runner.run(&["nonsense"]);
        assert!(summary.results.is_empty());
        assert_eq!(summary.failures.len(), 1);
        assert!(matches!(
            summary.failures[0].1,
            DulasimError::UnknownGroup(..)
        ));
    }

    #[test]
    fn test_group_resolution() {
        assert_eq!(group_experiments("studies").unwrap().len(), 9);
        assert_eq!(group_experiments("misc").unwrap().len(), 1);
        assert_eq!(group_experiments("all").unwrap().len(), 10);
        assert!(group_experiments("other").is_err());
    }
}
