//! Simulation experiments.
//!
//! An experiment is a pure description of one study: the model it runs on,
//! the named timecourse simulations, the reference datasets and the mappings
//! between simulated observables and measured series. Experiments have no
//! side effects; the [`crate::run`] layer executes them and the
//! [`crate::fit`] layer consumes their mappings.

use std::collections::BTreeMap;
use std::path::Path;

use crate::data::DataSet;
use crate::error::DulasimError;
use crate::model::compile::CompiledModel;
use crate::models::dulaglutide_body;
use crate::simulator::TimecourseSim;

pub mod base;
pub mod metadata;
pub mod misc;
pub mod studies;

use metadata::MappingMetaData;

/// Execution unit derived from an experiment: one simulation on its model.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub simulation: String,
}

/// One side of a fit mapping: a measured series or a simulated observable.
#[derive(Debug, Clone)]
pub enum FitData {
    Reference {
        dataset: String,
        xid: String,
        yid: String,
        yid_sd: Option<String>,
    },
    Observable {
        task: String,
        selection: String,
    },
}

impl FitData {
    pub fn reference(dataset: impl Into<String>, yid: impl Into<String>) -> Self {
        Self::Reference {
            dataset: dataset.into(),
            xid: "time".to_string(),
            yid: yid.into(),
            yid_sd: None,
        }
    }

    pub fn sd(self, column: impl Into<String>) -> Self {
        match self {
            Self::Reference {
                dataset, xid, yid, ..
            } => Self::Reference {
                dataset,
                xid,
                yid,
                yid_sd: Some(column.into()),
            },
            observable => observable,
        }
    }

    pub fn observable(task: impl Into<String>, selection: impl Into<String>) -> Self {
        Self::Observable {
            task: task.into(),
            selection: selection.into(),
        }
    }
}

/// Pairing of a measured series with the simulated observable it constrains.
#[derive(Debug, Clone)]
pub struct FitMapping {
    pub reference: FitData,
    pub observable: FitData,
    pub metadata: MappingMetaData,
}

impl FitMapping {
    pub fn new(reference: FitData, observable: FitData, metadata: MappingMetaData) -> Self {
        Self {
            reference,
            observable,
            metadata,
        }
    }
}

pub trait Experiment {
    fn name(&self) -> &str;

    /// Model the simulations run on; the whole-body model unless overridden.
    fn model(&self) -> Result<CompiledModel, DulasimError> {
        dulaglutide_body()?.compile()
    }

    fn simulations(&self) -> BTreeMap<String, TimecourseSim>;

    /// Reference datasets keyed by label. Experiments without data (scans,
    /// dose-dependency) use the default.
    fn datasets(&self, _data_path: &Path) -> Result<BTreeMap<String, DataSet>, DulasimError> {
        Ok(BTreeMap::new())
    }

    fn fit_mappings(&self) -> BTreeMap<String, FitMapping> {
        BTreeMap::new()
    }

    /// One task per simulation, named `task_<simulation>`.
    fn tasks(&self) -> Vec<Task> {
        self.simulations()
            .keys()
            .map(|key| Task {
                name: format!("task_{key}"),
                simulation: key.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;

    impl Experiment for Dummy {
        fn name(&self) -> &str {
            "Dummy"
        }

        fn simulations(&self) -> BTreeMap<String, TimecourseSim> {
            use crate::simulator::Timecourse;
            let mut sims = BTreeMap::new();
            sims.insert(
                "dul".to_string(),
                TimecourseSim::single(Timecourse::new(0.0, 10.0, 10)),
            );
            sims
        }
    }

    #[test]
    fn test_tasks_derived_from_simulations() {
        let tasks = Dummy.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, "task_dul");
        assert_eq!(tasks[0].simulation, "dul");
    }

    #[test]
    fn test_default_model_is_whole_body() {
        let model = Dummy.model().unwrap();
        assert_eq!(model.sid, "dulaglutide_body");
    }
}
