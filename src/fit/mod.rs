//! Parameter fitting against the clinical reference data.
//!
//! A [`FitProblem`] collects the fit mappings of a set of experiments,
//! filtered by metadata, and exposes the weighted squared residual between
//! simulated observables and reference series as an argmin cost function.
//! Optimization uses Nelder-Mead from a perturbed initial simplex.

use std::collections::BTreeMap;
use std::path::Path;

use argmin::core::{CostFunction, Error, Executor};
use argmin::solver::neldermead::NelderMead;
use ndarray::Array1;
use tracing::{debug, info};

use crate::error::DulasimError;
use crate::experiment::metadata::Health;
use crate::experiment::{Experiment, FitData, FitMapping};
use crate::model::compile::CompiledModel;
use crate::simulator::{simulate, TimecourseSim};
use crate::units::{Quantity, Unit};

/// One free parameter of the optimization.
#[derive(Debug, Clone)]
pub struct FitParameter {
    pub pid: &'static str,
    pub start_value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub unit: Unit,
}

impl FitParameter {
    pub const fn new(
        pid: &'static str,
        lower_bound: f64,
        start_value: f64,
        upper_bound: f64,
        unit: Unit,
    ) -> Self {
        Self {
            pid,
            start_value,
            lower_bound,
            upper_bound,
            unit,
        }
    }
}

/// Pharmacokinetic parameters: absorption, plasma cleavage, renal excretion.
pub fn parameters_pharmacokinetics() -> Vec<FitParameter> {
    vec![
        FitParameter::new("Ksc_dul", 1e-6, 0.001, 0.1, Unit::PerMin),
        FitParameter::new("DUL2DM_k", 1e-6, 0.001, 0.1, Unit::LitrePerMin),
        FitParameter::new("KI__DMEX_k", 1e-6, 0.001, 0.1, Unit::PerMin),
    ]
}

/// Pharmacodynamic parameters: fat loss effect and FPG normalization.
pub fn parameters_pharmacodynamics() -> Vec<FitParameter> {
    vec![
        FitParameter::new("EC50_FAT", 1e-6, 1.0, 1e3, Unit::MilliMolar),
        FitParameter::new("Emax_FAT", 1e-6, 1.0, 1e3, Unit::PerMin),
        FitParameter::new("k_fpg", 1e-6, 0.2e-5, 1e2, Unit::LitreSquaredPerMinPerMMole),
    ]
}

pub fn parameters_all() -> Vec<FitParameter> {
    let mut parameters = parameters_pharmacokinetics();
    parameters.extend(parameters_pharmacodynamics());
    parameters
}

/// Predicate on a fit mapping; filters compose by conjunction.
pub type MetadataFilter = fn(&str, &FitMapping) -> bool;

/// Healthy control model: no renal or hepatic impairment, no outliers.
pub fn filter_baseline(_key: &str, mapping: &FitMapping) -> bool {
    if !matches!(
        mapping.metadata.health,
        Health::Healthy | Health::T2dm | Health::Hypertension
    ) {
        return false;
    }
    !mapping.metadata.outlier
}

const PK_OBSERVABLES: [&str; 5] = [
    "[Cve_dul]",
    "[Cve_dm]",
    "[Cve_dmtot]",
    "Aurine_dm",
    "Afeces_dm",
];

const PD_OBSERVABLES: [&str; 6] = [
    "BW",
    "BW_change",
    "hba1c",
    "hba1c_change",
    "[fpg]",
    "fpg_change",
];

pub fn filter_pharmacokinetics(_key: &str, mapping: &FitMapping) -> bool {
    match &mapping.observable {
        FitData::Observable { selection, .. } => PK_OBSERVABLES.contains(&selection.as_str()),
        FitData::Reference { .. } => false,
    }
}

pub fn filter_pharmacodynamics(_key: &str, mapping: &FitMapping) -> bool {
    match &mapping.observable {
        FitData::Observable { selection, .. } => PD_OBSERVABLES.contains(&selection.as_str()),
        FitData::Reference { .. } => false,
    }
}

/// Keep the mappings accepted by every filter. Filters are idempotent, so
/// composition order does not matter.
pub fn apply_filters(
    mappings: BTreeMap<String, FitMapping>,
    filters: &[MetadataFilter],
) -> BTreeMap<String, FitMapping> {
    mappings
        .into_iter()
        .filter(|(key, mapping)| filters.iter().all(|f| f(key, mapping)))
        .collect()
}

/// One residual series: a simulation, the observable to read from it and the
/// reference points to compare against.
struct FitEntry {
    simulation: TimecourseSim,
    selection: String,
    times: Vec<f64>,
    values: Vec<f64>,
    weights: Vec<f64>,
}

pub struct FitProblem {
    model: CompiledModel,
    parameters: Vec<FitParameter>,
    entries: Vec<FitEntry>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FitResult {
    pub parameters: Vec<(String, f64)>,
    pub cost: f64,
}

impl FitResult {
    /// Persist the fitted values, e.g. to seed the experiments' default
    /// changes.
    pub fn write_json<W: std::io::Write>(&self, writer: W) -> Result<(), DulasimError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

impl FitProblem {
    pub fn new(model: CompiledModel, parameters: Vec<FitParameter>) -> Self {
        Self {
            model,
            parameters,
            entries: Vec::new(),
        }
    }

    /// Add the filtered fit mappings of an experiment.
    ///
    /// Reference series with NaN values are dropped pointwise; weights are
    /// `1/sd` where the mapping carries a standard deviation, `1` otherwise.
    pub fn add_experiment(
        &mut self,
        experiment: &dyn Experiment,
        data_path: &Path,
        filters: &[MetadataFilter],
    ) -> Result<(), DulasimError> {
        let datasets = experiment.datasets(data_path)?;
        let simulations = experiment.simulations();
        let mappings = apply_filters(experiment.fit_mappings(), filters);
        for (key, mapping) in mappings {
            let (dataset_id, xid, yid, yid_sd) = match &mapping.reference {
                FitData::Reference {
                    dataset,
                    xid,
                    yid,
                    yid_sd,
                } => (dataset, xid, yid, yid_sd),
                FitData::Observable { .. } => {
                    return Err(DulasimError::Fit(format!(
                        "mapping '{key}' has no reference data"
                    )))
                }
            };
            let (task, selection) = match &mapping.observable {
                FitData::Observable { task, selection } => (task, selection),
                FitData::Reference { .. } => {
                    return Err(DulasimError::Fit(format!(
                        "mapping '{key}' has no observable"
                    )))
                }
            };
            let dataset = datasets.get(dataset_id).ok_or_else(|| {
                DulasimError::MissingDataset {
                    id: dataset_id.clone(),
                    path: data_path.display().to_string(),
                }
            })?;
            let xs = dataset.column(xid)?;
            let ys = dataset.column(yid)?;
            let sds = match yid_sd {
                Some(column) => Some(dataset.column(column)?),
                None => None,
            };
            let simulation_key = task.trim_start_matches("task_");
            let simulation = simulations.get(simulation_key).ok_or_else(|| {
                DulasimError::Fit(format!("mapping '{key}' references unknown task '{task}'"))
            })?;

            let mut entry = FitEntry {
                simulation: simulation.clone(),
                selection: selection.clone(),
                times: Vec::new(),
                values: Vec::new(),
                weights: Vec::new(),
            };
            for (i, (&x, &y)) in xs.iter().zip(ys).enumerate() {
                if x.is_nan() || y.is_nan() {
                    continue;
                }
                let weight = match sds {
                    Some(sds) if sds[i].is_finite() && sds[i] > 0.0 => 1.0 / sds[i],
                    _ => 1.0,
                };
                entry.times.push(x);
                entry.values.push(y);
                entry.weights.push(weight);
            }
            if entry.times.is_empty() {
                debug!(mapping = %key, "no finite reference points, skipped");
                continue;
            }
            self.entries.push(entry);
        }
        Ok(())
    }

    pub fn nentries(&self) -> usize {
        self.entries.len()
    }

    fn within_bounds(&self, point: &Array1<f64>) -> bool {
        self.parameters
            .iter()
            .zip(point)
            .all(|(p, &v)| v >= p.lower_bound && v <= p.upper_bound)
    }

    fn residual_cost(&self, point: &Array1<f64>) -> Result<f64, DulasimError> {
        let mut cost = 0.0;
        for entry in &self.entries {
            let mut sim = entry.simulation.clone();
            if let Some(first) = sim.timecourses.first_mut() {
                for (parameter, &value) in self.parameters.iter().zip(point) {
                    first
                        .changes
                        .push((parameter.pid.to_string(), Quantity::new(value, parameter.unit)));
                }
            }
            let result = simulate(&self.model, &sim, std::slice::from_ref(&entry.selection), true)?;
            let predicted = result.interpolate(&entry.selection, &entry.times)?;
            for ((y_sim, y_ref), w) in predicted
                .iter()
                .zip(&entry.values)
                .zip(&entry.weights)
            {
                let residual = w * (y_sim - y_ref);
                cost += residual * residual;
            }
        }
        Ok(cost)
    }

    /// Run Nelder-Mead from the start values.
    pub fn optimize(self) -> Result<FitResult, DulasimError> {
        let start: Array1<f64> = self.parameters.iter().map(|p| p.start_value).collect();
        let names: Vec<String> = self.parameters.iter().map(|p| p.pid.to_string()).collect();
        info!(parameters = ?names, entries = self.entries.len(), "starting fit");

        let simplex = create_initial_simplex(&start);
        let solver = NelderMead::new(simplex)
            .with_sd_tolerance(1e-2)
            .map_err(|e| DulasimError::Fit(e.to_string()))?;
        let result = Executor::new(self, solver)
            .run()
            .map_err(|e| DulasimError::Fit(e.to_string()))?;
        let best = result
            .state
            .best_param
            .ok_or_else(|| DulasimError::Fit("optimizer returned no parameters".to_string()))?;
        Ok(FitResult {
            parameters: names.into_iter().zip(best).collect(),
            cost: result.state.best_cost,
        })
    }
}

impl CostFunction for FitProblem {
    type Param = Array1<f64>;
    type Output = f64;

    fn cost(&self, point: &Self::Param) -> Result<Self::Output, Error> {
        if !self.within_bounds(point) {
            return Ok(f64::INFINITY);
        }
        // a failed integration repels the simplex instead of aborting the fit
        match self.residual_cost(point) {
            Ok(cost) => Ok(cost),
            Err(err) => {
                debug!(%err, "simulation failed during fit");
                Ok(f64::INFINITY)
            }
        }
    }
}

fn create_initial_simplex(initial_point: &Array1<f64>) -> Vec<Array1<f64>> {
    let perturbation_percentage = 0.008;

    let mut vertices = Vec::with_capacity(initial_point.len() + 1);
    vertices.push(initial_point.to_owned());
    for i in 0..initial_point.len() {
        let perturbation = if initial_point[i] == 0.0 {
            0.00025
        } else {
            perturbation_percentage * initial_point[i]
        };
        let mut perturbed_point = initial_point.to_owned();
        perturbed_point[i] += perturbation;
        vertices.push(perturbed_point);
    }
    vertices
}
