//! Local sensitivity analysis of the whole-body model.
//!
//! Every constant model parameter is perturbed around its value (central
//! difference) and the normalized sensitivity of the pharmacokinetic and
//! pharmacodynamic outputs is recorded, per analysis group (control, renal
//! impairment grades, Child-Pugh grades). Parameters are evaluated in
//! parallel with a progress bar per group.

use std::collections::BTreeMap;
use std::io::Write;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::info;

use crate::error::DulasimError;
use crate::fit::parameters_all;
use crate::model::compile::CompiledModel;
use crate::model::Model;
use crate::models::MR_DUL;
use crate::pk::pk_parameters;
use crate::simulator::{simulate, Timecourse, TimecourseSim};
use crate::units::{Quantity, Unit};

/// Four weeks, the dulaglutide half-life is slow.
const TEND: f64 = 4.0 * 7.0 * 24.0 * 60.0;
const STEPS: usize = 3000;
const DOSE_MG: f64 = 1.5;

/// Fraction of the parameter value used for bounds and perturbation.
const BOUNDS_FRACTION: f64 = 0.15;

/// Parameters never varied: conversion factors, molecular weights and the
/// dosing inputs.
const EXCLUDED: [&str; 4] = ["conversion_cm_per_m", "Mr_dul", "SCDOSE_dul", "IVDOSE_dul"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// Value from the least-squares fits.
    Fit,
    /// Physiological or model constant.
    Model,
}

#[derive(Debug, Clone)]
pub struct SensitivityParameter {
    pub uid: String,
    pub value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub kind: ParameterKind,
}

/// Constant model parameters eligible for sensitivity analysis: excluded ids,
/// NaN placeholders and zero values are dropped; bounds are +-15 % around the
/// value.
pub fn sensitivity_parameters(model: &Model) -> Vec<SensitivityParameter> {
    let fit_ids: Vec<&str> = parameters_all().iter().map(|p| p.pid).collect();
    model
        .parameters
        .iter()
        .filter(|p| p.constant)
        .filter(|p| !EXCLUDED.contains(&p.sid.as_str()))
        .filter(|p| p.value.is_finite() && p.value != 0.0)
        .map(|p| SensitivityParameter {
            uid: p.sid.clone(),
            value: p.value,
            lower_bound: p.value * (1.0 - BOUNDS_FRACTION),
            upper_bound: p.value * (1.0 + BOUNDS_FRACTION),
            kind: if fit_ids.contains(&p.sid.as_str()) {
                ParameterKind::Fit
            } else {
                ParameterKind::Model
            },
        })
        .collect()
}

/// Subgroup the analysis runs on, defined by its parameter changes.
#[derive(Debug, Clone)]
pub struct AnalysisGroup {
    pub uid: &'static str,
    pub name: &'static str,
    pub changes: Vec<(String, Quantity)>,
}

impl AnalysisGroup {
    fn new(uid: &'static str, name: &'static str, changes: &[(&str, f64)]) -> Self {
        Self {
            uid,
            name,
            changes: changes
                .iter()
                .map(|(sid, value)| (sid.to_string(), Quantity::new(*value, Unit::Dimensionless)))
                .collect(),
        }
    }
}

/// Control, renal impairment grades and Child-Pugh cirrhosis grades.
pub fn analysis_groups() -> Vec<AnalysisGroup> {
    vec![
        AnalysisGroup::new("control", "Control", &[]),
        AnalysisGroup::new(
            "mildRI",
            "Mild renal impairment",
            &[("KI__f_renal_function", 0.69)],
        ),
        AnalysisGroup::new(
            "modRI",
            "Moderate renal impairment",
            &[("KI__f_renal_function", 0.32)],
        ),
        AnalysisGroup::new(
            "sevRI",
            "Severe renal impairment",
            &[("KI__f_renal_function", 0.19)],
        ),
        AnalysisGroup::new("CPT A", "Mild cirrhosis (CPT A)", &[("f_cirrhosis", 0.399)]),
        AnalysisGroup::new(
            "CPT B",
            "Moderate cirrhosis (CPT B)",
            &[("f_cirrhosis", 0.698)],
        ),
        AnalysisGroup::new("CPT C", "Severe cirrhosis (CPT C)", &[("f_cirrhosis", 0.813)]),
    ]
}

const SELECTIONS: [&str; 5] = [
    "[Cve_dul]",
    "[Cve_dm]",
    "BW_ratio",
    "hba1c_ratio",
    "fpg_ratio",
];

const PK_KEYS_DUL: [&str; 6] = ["aucinf", "cmax", "thalf", "vd", "cl", "kel"];
const PK_KEYS_DM: [&str; 4] = ["aucinf", "cmax", "thalf", "kel"];

/// Output values (PK parameters and minimum PD ratios) keyed by output uid.
pub type Outputs = BTreeMap<String, f64>;

pub struct SensitivitySimulation {
    model: CompiledModel,
    /// Base changes applied to every evaluation: the reference dose and the
    /// control values of the case parameters.
    changes_simulation: Vec<(String, Quantity)>,
}

impl SensitivitySimulation {
    pub fn new(model: CompiledModel) -> Self {
        Self {
            model,
            changes_simulation: vec![
                ("SCDOSE_dul".to_string(), Quantity::new(DOSE_MG, Unit::Mg)),
                (
                    "f_cirrhosis".to_string(),
                    Quantity::new(0.0, Unit::Dimensionless),
                ),
                (
                    "KI__f_renal_function".to_string(),
                    Quantity::new(1.0, Unit::Dimensionless),
                ),
            ],
        }
    }

    /// Simulate with the given changes on top of the base changes and reduce
    /// the trajectories to the scalar outputs.
    pub fn evaluate(&self, changes: &[(String, Quantity)]) -> Result<Outputs, DulasimError> {
        let tc = Timecourse::new(0.0, TEND, STEPS)
            .changes(self.changes_simulation.iter().cloned())
            .changes(changes.iter().cloned());
        let sim = TimecourseSim::single(tc);
        let selections: Vec<String> = SELECTIONS.iter().map(|s| s.to_string()).collect();
        let result = simulate(&self.model, &sim, &selections, true)?;

        let mut outputs = Outputs::new();
        let time = result.time();

        let dose_mmole = DOSE_MG / MR_DUL; // [mg] / [g/mole] = [mmole]
        let dul = result.column("[Cve_dul]")?;
        if let Some(pk) = pk_parameters(time, dul, dose_mmole) {
            outputs.insert("[Cve_dul]_aucinf".to_string(), opt(pk.auc_inf));
            outputs.insert("[Cve_dul]_cmax".to_string(), pk.cmax);
            outputs.insert("[Cve_dul]_thalf".to_string(), opt(pk.thalf));
            outputs.insert("[Cve_dul]_vd".to_string(), opt(pk.vd));
            outputs.insert("[Cve_dul]_cl".to_string(), opt(pk.cl));
            outputs.insert("[Cve_dul]_kel".to_string(), opt(pk.kel));
        }
        let dm = result.column("[Cve_dm]")?;
        if let Some(pk) = pk_parameters(time, dm, 0.0) {
            outputs.insert("[Cve_dm]_aucinf".to_string(), opt(pk.auc_inf));
            outputs.insert("[Cve_dm]_cmax".to_string(), pk.cmax);
            outputs.insert("[Cve_dm]_thalf".to_string(), opt(pk.thalf));
            outputs.insert("[Cve_dm]_kel".to_string(), opt(pk.kel));
        }

        // maximum reduction of bodyweight, HbA1c and FPG
        for sid in ["BW", "hba1c", "fpg"] {
            let ratios = result.column(&format!("{sid}_ratio"))?;
            let min = ratios.iter().copied().fold(f64::INFINITY, f64::min);
            outputs.insert(format!("{sid}_ratio_min"), min);
        }
        Ok(outputs)
    }
}

fn opt(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NAN)
}

/// Normalized local sensitivities `(dy/dp) * (p/y)` per group, parameter and
/// output.
pub type SensitivityResults = BTreeMap<String, BTreeMap<String, Outputs>>;

pub struct LocalSensitivityAnalysis {
    simulation: SensitivitySimulation,
    parameters: Vec<SensitivityParameter>,
    groups: Vec<AnalysisGroup>,
    /// Relative perturbation for the central difference.
    pub difference_fraction: f64,
}

impl LocalSensitivityAnalysis {
    pub fn new(
        simulation: SensitivitySimulation,
        parameters: Vec<SensitivityParameter>,
        groups: Vec<AnalysisGroup>,
    ) -> Self {
        Self {
            simulation,
            parameters,
            groups,
            difference_fraction: 0.01,
        }
    }

    pub fn run(&self) -> Result<SensitivityResults, DulasimError> {
        let mut results = SensitivityResults::new();
        for group in &self.groups {
            info!(group = group.uid, parameters = self.parameters.len(), "sensitivity");
            let reference = self.simulation.evaluate(&group.changes)?;

            let bar = ProgressBar::new(self.parameters.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
                    .map_err(|e| DulasimError::Fit(e.to_string()))?,
            );
            bar.set_message(group.uid);

            let group_results: Result<BTreeMap<String, Outputs>, DulasimError> = self
                .parameters
                .par_iter()
                .map(|parameter| {
                    let sensitivities =
                        self.parameter_sensitivity(parameter, &group.changes, &reference)?;
                    bar.inc(1);
                    Ok((parameter.uid.clone(), sensitivities))
                })
                .collect();
            bar.finish();
            results.insert(group.uid.to_string(), group_results?);
        }
        Ok(results)
    }

    fn parameter_sensitivity(
        &self,
        parameter: &SensitivityParameter,
        group_changes: &[(String, Quantity)],
        reference: &Outputs,
    ) -> Result<Outputs, DulasimError> {
        let delta = parameter.value * self.difference_fraction;
        let unit = self
            .simulation
            .model
            .declared_unit(&parameter.uid)
            .ok_or_else(|| DulasimError::UnknownSelection(parameter.uid.clone()))?;

        let evaluate_at = |value: f64| -> Result<Outputs, DulasimError> {
            let mut changes = group_changes.to_vec();
            changes.push((parameter.uid.clone(), Quantity::new(value, unit)));
            self.simulation.evaluate(&changes)
        };
        let upper = evaluate_at(parameter.value + delta)?;
        let lower = evaluate_at(parameter.value - delta)?;

        let mut sensitivities = Outputs::new();
        for (key, y0) in reference {
            let (Some(yu), Some(yl)) = (upper.get(key), lower.get(key)) else {
                continue;
            };
            let dy_dp = (yu - yl) / (2.0 * delta);
            // normalized sensitivity coefficient
            let s = if *y0 != 0.0 {
                dy_dp * parameter.value / y0
            } else {
                f64::NAN
            };
            sensitivities.insert(key.clone(), s);
        }
        Ok(sensitivities)
    }
}

/// Write the results as a flat CSV table (group, parameter, output,
/// sensitivity).
pub fn write_results<W: Write>(results: &SensitivityResults, writer: W) -> Result<(), DulasimError> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(["group", "parameter", "output", "sensitivity"])?;
    for (group, by_parameter) in results {
        for (parameter, outputs) in by_parameter {
            for (output, sensitivity) in outputs {
                w.write_record([group, parameter, output, &sensitivity.to_string()])?;
            }
        }
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dulaglutide_body;

    #[test]
    fn test_parameter_selection() {
        let model = dulaglutide_body().unwrap();
        let parameters = sensitivity_parameters(&model);
        let uids: Vec<&str> = parameters.iter().map(|p| p.uid.as_str()).collect();
        // excluded ids, NaN and zero values never show up
        assert!(!uids.contains(&"Mr_dul"));
        assert!(!uids.contains(&"SCDOSE_dul"));
        assert!(!uids.contains(&"conversion_cm_per_m"));
        assert!(!uids.contains(&"SEX"));
        // fitted parameters are tagged
        let ksc = parameters.iter().find(|p| p.uid == "Ksc_dul").unwrap();
        assert_eq!(ksc.kind, ParameterKind::Fit);
        assert!((ksc.upper_bound - ksc.value * 1.15).abs() < 1e-12);
        let height = parameters.iter().find(|p| p.uid == "HEIGHT").unwrap();
        assert_eq!(height.kind, ParameterKind::Model);
    }

    #[test]
    fn test_analysis_groups() {
        let groups = analysis_groups();
        assert_eq!(groups.len(), 7);
        assert!(groups[0].changes.is_empty());
        let cpt_c = groups.iter().find(|g| g.uid == "CPT C").unwrap();
        assert_eq!(cpt_c.changes[0].0, "f_cirrhosis");
    }

    #[test]
    fn test_renal_impairment_increases_metabolite_exposure() {
        let model = dulaglutide_body().unwrap().compile().unwrap();
        let simulation = SensitivitySimulation::new(model);
        let control = simulation.evaluate(&[]).unwrap();
        let severe = simulation
            .evaluate(&[(
                "KI__f_renal_function".to_string(),
                Quantity::new(0.19, Unit::Dimensionless),
            )])
            .unwrap();
        assert!(severe["[Cve_dm]_aucinf"] > control["[Cve_dm]_aucinf"]);
    }
}
