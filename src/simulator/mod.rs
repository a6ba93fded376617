//! Piecewise timecourse simulation.
//!
//! A [`TimecourseSim`] is a sequence of segments. Each segment applies its
//! changes (parameter overrides, state resets, dose applications) at segment
//! start, then integrates the model forward on a uniform output grid. State
//! carries across segment boundaries, so a weekly dosing schedule is a chain
//! of one-week segments that each set the dose parameter.

mod closure;

use cached::proc_macro::cached;
use cached::UnboundCache;
use closure::SegmentProblem;
use diffsol::{
    error::OdeSolverError, ode_solver::method::OdeSolverMethod, OdeBuilder, OdeSolverStopReason,
};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::error::DulasimError;
use crate::model::compile::{CompiledModel, Observable};
use crate::units::Quantity;

type M = nalgebra::DMatrix<f64>;

const RTOL: f64 = 1e-4;
const ATOL: f64 = 1e-4;

/// One integration segment with the changes applied at its start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timecourse {
    pub start: f64,
    pub end: f64,
    pub steps: usize,
    pub changes: Vec<(String, Quantity)>,
}

impl Timecourse {
    pub fn new(start: f64, end: f64, steps: usize) -> Self {
        Self {
            start,
            end,
            steps,
            changes: Vec::new(),
        }
    }

    /// Apply a change at segment start. The key is a parameter, compartment,
    /// dose parameter or species id; the bracketed form `[sid]` sets a
    /// species by concentration.
    pub fn change(mut self, key: impl Into<String>, value: Quantity) -> Self {
        self.changes.push((key.into(), value));
        self
    }

    /// Apply a batch of changes, e.g. the shared default parameter set.
    pub fn changes(mut self, changes: impl IntoIterator<Item = (String, Quantity)>) -> Self {
        self.changes.extend(changes);
        self
    }

    fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Chained segments forming one simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimecourseSim {
    pub timecourses: Vec<Timecourse>,
}

impl TimecourseSim {
    pub fn new(timecourses: Vec<Timecourse>) -> Self {
        Self { timecourses }
    }

    pub fn single(timecourse: Timecourse) -> Self {
        Self {
            timecourses: vec![timecourse],
        }
    }

    pub fn total_duration(&self) -> f64 {
        self.timecourses.iter().map(|tc| tc.duration()).sum()
    }
}

/// Column-oriented simulation output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimResult {
    time: Vec<f64>,
    columns: Vec<String>,
    data: Vec<Vec<f64>>,
}

impl SimResult {
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn column(&self, name: &str) -> Result<&[f64], DulasimError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|idx| self.data[idx].as_slice())
            .ok_or_else(|| DulasimError::UnknownSelection(name.to_string()))
    }

    /// Linear interpolation of a column at arbitrary times, clamped to the
    /// simulated range.
    pub fn interpolate(&self, name: &str, times: &[f64]) -> Result<Vec<f64>, DulasimError> {
        let ys = self.column(name)?;
        Ok(times
            .iter()
            .map(|t| interp1(&self.time, ys, *t))
            .collect())
    }

    /// Write the result as CSV with a leading time column.
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<(), DulasimError> {
        let mut w = csv::Writer::from_writer(writer);
        let mut header = vec!["time".to_string()];
        header.extend(self.columns.iter().cloned());
        w.write_record(&header)?;
        for (i, t) in self.time.iter().enumerate() {
            let mut record = vec![t.to_string()];
            record.extend(self.data.iter().map(|col| col[i].to_string()));
            w.write_record(&record)?;
        }
        w.flush()?;
        Ok(())
    }
}

fn interp1(xs: &[f64], ys: &[f64], t: f64) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    if t <= xs[0] {
        return ys[0];
    }
    if t >= xs[xs.len() - 1] {
        return ys[ys.len() - 1];
    }
    let hi = xs.partition_point(|x| *x < t);
    let (x0, x1) = (xs[hi - 1], xs[hi]);
    if x1 == x0 {
        return ys[hi];
    }
    ys[hi - 1] + (ys[hi] - ys[hi - 1]) * (t - x0) / (x1 - x0)
}

/// Hash segment definitions and selections to a u64 cache key.
#[inline(always)]
fn simhash(sim: &TimecourseSim, selections: &[String]) -> u64 {
    let mut hasher = std::hash::DefaultHasher::new();
    for tc in &sim.timecourses {
        tc.start.to_bits().hash(&mut hasher);
        tc.end.to_bits().hash(&mut hasher);
        tc.steps.hash(&mut hasher);
        for (key, quantity) in &tc.changes {
            key.hash(&mut hasher);
            // Normalize -0.0 to 0.0 for consistent hashing
            let bits = if quantity.value == 0.0 {
                0u64
            } else {
                quantity.value.to_bits()
            };
            bits.hash(&mut hasher);
            quantity.unit.hash(&mut hasher);
        }
    }
    for selection in selections {
        selection.hash(&mut hasher);
    }
    hasher.finish()
}

/// Simulate a timecourse, recording the given selections.
///
/// With `cache` enabled, repeated runs with identical model content, segments
/// and selections return the memoized result.
pub fn simulate(
    model: &CompiledModel,
    sim: &TimecourseSim,
    selections: &[String],
    cache: bool,
) -> Result<SimResult, DulasimError> {
    let selections = selections.to_vec();
    if cache {
        _simulate(model, sim, &selections)
    } else {
        _simulate_no_cache(model, sim, &selections)
    }
}

#[cached(
    ty = "UnboundCache<(u64, u64), SimResult>",
    create = "{ UnboundCache::with_capacity(10_000) }",
    convert = r#"{ (model.content_hash(), simhash(sim, selections)) }"#,
    result = "true"
)]
fn _simulate(
    model: &CompiledModel,
    sim: &TimecourseSim,
    selections: &Vec<String>,
) -> Result<SimResult, DulasimError> {
    let observables: Vec<Observable> = selections
        .iter()
        .map(|s| model.resolve_selection(s))
        .collect::<Result<_, _>>()?;

    let mut working = model.clone();
    let mut env: Vec<f64> = vec![0.0; working.env_len()];
    let mut time: Vec<f64> = Vec::new();
    let mut data: Vec<Vec<f64>> = vec![Vec::new(); selections.len()];
    let mut offset = 0.0;
    let mut carry: Option<DVector<f64>> = None;

    for tc in &sim.timecourses {
        let mut overrides: Vec<(usize, f64)> = Vec::new();
        let mut pending_doses: Vec<String> = Vec::new();
        for (key, quantity) in &tc.changes {
            let (sid, as_conc) = match key.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                Some(sid) => (sid, true),
                None => (key.as_str(), false),
            };
            let value = if as_conc {
                quantity.convert_to(crate::units::Unit::MilliMolar)?.value
            } else {
                match working.declared_unit(sid) {
                    Some(unit) => quantity.convert_to(unit)?.value,
                    None => {
                        return Err(DulasimError::UnknownSelection(key.clone()));
                    }
                }
            };
            if working.doses().iter().any(|d| d.parameter == sid) {
                working.set_value(sid, value)?;
                pending_doses.push(sid.to_string());
            } else if let Some(idx) = working.state(sid) {
                overrides.push((idx, working.state_amount(idx, value, as_conc)));
            } else {
                working.set_value(sid, value)?;
            }
        }

        // initial state after parameter changes; carried state afterwards
        let mut x = match carry.take() {
            Some(x) => x,
            None => working.initial_state(),
        };
        for (idx, amount) in overrides {
            x[idx] = amount;
        }
        if !pending_doses.is_empty() {
            working.load_env(&x, offset, &mut env);
            for sid in &pending_doses {
                for dose in working.doses() {
                    if &dose.parameter == sid {
                        let (idx, amount) = working.dose_application(dose, &env);
                        x[idx] += amount;
                    }
                }
            }
        }

        // segment-start sample; overwrites the junction row so the
        // post-change values are what the output carries at that time
        working.load_env(&x, offset, &mut env);
        if time.last() == Some(&offset) {
            for (j, obs) in observables.iter().enumerate() {
                let n = data[j].len();
                data[j][n - 1] = working.observe(*obs, &env, offset);
            }
        } else {
            time.push(offset);
            for (j, obs) in observables.iter().enumerate() {
                data[j].push(working.observe(*obs, &env, offset));
            }
        }

        let duration = tc.duration();
        if duration <= 0.0 || tc.steps == 0 {
            carry = Some(x);
            offset += duration.max(0.0);
            continue;
        }

        let problem = OdeBuilder::<M>::new()
            .atol(vec![ATOL; working.nstates()])
            .rtol(RTOL)
            .t0(offset)
            .h0(1e-3)
            .build_from_eqn(SegmentProblem::new(working.clone(), x.clone()))?;
        let mut solver = problem.bdf::<diffsol::NalgebraLU<f64>>()?;

        for i in 1..=tc.steps {
            let t_next = offset + duration * (i as f64) / (tc.steps as f64);
            match solver.set_stop_time(t_next) {
                Ok(_) => loop {
                    match solver.step() {
                        Ok(OdeSolverStopReason::InternalTimestep) => continue,
                        Ok(OdeSolverStopReason::TstopReached) => break,
                        Err(diffsol::error::DiffsolError::OdeSolverError(
                            OdeSolverError::StepSizeTooSmall { .. },
                        )) => {
                            return Err(DulasimError::Solver(format!(
                                "step size went to zero at t={t_next} in '{}'; a parameter is close to 0.0 or infinite",
                                working.sid
                            )));
                        }
                        Err(err) => return Err(err.into()),
                        Ok(reason) => {
                            return Err(DulasimError::Solver(format!(
                                "unexpected stop reason {reason:?}"
                            )));
                        }
                    }
                },
                Err(diffsol::error::DiffsolError::OdeSolverError(
                    OdeSolverError::StopTimeAtCurrentTime,
                )) => {}
                Err(err) => return Err(err.into()),
            }
            working.load_env(solver.state().y, t_next, &mut env);
            time.push(t_next);
            for (j, obs) in observables.iter().enumerate() {
                data[j].push(working.observe(*obs, &env, t_next));
            }
        }

        carry = Some(solver.state().y.clone());
        offset += duration;
    }

    Ok(SimResult {
        time,
        columns: selections.clone(),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::expr::sym;
    use crate::model::{Compartment, DoseParameter, Model, Parameter, Reaction, Species};
    use crate::units::Unit;
    use approx::assert_relative_eq;

    fn decay_model() -> CompiledModel {
        Model::new("decay")
            .compartment(Compartment::new("Vext", 2.0, Unit::Litre))
            .species(Species::concentration("drug", "Vext", 1.0))
            .parameter(Parameter::constant("k", 0.1, Unit::PerMin))
            .reaction(
                Reaction::new("ELIM", sym("k") * sym("Vext") * sym("drug")).reactant("drug"),
            )
            .compile()
            .unwrap()
    }

    fn depot_model() -> CompiledModel {
        Model::new("dosing")
            .compartment(Compartment::new("Vsc", 1.0, Unit::Litre))
            .species(Species::amount("dul_sc", "Vsc", 0.0))
            .parameter(Parameter::constant("SCDOSE_dul", 0.0, Unit::Mg))
            .parameter(Parameter::constant("Mr_dul", 3314.6, Unit::GramPerMole))
            .parameter(Parameter::constant("Ksc_dul", 0.001, Unit::PerMin))
            .reaction(
                Reaction::new("ABS", sym("Ksc_dul") * sym("dul_sc")).reactant("dul_sc"),
            )
            .dose(DoseParameter::new(
                "SCDOSE_dul",
                "dul_sc",
                sym("SCDOSE_dul") / sym("Mr_dul"),
            ))
            .compile()
            .unwrap()
    }

    #[test]
    fn test_exponential_decay() {
        let model = decay_model();
        let sim = TimecourseSim::single(Timecourse::new(0.0, 50.0, 50));
        let result = simulate(&model, &sim, &["time".to_string(), "[drug]".to_string()], false)
            .unwrap();
        let time = result.column("time").unwrap();
        let conc = result.column("[drug]").unwrap();
        assert_eq!(time.len(), 51);
        for (t, c) in time.iter().zip(conc) {
            assert_relative_eq!(*c, (-0.1 * t).exp(), max_relative = 1e-3);
        }
    }

    #[test]
    fn test_segment_continuity() {
        let model = decay_model();
        let split = TimecourseSim::new(vec![
            Timecourse::new(0.0, 25.0, 25),
            Timecourse::new(0.0, 25.0, 25),
        ]);
        let single = TimecourseSim::single(Timecourse::new(0.0, 50.0, 50));
        let a = simulate(&model, &split, &["[drug]".to_string()], false).unwrap();
        let b = simulate(&model, &single, &["[drug]".to_string()], false).unwrap();
        assert_eq!(a.len(), b.len());
        for (t0, t1) in a.time().iter().zip(a.time().iter().skip(1)) {
            assert!(t1 > t0);
        }
        for (va, vb) in a
            .column("[drug]")
            .unwrap()
            .iter()
            .zip(b.column("[drug]").unwrap())
        {
            assert_relative_eq!(*va, *vb, max_relative = 1e-3);
        }
    }

    #[test]
    fn test_dose_application_jump() {
        let model = depot_model();
        let sim = TimecourseSim::new(vec![
            Timecourse::new(0.0, 60.0, 10)
                .change("SCDOSE_dul", Quantity::new(1.5, Unit::Mg)),
            Timecourse::new(0.0, 60.0, 10)
                .change("SCDOSE_dul", Quantity::new(1.5, Unit::Mg)),
        ]);
        let result = simulate(&model, &sim, &["dul_sc".to_string()], false).unwrap();
        let amounts = result.column("dul_sc").unwrap();
        let dose_amount = 1.5 / 3314.6;
        assert_relative_eq!(amounts[0], dose_amount, max_relative = 1e-9);
        // second dose adds on top of the depot remainder
        let junction = result.time().iter().position(|t| *t == 60.0).unwrap();
        assert!(amounts[junction] > amounts[junction - 1]);
        assert!(amounts[junction] > dose_amount * 0.9);
    }

    #[test]
    fn test_change_unit_conversion() {
        let model = decay_model();
        // 500 µM == 0.5 mM
        let sim = TimecourseSim::single(
            Timecourse::new(0.0, 10.0, 10)
                .change("[drug]", Quantity::new(500.0, Unit::MicroMolar)),
        );
        let result = simulate(&model, &sim, &["[drug]".to_string()], false).unwrap();
        assert_relative_eq!(result.column("[drug]").unwrap()[0], 0.5);
    }

    #[test]
    fn test_cache_determinism() {
        let model = decay_model();
        let sim = TimecourseSim::single(Timecourse::new(0.0, 20.0, 20));
        let selections = vec!["[drug]".to_string()];
        let a = simulate(&model, &sim, &selections, true).unwrap();
        let b = simulate(&model, &sim, &selections, true).unwrap();
        assert_eq!(a.column("[drug]").unwrap(), b.column("[drug]").unwrap());
    }

    #[test]
    fn test_interpolation() {
        let result = SimResult {
            time: vec![0.0, 10.0, 20.0],
            columns: vec!["y".to_string()],
            data: vec![vec![0.0, 1.0, 3.0]],
        };
        let ys = result.interpolate("y", &[5.0, 15.0, 25.0]).unwrap();
        assert_relative_eq!(ys[0], 0.5);
        assert_relative_eq!(ys[1], 2.0);
        assert_relative_eq!(ys[2], 3.0);
    }
}
