//! Compilation of a [`Model`](super::Model) into the index-resolved form the
//! simulator consumes.
//!
//! The environment is a flat vector with one slot per compartment, parameter
//! and species, plus a time slot. Species slots hold the SBML-style formula
//! value (concentration unless the species is amount-based); the state vector
//! itself always holds amounts, so rate contributions are in amount/min.

use nalgebra::DVector;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use super::expr::CompiledExpr;
use super::{Model, SpeciesInitial};
use crate::error::DulasimError;
use crate::units::Unit;

#[derive(Debug, Clone, Copy, PartialEq)]
enum StateKind {
    /// Concentration-form species; env slot holds amount / volume.
    SpeciesConc { volume_slot: usize },
    /// Amount-based species; env slot holds the amount.
    SpeciesAmount { volume_slot: usize },
    /// Parameter turned state by a rate rule.
    Parameter,
}

#[derive(Debug, Clone)]
struct State {
    sid: String,
    env_slot: usize,
    init: f64,
    kind: StateKind,
}

#[derive(Debug, Clone)]
struct CompiledReaction {
    flux: CompiledExpr,
    stoichiometry: Vec<(usize, f64)>,
}

/// Dose entry resolved to slots; see [`super::DoseParameter`].
#[derive(Debug, Clone)]
pub struct CompiledDose {
    pub parameter: String,
    state: usize,
    conversion: CompiledExpr,
}

/// Resolved observable, cheap to sample per output point.
#[derive(Debug, Clone, Copy)]
pub enum Observable {
    Time,
    Slot(usize),
    /// Concentration view of an amount-based species.
    Ratio { slot: usize, volume_slot: usize },
}

/// Index-resolved model ready for simulation.
#[derive(Debug, Clone)]
pub struct CompiledModel {
    pub sid: String,
    states: Vec<State>,
    env_template: Vec<f64>,
    slots: HashMap<String, usize>,
    time_slot: usize,
    assignments: Vec<(usize, CompiledExpr)>,
    reactions: Vec<CompiledReaction>,
    rate_rules: Vec<(usize, CompiledExpr)>,
    initial_assignments: Vec<(usize, CompiledExpr)>,
    doses: Vec<CompiledDose>,
    state_index: HashMap<String, usize>,
    units: HashMap<String, Unit>,
}

impl Model {
    /// Validate and compile the model.
    pub fn compile(&self) -> Result<CompiledModel, DulasimError> {
        self.validate()?;

        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut env_template: Vec<f64> = Vec::new();
        fn push_slot(
            sid: &str,
            value: f64,
            env: &mut Vec<f64>,
            slots: &mut HashMap<String, usize>,
        ) {
            slots.insert(sid.to_string(), env.len());
            env.push(value);
        }

        for c in &self.compartments {
            push_slot(&c.sid, c.value, &mut env_template, &mut slots);
        }
        for p in &self.parameters {
            push_slot(&p.sid, p.value, &mut env_template, &mut slots);
        }
        for s in &self.species {
            push_slot(&s.sid, 0.0, &mut env_template, &mut slots);
        }
        let time_slot = env_template.len();
        slots.insert("t".to_string(), time_slot);
        env_template.push(0.0);

        // state layout: species first, then rate-rule parameters
        let rate_targets: HashSet<&str> =
            self.rate_rules.iter().map(|r| r.target.as_str()).collect();
        let mut states: Vec<State> = Vec::new();
        let mut state_index: HashMap<String, usize> = HashMap::new();
        for s in &self.species {
            let volume_slot = *slots.get(&s.compartment).ok_or_else(|| {
                DulasimError::UnknownSymbol {
                    symbol: s.compartment.clone(),
                    context: s.sid.clone(),
                }
            })?;
            let volume = env_template[volume_slot];
            let init = match s.initial {
                SpeciesInitial::Amount(a) => a,
                SpeciesInitial::Concentration(c) => c * volume,
            };
            let kind = if s.amount_based {
                StateKind::SpeciesAmount { volume_slot }
            } else {
                StateKind::SpeciesConc { volume_slot }
            };
            state_index.insert(s.sid.clone(), states.len());
            states.push(State {
                sid: s.sid.clone(),
                env_slot: slots[&s.sid],
                init,
                kind,
            });
        }
        for p in &self.parameters {
            if rate_targets.contains(p.sid.as_str()) {
                state_index.insert(p.sid.clone(), states.len());
                states.push(State {
                    sid: p.sid.clone(),
                    env_slot: slots[&p.sid],
                    init: p.value,
                    kind: StateKind::Parameter,
                });
            }
        }

        // assignment rules in declaration order, rejecting forward references
        let assign_targets: HashSet<&str> = self
            .assignment_rules
            .iter()
            .map(|r| r.target.as_str())
            .collect();
        let mut assigned: HashSet<&str> = HashSet::new();
        let mut assignments = Vec::with_capacity(self.assignment_rules.len());
        for rule in &self.assignment_rules {
            for symbol in rule.formula.symbols() {
                if assign_targets.contains(symbol) && !assigned.contains(symbol) {
                    return Err(DulasimError::Model(format!(
                        "assignment rule '{}' references '{}' before its rule",
                        rule.target, symbol
                    )));
                }
            }
            let slot = *slots
                .get(&rule.target)
                .ok_or_else(|| DulasimError::UnknownSymbol {
                    symbol: rule.target.clone(),
                    context: "assignment rule".to_string(),
                })?;
            assignments.push((slot, rule.formula.resolve(&slots, &rule.target)?));
            assigned.insert(rule.target.as_str());
        }

        let mut rate_rules = Vec::with_capacity(self.rate_rules.len());
        for rule in &self.rate_rules {
            let idx = *state_index
                .get(&rule.target)
                .ok_or_else(|| DulasimError::UnknownSymbol {
                    symbol: rule.target.clone(),
                    context: "rate rule".to_string(),
                })?;
            rate_rules.push((idx, rule.formula.resolve(&slots, &rule.target)?));
        }

        let mut reactions = Vec::with_capacity(self.reactions.len());
        for reaction in &self.reactions {
            let stoichiometry = reaction
                .stoichiometry
                .iter()
                .map(|(sid, coef)| (state_index[sid], *coef))
                .collect();
            reactions.push(CompiledReaction {
                flux: reaction.formula.resolve(&slots, &reaction.sid)?,
                stoichiometry,
            });
        }

        let mut initial_assignments = Vec::with_capacity(self.initial_assignments.len());
        for assignment in &self.initial_assignments {
            let idx = *state_index.get(&assignment.target).ok_or_else(|| {
                DulasimError::Model(format!(
                    "initial assignment target '{}' is not a state",
                    assignment.target
                ))
            })?;
            initial_assignments.push((idx, assignment.formula.resolve(&slots, &assignment.target)?));
        }

        let mut doses = Vec::with_capacity(self.doses.len());
        for dose in &self.doses {
            doses.push(CompiledDose {
                parameter: dose.parameter.clone(),
                state: state_index[&dose.target],
                conversion: dose.conversion.resolve(&slots, &dose.parameter)?,
            });
        }

        let mut units: HashMap<String, Unit> = HashMap::new();
        for c in &self.compartments {
            units.insert(c.sid.clone(), c.unit);
        }
        for p in &self.parameters {
            units.insert(p.sid.clone(), p.unit);
        }
        for s in &self.species {
            units.insert(s.sid.clone(), s.unit);
        }

        Ok(CompiledModel {
            sid: self.sid.clone(),
            states,
            env_template,
            slots,
            time_slot,
            assignments,
            reactions,
            rate_rules,
            initial_assignments,
            doses,
            state_index,
            units,
        })
    }

    /// Structured model description (JSON).
    pub fn to_json(&self) -> Result<String, DulasimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl CompiledModel {
    pub fn nstates(&self) -> usize {
        self.states.len()
    }

    pub fn env_len(&self) -> usize {
        self.env_template.len()
    }

    /// Override a parameter or compartment value (base units).
    pub fn set_value(&mut self, sid: &str, value: f64) -> Result<(), DulasimError> {
        let slot = *self
            .slots
            .get(sid)
            .ok_or_else(|| DulasimError::UnknownSelection(sid.to_string()))?;
        self.env_template[slot] = value;
        if let Some(idx) = self.state_index.get(sid) {
            self.states[*idx].init = value;
        }
        Ok(())
    }

    /// State index of a species or rate-rule parameter.
    pub fn state(&self, sid: &str) -> Option<usize> {
        self.state_index.get(sid).copied()
    }

    /// Convert a value for state `idx` into the amount stored in the state
    /// vector. `concentration` selects the bracketed `[sid]` form.
    pub fn state_amount(&self, idx: usize, value: f64, concentration: bool) -> f64 {
        match self.states[idx].kind {
            StateKind::SpeciesConc { volume_slot } | StateKind::SpeciesAmount { volume_slot }
                if concentration =>
            {
                value * self.env_template[volume_slot]
            }
            _ => value,
        }
    }

    /// Registered dose entries.
    pub fn doses(&self) -> &[CompiledDose] {
        &self.doses
    }

    /// Unit the model declared for a quantity.
    pub fn declared_unit(&self, sid: &str) -> Option<Unit> {
        self.units.get(sid).copied()
    }

    /// Hash over the numeric content, used as a memoization key.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.sid.hash(&mut hasher);
        for value in &self.env_template {
            value.to_bits().hash(&mut hasher);
        }
        for state in &self.states {
            state.init.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Amount to add to the dose target, given the current environment.
    pub fn dose_application(&self, dose: &CompiledDose, env: &[f64]) -> (usize, f64) {
        (dose.state, dose.conversion.eval(env))
    }

    /// Initial state vector: declared initials plus initial assignments.
    pub fn initial_state(&self) -> DVector<f64> {
        let mut x = DVector::from_iterator(
            self.states.len(),
            self.states.iter().map(|state| state.init),
        );
        if !self.initial_assignments.is_empty() {
            let mut env = vec![0.0; self.env_template.len()];
            self.load_env(&x, 0.0, &mut env);
            for (idx, formula) in &self.initial_assignments {
                let value = formula.eval(&env);
                x[*idx] = match self.states[*idx].kind {
                    StateKind::SpeciesConc { volume_slot } => value * env[volume_slot],
                    _ => value,
                };
            }
        }
        x
    }

    /// Fill `env` for state `x` at time `t` and evaluate assignment rules.
    pub fn load_env(&self, x: &DVector<f64>, t: f64, env: &mut Vec<f64>) {
        env.clear();
        env.extend_from_slice(&self.env_template);
        env[self.time_slot] = t;
        for (idx, state) in self.states.iter().enumerate() {
            env[state.env_slot] = match state.kind {
                StateKind::SpeciesConc { volume_slot } => x[idx] / env[volume_slot],
                _ => x[idx],
            };
        }
        for (slot, formula) in &self.assignments {
            env[*slot] = formula.eval(env);
        }
    }

    /// Right-hand side: d(state)/dt in amount (or parameter value) per min.
    pub fn rhs(&self, x: &DVector<f64>, t: f64, dx: &mut DVector<f64>, env: &mut Vec<f64>) {
        self.load_env(x, t, env);
        dx.fill(0.0);
        for reaction in &self.reactions {
            let flux = reaction.flux.eval(env);
            for (idx, coef) in &reaction.stoichiometry {
                dx[*idx] += coef * flux;
            }
        }
        for (idx, formula) in &self.rate_rules {
            dx[*idx] += formula.eval(env);
        }
    }

    /// Resolve a selection string: `time`, `sid`, or `[sid]`.
    pub fn resolve_selection(&self, selection: &str) -> Result<Observable, DulasimError> {
        if selection == "time" {
            return Ok(Observable::Time);
        }
        if let Some(sid) = selection
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
        {
            let idx = self
                .state_index
                .get(sid)
                .ok_or_else(|| DulasimError::UnknownSelection(selection.to_string()))?;
            return Ok(match self.states[*idx].kind {
                // concentration species already carry the ratio in their slot
                StateKind::SpeciesConc { .. } => Observable::Slot(self.states[*idx].env_slot),
                StateKind::SpeciesAmount { volume_slot } => Observable::Ratio {
                    slot: self.states[*idx].env_slot,
                    volume_slot,
                },
                StateKind::Parameter => {
                    return Err(DulasimError::UnknownSelection(selection.to_string()))
                }
            });
        }
        self.slots
            .get(selection)
            .map(|slot| Observable::Slot(*slot))
            .ok_or_else(|| DulasimError::UnknownSelection(selection.to_string()))
    }

    /// Sample an observable from a loaded environment.
    pub fn observe(&self, observable: Observable, env: &[f64], t: f64) -> f64 {
        match observable {
            Observable::Time => t,
            Observable::Slot(slot) => env[slot],
            Observable::Ratio { slot, volume_slot } => env[slot] / env[volume_slot],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::expr::sym;
    use crate::model::{
        AssignmentRule, Compartment, DoseParameter, InitialAssignment, Parameter, RateRule,
        Reaction, Species,
    };
    use crate::units::Unit;
    use approx::assert_relative_eq;

    fn decay_model() -> Model {
        Model::new("decay")
            .compartment(Compartment::new("Vext", 2.0, Unit::Litre))
            .species(Species::concentration("drug", "Vext", 1.0))
            .parameter(Parameter::constant("k", 0.1, Unit::PerMin))
            .parameter(Parameter::dynamic("drug_total", f64::NAN, Unit::MMole))
            .assignment_rule(AssignmentRule::new(
                "drug_total",
                sym("drug") * sym("Vext"),
                Unit::MMole,
            ))
            .reaction(
                Reaction::new("ELIM", sym("k") * sym("Vext") * sym("drug")).reactant("drug"),
            )
    }

    #[test]
    fn test_rhs_decay() {
        let compiled = decay_model().compile().unwrap();
        let x = compiled.initial_state();
        // initial amount = 1.0 mM * 2.0 l
        assert_relative_eq!(x[0], 2.0);

        let mut dx = x.clone();
        let mut env = Vec::new();
        compiled.rhs(&x, 0.0, &mut dx, &mut env);
        // d(amount)/dt = -k * Vext * conc = -0.1 * 2.0 * 1.0
        assert_relative_eq!(dx[0], -0.2);
    }

    #[test]
    fn test_assignment_observable() {
        let compiled = decay_model().compile().unwrap();
        let x = compiled.initial_state();
        let mut env = Vec::new();
        compiled.load_env(&x, 0.0, &mut env);

        let conc = compiled.resolve_selection("[drug]").unwrap();
        let total = compiled.resolve_selection("drug_total").unwrap();
        assert_relative_eq!(compiled.observe(conc, &env, 0.0), 1.0);
        assert_relative_eq!(compiled.observe(total, &env, 0.0), 2.0);
    }

    #[test]
    fn test_parameter_rate_rule_state() {
        let model = Model::new("fat")
            .parameter(Parameter::dynamic("DFAT", 0.0, Unit::Kg))
            .parameter(Parameter::constant("rate", -0.5, Unit::KgPerMin))
            .rate_rule(RateRule::new("DFAT", sym("rate"), Unit::KgPerMin));
        let compiled = model.compile().unwrap();
        assert_eq!(compiled.nstates(), 1);

        let x = compiled.initial_state();
        let mut dx = x.clone();
        let mut env = Vec::new();
        compiled.rhs(&x, 0.0, &mut dx, &mut env);
        assert_relative_eq!(dx[0], -0.5);
    }

    #[test]
    fn test_initial_assignment() {
        let model = Model::new("baseline")
            .compartment(Compartment::new("Vext", 1.5, Unit::Litre))
            .species(Species::concentration("fpg", "Vext", 0.0))
            .parameter(Parameter::constant("fpg0", 5.0, Unit::MilliMolar))
            .initial_assignment(InitialAssignment::new("fpg", sym("fpg0")));
        let compiled = model.compile().unwrap();
        let x = compiled.initial_state();
        // concentration 5.0 mM in 1.5 l
        assert_relative_eq!(x[0], 7.5);
    }

    #[test]
    fn test_dose_application() {
        let mr = 3314.6;
        let model = Model::new("dosing")
            .compartment(Compartment::new("Vsc", 1.0, Unit::Litre))
            .species(Species::amount("dul_sc", "Vsc", 0.0))
            .parameter(Parameter::constant("SCDOSE_dul", 0.0, Unit::Mg))
            .parameter(Parameter::constant("Mr_dul", mr, Unit::GramPerMole))
            .dose(DoseParameter::new(
                "SCDOSE_dul",
                "dul_sc",
                sym("SCDOSE_dul") / sym("Mr_dul"),
            ));
        let mut compiled = model.compile().unwrap();
        compiled.set_value("SCDOSE_dul", 1.5).unwrap();

        let x = compiled.initial_state();
        let mut env = Vec::new();
        compiled.load_env(&x, 0.0, &mut env);
        let dose = &compiled.doses()[0];
        let (idx, amount) = compiled.dose_application(dose, &env);
        assert_eq!(idx, 0);
        // mg / (g/mole) = mmole
        assert_relative_eq!(amount, 1.5 / mr);
    }

    #[test]
    fn test_forward_reference_rejected() {
        let model = Model::new("fwd")
            .parameter(Parameter::dynamic("a", f64::NAN, Unit::Dimensionless))
            .parameter(Parameter::dynamic("b", f64::NAN, Unit::Dimensionless))
            .parameter(Parameter::constant("c", 1.0, Unit::Dimensionless))
            .assignment_rule(AssignmentRule::new("a", sym("b"), Unit::Dimensionless))
            .assignment_rule(AssignmentRule::new("b", sym("c"), Unit::Dimensionless));
        assert!(model.compile().is_err());
    }
}

