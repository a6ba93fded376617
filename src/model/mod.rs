//! Declarative ODE model construction.
//!
//! A [`Model`] is a named collection of compartments, species, parameters,
//! rules and reactions, assembled with a consuming builder API and compiled
//! into a [`compile::CompiledModel`] for the simulator. The builder performs
//! no validation; [`Model::validate`] checks the structural invariants before
//! compilation.

pub mod annotation;
pub mod compile;
pub mod expr;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::DulasimError;
use crate::units::Unit;
use annotation::{Annotation, SboTerm};
use expr::Expr;

/// Physical compartment with a (possibly dynamic) volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Compartment {
    pub sid: String,
    pub name: Option<String>,
    pub value: f64,
    pub unit: Unit,
    pub annotations: Vec<Annotation>,
}

impl Compartment {
    pub fn new(sid: impl Into<String>, value: f64, unit: Unit) -> Self {
        Self {
            sid: sid.into(),
            name: None,
            value,
            unit,
            annotations: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// Initial value of a species, in amount or concentration form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum SpeciesInitial {
    Amount(f64),
    Concentration(f64),
}

/// State variable living in a compartment.
///
/// `amount_based` mirrors SBML's `hasOnlySubstanceUnits`: amount-based
/// species appear in formulas as amounts, the rest as concentrations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species {
    pub sid: String,
    pub name: Option<String>,
    pub compartment: String,
    pub initial: SpeciesInitial,
    pub amount_based: bool,
    pub unit: Unit,
    pub annotations: Vec<Annotation>,
}

impl Species {
    pub fn concentration(sid: impl Into<String>, compartment: impl Into<String>, initial: f64) -> Self {
        Self {
            sid: sid.into(),
            name: None,
            compartment: compartment.into(),
            initial: SpeciesInitial::Concentration(initial),
            amount_based: false,
            unit: Unit::MMole,
            annotations: Vec::new(),
        }
    }

    pub fn amount(sid: impl Into<String>, compartment: impl Into<String>, initial: f64) -> Self {
        Self {
            sid: sid.into(),
            name: None,
            compartment: compartment.into(),
            initial: SpeciesInitial::Amount(initial),
            amount_based: true,
            unit: Unit::MMole,
            annotations: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// Scalar model quantity.
///
/// NaN values are placeholders the experiment layer is expected to set
/// before simulation; this is a caller obligation, not validated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub sid: String,
    pub name: Option<String>,
    pub value: f64,
    pub unit: Unit,
    pub constant: bool,
    pub sbo: Option<SboTerm>,
    pub annotations: Vec<Annotation>,
    pub notes: Option<String>,
}

impl Parameter {
    pub fn constant(sid: impl Into<String>, value: f64, unit: Unit) -> Self {
        Self {
            sid: sid.into(),
            name: None,
            value,
            unit,
            constant: true,
            sbo: None,
            annotations: Vec::new(),
            notes: None,
        }
    }

    pub fn dynamic(sid: impl Into<String>, value: f64, unit: Unit) -> Self {
        Self {
            constant: false,
            ..Self::constant(sid, value, unit)
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn sbo(mut self, term: SboTerm) -> Self {
        self.sbo = Some(term);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// Algebraic derived quantity, re-evaluated at every solver step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRule {
    pub target: String,
    pub formula: Expr,
    pub unit: Unit,
    pub notes: Option<String>,
}

impl AssignmentRule {
    pub fn new(target: impl Into<String>, formula: Expr, unit: Unit) -> Self {
        Self {
            target: target.into(),
            formula,
            unit,
            notes: None,
        }
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Direct d/dt contribution for a species or parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateRule {
    pub target: String,
    pub formula: Expr,
    pub unit: Unit,
}

impl RateRule {
    pub fn new(target: impl Into<String>, formula: Expr, unit: Unit) -> Self {
        Self {
            target: target.into(),
            formula,
            unit,
        }
    }
}

/// Expression overriding an initial value at simulation reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialAssignment {
    pub target: String,
    pub formula: Expr,
}

impl InitialAssignment {
    pub fn new(target: impl Into<String>, formula: Expr) -> Self {
        Self {
            target: target.into(),
            formula,
        }
    }
}

/// Reaction with a flux formula (mmole/min) and signed stoichiometry.
///
/// Reactants carry negative coefficients, products positive ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub sid: String,
    pub name: Option<String>,
    pub stoichiometry: Vec<(String, f64)>,
    pub formula: Expr,
    pub compartment: Option<String>,
    pub sbo: Option<SboTerm>,
}

impl Reaction {
    pub fn new(sid: impl Into<String>, formula: Expr) -> Self {
        Self {
            sid: sid.into(),
            name: None,
            stoichiometry: Vec::new(),
            formula,
            compartment: None,
            sbo: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn reactant(mut self, sid: impl Into<String>) -> Self {
        self.stoichiometry.push((sid.into(), -1.0));
        self
    }

    pub fn product(mut self, sid: impl Into<String>) -> Self {
        self.stoichiometry.push((sid.into(), 1.0));
        self
    }

    pub fn compartment(mut self, sid: impl Into<String>) -> Self {
        self.compartment = Some(sid.into());
        self
    }

    pub fn sbo(mut self, term: SboTerm) -> Self {
        self.sbo = Some(term);
        self
    }
}

/// Dose entry point: a constant dose parameter, the depot species it fills,
/// and the conversion from dose units to amount.
///
/// Setting the dose parameter in a timecourse segment's changes applies the
/// converted amount to the target species at segment start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoseParameter {
    pub parameter: String,
    pub target: String,
    pub conversion: Expr,
}

impl DoseParameter {
    pub fn new(
        parameter: impl Into<String>,
        target: impl Into<String>,
        conversion: Expr,
    ) -> Self {
        Self {
            parameter: parameter.into(),
            target: target.into(),
            conversion,
        }
    }
}

/// Declarative ODE model for one physiological subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub sid: String,
    pub name: Option<String>,
    pub notes: Option<String>,
    pub compartments: Vec<Compartment>,
    pub species: Vec<Species>,
    pub parameters: Vec<Parameter>,
    pub assignment_rules: Vec<AssignmentRule>,
    pub rate_rules: Vec<RateRule>,
    pub initial_assignments: Vec<InitialAssignment>,
    pub reactions: Vec<Reaction>,
    pub doses: Vec<DoseParameter>,
    pub annotations: Vec<Annotation>,
}

impl Model {
    pub fn new(sid: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            name: None,
            notes: None,
            compartments: Vec::new(),
            species: Vec::new(),
            parameters: Vec::new(),
            assignment_rules: Vec::new(),
            rate_rules: Vec::new(),
            initial_assignments: Vec::new(),
            reactions: Vec::new(),
            doses: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn compartment(mut self, compartment: Compartment) -> Self {
        self.compartments.push(compartment);
        self
    }

    pub fn species(mut self, species: Species) -> Self {
        self.species.push(species);
        self
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn assignment_rule(mut self, rule: AssignmentRule) -> Self {
        self.assignment_rules.push(rule);
        self
    }

    pub fn rate_rule(mut self, rule: RateRule) -> Self {
        self.rate_rules.push(rule);
        self
    }

    pub fn initial_assignment(mut self, assignment: InitialAssignment) -> Self {
        self.initial_assignments.push(assignment);
        self
    }

    pub fn reaction(mut self, reaction: Reaction) -> Self {
        self.reactions.push(reaction);
        self
    }

    pub fn dose(mut self, dose: DoseParameter) -> Self {
        self.doses.push(dose);
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Flat composition of submodels into one model.
    ///
    /// Compartments and parameters present in both models must be identical
    /// (shared plumbing like `Vext`); any other duplicate id is an error.
    pub fn merge(mut self, other: Model) -> Result<Model, DulasimError> {
        for compartment in other.compartments {
            match self.compartments.iter().find(|c| c.sid == compartment.sid) {
                None => self.compartments.push(compartment),
                Some(existing)
                    if existing.value == compartment.value
                        && existing.unit == compartment.unit => {}
                Some(_) => {
                    return Err(DulasimError::DuplicateId(compartment.sid, self.sid));
                }
            }
        }
        for parameter in other.parameters {
            match self.parameters.iter().find(|p| p.sid == parameter.sid) {
                None => self.parameters.push(parameter),
                Some(existing)
                    if (existing.value == parameter.value
                        || (existing.value.is_nan() && parameter.value.is_nan()))
                        && existing.constant == parameter.constant => {}
                Some(_) => {
                    return Err(DulasimError::DuplicateId(parameter.sid, self.sid));
                }
            }
        }
        for species in other.species {
            if self.species.iter().any(|s| s.sid == species.sid) {
                return Err(DulasimError::DuplicateId(species.sid, self.sid));
            }
            self.species.push(species);
        }
        for reaction in other.reactions {
            if self.reactions.iter().any(|r| r.sid == reaction.sid) {
                return Err(DulasimError::DuplicateId(reaction.sid, self.sid));
            }
            self.reactions.push(reaction);
        }
        self.assignment_rules.extend(other.assignment_rules);
        self.rate_rules.extend(other.rate_rules);
        self.initial_assignments.extend(other.initial_assignments);
        self.doses.extend(other.doses);
        self.annotations.extend(other.annotations);
        Ok(self)
    }

    /// Remove an assignment rule, used when a merged model redefines a
    /// submodel's externally-driven input (e.g. the PD drug concentration).
    pub fn without_rule(mut self, target: &str) -> Self {
        self.assignment_rules.retain(|r| r.target != target);
        self
    }

    fn known_symbols(&self) -> HashMap<String, ()> {
        let mut known: HashMap<String, ()> = HashMap::new();
        known.insert("t".to_string(), ());
        for c in &self.compartments {
            known.insert(c.sid.clone(), ());
        }
        for p in &self.parameters {
            known.insert(p.sid.clone(), ());
        }
        for s in &self.species {
            known.insert(s.sid.clone(), ());
        }
        known
    }

    /// Check the structural invariants.
    ///
    /// Every non-constant quantity must be driven by at most one rule or, for
    /// species, by reactions. Quantities with no driver are held at their
    /// value and may be set by the experiment layer (NaN placeholders).
    pub fn validate(&self) -> Result<(), DulasimError> {
        // unique ids across namespaces
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for sid in self
            .compartments
            .iter()
            .map(|c| c.sid.as_str())
            .chain(self.species.iter().map(|s| s.sid.as_str()))
            .chain(self.parameters.iter().map(|p| p.sid.as_str()))
            .chain(self.reactions.iter().map(|r| r.sid.as_str()))
        {
            *seen.entry(sid).or_insert(0) += 1;
        }
        if let Some((sid, _)) = seen.iter().find(|(_, count)| **count > 1) {
            return Err(DulasimError::DuplicateId(
                sid.to_string(),
                self.sid.clone(),
            ));
        }

        // each quantity driven by at most one rule class
        let mut drivers: HashMap<&str, usize> = HashMap::new();
        for rule in &self.assignment_rules {
            *drivers.entry(rule.target.as_str()).or_insert(0) += 1;
        }
        for rule in &self.rate_rules {
            *drivers.entry(rule.target.as_str()).or_insert(0) += 1;
        }
        let mut reacting: HashMap<&str, bool> = HashMap::new();
        for reaction in &self.reactions {
            for (sid, _) in &reaction.stoichiometry {
                reacting.insert(sid.as_str(), true);
            }
        }
        for (sid, seen) in reacting {
            if seen {
                *drivers.entry(sid).or_insert(0) += 1;
            }
        }
        for (sid, count) in &drivers {
            if *count > 1 {
                return Err(DulasimError::ConflictingRules {
                    id: sid.to_string(),
                    count: *count,
                });
            }
        }

        // constant parameters must not be rule targets
        for p in &self.parameters {
            if p.constant && drivers.contains_key(p.sid.as_str()) {
                return Err(DulasimError::Model(format!(
                    "constant parameter '{}' is a rule target",
                    p.sid
                )));
            }
        }

        // all formula symbols resolvable
        let known = self.known_symbols();
        let check = |formula: &Expr, context: &str| -> Result<(), DulasimError> {
            for symbol in formula.symbols() {
                if !known.contains_key(symbol) {
                    return Err(DulasimError::UnknownSymbol {
                        symbol: symbol.to_string(),
                        context: context.to_string(),
                    });
                }
            }
            Ok(())
        };
        for rule in &self.assignment_rules {
            check(&rule.formula, &rule.target)?;
        }
        for rule in &self.rate_rules {
            check(&rule.formula, &rule.target)?;
        }
        for assignment in &self.initial_assignments {
            check(&assignment.formula, &assignment.target)?;
        }
        for reaction in &self.reactions {
            check(&reaction.formula, &reaction.sid)?;
            for (sid, _) in &reaction.stoichiometry {
                if !self.species.iter().any(|s| &s.sid == sid) {
                    return Err(DulasimError::UnknownSymbol {
                        symbol: sid.clone(),
                        context: reaction.sid.clone(),
                    });
                }
            }
        }
        for dose in &self.doses {
            check(&dose.conversion, &dose.parameter)?;
            if !self.species.iter().any(|s| s.sid == dose.target) {
                return Err(DulasimError::UnknownSymbol {
                    symbol: dose.target.clone(),
                    context: dose.parameter.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expr::sym;

    fn minimal() -> Model {
        Model::new("test")
            .compartment(Compartment::new("Vext", 1.5, Unit::Litre))
            .species(Species::concentration("drug", "Vext", 0.0))
            .parameter(Parameter::constant("k", 0.1, Unit::PerMin))
            .reaction(
                Reaction::new("ELIM", sym("k") * sym("Vext") * sym("drug")).reactant("drug"),
            )
    }

    #[test]
    fn test_validate_ok() {
        minimal().validate().unwrap();
    }

    #[test]
    fn test_duplicate_id() {
        let m = minimal().parameter(Parameter::constant("drug", 1.0, Unit::Dimensionless));
        assert!(matches!(
            m.validate(),
            Err(DulasimError::DuplicateId(_, _))
        ));
    }

    #[test]
    fn test_conflicting_drivers() {
        let m = minimal().rate_rule(RateRule::new(
            "drug",
            sym("k") * sym("drug"),
            Unit::MMolePerMin,
        ));
        assert!(matches!(
            m.validate(),
            Err(DulasimError::ConflictingRules { .. })
        ));
    }

    #[test]
    fn test_unknown_symbol_in_reaction() {
        let m = minimal().reaction(Reaction::new("BAD", sym("missing")).reactant("drug"));
        let err = m.validate().unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_merge_shared_compartment() {
        let a = minimal();
        let b = Model::new("other")
            .compartment(Compartment::new("Vext", 1.5, Unit::Litre))
            .species(Species::amount("marker", "Vext", 1.0));
        let merged = a.merge(b).unwrap();
        assert_eq!(merged.compartments.len(), 1);
        assert_eq!(merged.species.len(), 2);
    }

    #[test]
    fn test_merge_conflicting_compartment() {
        let a = minimal();
        let b = Model::new("other").compartment(Compartment::new("Vext", 2.0, Unit::Litre));
        assert!(a.merge(b).is_err());
    }
}
