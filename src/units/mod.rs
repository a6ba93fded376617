//! Unit handling for model quantities and reference data.
//!
//! Every unit belongs to a dimension family and carries a conversion factor
//! to that family's canonical base. Model mathematics always runs in base
//! units (minutes, millimoles, mM, litres, kilograms); values entering
//! through experiment changes or reference datasets are converted on the way
//! in, and observables are converted on the way out for reporting.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DulasimError;

/// Dimension family of a unit. Conversion is only defined within a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    Time,
    Amount,
    Concentration,
    Volume,
    Mass,
    Dimensionless,
    /// Rates and other compound units; descriptive only, no conversion table.
    Composite,
}

/// Units used across the dulaglutide, bodyweight and HbA1c models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum Unit {
    // time (base: min)
    Min,
    Hr,
    Day,
    Week,
    // substance amount (base: mmole)
    MMole,
    UMole,
    NMole,
    // concentration (base: mM)
    MilliMolar,
    MicroMolar,
    NanoMolar,
    // volume (base: litre)
    Litre,
    MilliLitre,
    // mass (base: kg)
    Kg,
    Gram,
    Mg,
    // dimensionless (base: 1)
    Dimensionless,
    Percent,
    // composite, carried for description only
    PerMin,
    PerHr,
    LitrePerMin,
    MMolePerMin,
    KgPerMin,
    MilliMolarTimesMin,
    LitreSquaredPerMinPerMMole,
    GramPerMole,
    KgPerM2,
    Cm,
    M2,
}

impl Unit {
    pub fn dimension(&self) -> Dimension {
        use Unit::*;
        match self {
            Min | Hr | Day | Week => Dimension::Time,
            MMole | UMole | NMole => Dimension::Amount,
            MilliMolar | MicroMolar | NanoMolar => Dimension::Concentration,
            Litre | MilliLitre => Dimension::Volume,
            Kg | Gram | Mg => Dimension::Mass,
            Dimensionless | Percent => Dimension::Dimensionless,
            _ => Dimension::Composite,
        }
    }

    /// Factor to the canonical base unit of the family.
    fn factor(&self) -> Option<f64> {
        use Unit::*;
        let f = match self {
            Min => 1.0,
            Hr => 60.0,
            Day => 24.0 * 60.0,
            Week => 7.0 * 24.0 * 60.0,
            MMole => 1.0,
            UMole => 1e-3,
            NMole => 1e-6,
            MilliMolar => 1.0,
            MicroMolar => 1e-3,
            NanoMolar => 1e-6,
            Litre => 1.0,
            MilliLitre => 1e-3,
            Kg => 1.0,
            Gram => 1e-3,
            Mg => 1e-6,
            Dimensionless => 1.0,
            Percent => 1e-2,
            _ => return None,
        };
        Some(f)
    }

    /// Convert a value in `self` to `target`.
    pub fn convert(&self, value: f64, target: Unit) -> Result<f64, DulasimError> {
        if self == &target {
            return Ok(value);
        }
        if self.dimension() != target.dimension() {
            return Err(DulasimError::Unit(format!(
                "cannot convert {self} to {target}"
            )));
        }
        match (self.factor(), target.factor()) {
            (Some(from), Some(to)) => Ok(value * from / to),
            _ => Err(DulasimError::Unit(format!(
                "no conversion defined between {self} and {target}"
            ))),
        }
    }

    /// Convert a value in `self` to the family's base unit.
    pub fn to_base(&self, value: f64) -> Result<f64, DulasimError> {
        match self.factor() {
            Some(f) => Ok(value * f),
            None => Err(DulasimError::Unit(format!("{self} has no base conversion"))),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Unit::*;
        let s = match self {
            Min => "min",
            Hr => "hr",
            Day => "day",
            Week => "week",
            MMole => "mmole",
            UMole => "µmole",
            NMole => "nmole",
            MilliMolar => "mM",
            MicroMolar => "µM",
            NanoMolar => "nM",
            Litre => "l",
            MilliLitre => "ml",
            Kg => "kg",
            Gram => "g",
            Mg => "mg",
            Dimensionless => "dimensionless",
            Percent => "percent",
            PerMin => "1/min",
            PerHr => "1/hr",
            LitrePerMin => "l/min",
            MMolePerMin => "mmole/min",
            KgPerMin => "kg/min",
            MilliMolarTimesMin => "mM*min",
            LitreSquaredPerMinPerMMole => "(l*l)/(min*mmole)",
            GramPerMole => "g/mole",
            KgPerM2 => "kg/m^2",
            Cm => "cm",
            M2 => "m^2",
        };
        write!(f, "{s}")
    }
}

/// A value with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Value expressed in the family's base unit.
    pub fn base_value(&self) -> Result<f64, DulasimError> {
        self.unit.to_base(self.value)
    }

    pub fn convert_to(&self, target: Unit) -> Result<Quantity, DulasimError> {
        Ok(Quantity::new(self.unit.convert(self.value, target)?, target))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_time_conversion() {
        assert_relative_eq!(Unit::Week.convert(1.0, Unit::Min).unwrap(), 10080.0);
        assert_relative_eq!(Unit::Min.convert(90.0, Unit::Hr).unwrap(), 1.5);
    }

    #[test]
    fn test_roundtrip() {
        // converting to model units and back reproduces the original value
        for (value, from, to) in [
            (63.43, Unit::Kg, Unit::Gram),
            (5.0, Unit::Percent, Unit::Dimensionless),
            (24.7, Unit::NanoMolar, Unit::MilliMolar),
            (18.0 * 24.0 * 60.0, Unit::Min, Unit::Week),
        ] {
            let there = from.convert(value, to).unwrap();
            let back = to.convert(there, from).unwrap();
            assert_relative_eq!(back, value, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        assert!(Unit::Kg.convert(1.0, Unit::Min).is_err());
        assert!(Unit::PerMin.convert(1.0, Unit::PerHr).is_err());
    }

    #[test]
    fn test_quantity() {
        let q = Quantity::new(0.05, Unit::Dimensionless);
        let p = q.convert_to(Unit::Percent).unwrap();
        assert_relative_eq!(p.value, 5.0);
    }
}
