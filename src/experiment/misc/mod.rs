//! Exploratory experiments without reference data.

use std::collections::BTreeMap;

use crate::experiment::base::{self, WEEK};
use crate::experiment::Experiment;
use crate::simulator::{Timecourse, TimecourseSim};
use crate::units::{Quantity, Unit};

/// Dose dependency of plasma levels and effects: weekly iv and sc dosing over
/// twelve weeks across the therapeutic range.
pub struct DoseDependency;

const ROUTES: [&str; 2] = ["IV", "SC"];
const DOSES: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.5];

impl Experiment for DoseDependency {
    fn name(&self) -> &str {
        "DoseDependency"
    }

    fn simulations(&self) -> BTreeMap<String, TimecourseSim> {
        let mut tcsims = BTreeMap::new();
        for route in ROUTES {
            for dose in DOSES {
                let dose_parameter = format!("{route}DOSE_dul");
                let tc0 = Timecourse::new(0.0, WEEK, 1000)
                    .changes(base::default_changes())
                    .change(&dose_parameter, Quantity::new(dose, Unit::Mg));
                let tc1 = Timecourse::new(0.0, WEEK, 1000)
                    .change(&dose_parameter, Quantity::new(dose, Unit::Mg));
                let tc2 = Timecourse::new(0.0, 8.0 * WEEK, 1000)
                    .change(&dose_parameter, Quantity::new(dose, Unit::Mg));
                let mut timecourses = vec![tc0];
                timecourses.extend(std::iter::repeat(tc1).take(3));
                timecourses.push(tc2);
                tcsims.insert(
                    format!("dul_{route}_{dose}"),
                    TimecourseSim::new(timecourses),
                );
            }
        }
        tcsims
    }
}

/// All exploratory experiments.
pub fn experiments() -> Vec<Box<dyn Experiment>> {
    vec![Box::new(DoseDependency)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dose_dependency_simulations() {
        let sims = DoseDependency.simulations();
        assert_eq!(sims.len(), ROUTES.len() * DOSES.len());
        let sim = &sims["dul_SC_1.5"];
        assert_eq!(sim.timecourses.len(), 5);
        assert_eq!(sim.total_duration(), 12.0 * WEEK);
    }
}
