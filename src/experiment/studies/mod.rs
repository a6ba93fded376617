//! Clinical study experiments.

mod barrington2011;
mod dungan2014;
mod fdagbcn;
mod fdagbdo;
mod fdagbdr;
mod liu2025;
mod nauck2014;
mod pratley2018;
mod zhang2023;

pub use barrington2011::Barrington2011;
pub use dungan2014::Dungan2014;
pub use fdagbcn::FdaGbcn;
pub use fdagbdo::FdaGbdo;
pub use fdagbdr::FdaGbdr;
pub use liu2025::Liu2025;
pub use nauck2014::Nauck2014;
pub use pratley2018::Pratley2018;
pub use zhang2023::Zhang2023;

use crate::experiment::Experiment;

/// All study experiments in run order.
pub fn experiments() -> Vec<Box<dyn Experiment>> {
    vec![
        Box::new(Barrington2011),
        Box::new(Dungan2014),
        Box::new(Nauck2014),
        Box::new(Pratley2018),
        Box::new(Zhang2023),
        Box::new(Liu2025),
        Box::new(FdaGbcn),
        Box::new(FdaGbdo),
        Box::new(FdaGbdr),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_tasks_match_simulations() {
        for experiment in experiments() {
            let sims = experiment.simulations();
            let tasks = experiment.tasks();
            assert_eq!(sims.len(), tasks.len(), "{}", experiment.name());
            for task in tasks {
                assert!(sims.contains_key(&task.simulation));
            }
        }
    }

    #[test]
    fn test_mappings_reference_known_tasks() {
        use crate::experiment::FitData;
        for experiment in experiments() {
            let tasks: Vec<String> = experiment.tasks().into_iter().map(|t| t.name).collect();
            for (key, mapping) in experiment.fit_mappings() {
                match &mapping.observable {
                    FitData::Observable { task, .. } => {
                        assert!(tasks.contains(task), "{}: {key}", experiment.name())
                    }
                    FitData::Reference { .. } => panic!("observable expected in {key}"),
                }
            }
        }
    }

    #[test]
    fn test_simulations_resolve_on_model() {
        // every change id must resolve against the whole-body model
        let model = crate::models::dulaglutide_body().unwrap().compile().unwrap();
        for experiment in experiments() {
            for (_, sim) in experiment.simulations() {
                for tc in &sim.timecourses {
                    for (key, _) in &tc.changes {
                        let sid = key.trim_start_matches('[').trim_end_matches(']');
                        assert!(
                            model.declared_unit(sid).is_some(),
                            "{}: unknown change target {key}",
                            experiment.name()
                        );
                    }
                }
            }
        }
    }
}
