//! Reading a solver solution back against the model it solves.

use std::{collections::HashMap, path::Path};

use super::builder::{interference_name, sinr_name, x_name, y_name, Formulation};

use super::error::SolutionError;
use super::sets::{Link, RateOption};

/// Values above this are read as 1 for binaries.
const ACTIVE: f64 = 0.5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solution {
    pub values: HashMap<String, f64>,
}

impl Solution {
    pub fn load(path: impl AsRef<Path>, formulation: &Formulation) -> Result<Self, SolutionError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SolutionError::MissingFile(path.to_path_buf()));
        }
        Self::parse(&std::fs::read_to_string(path)?, formulation)
    }

    /// Reads `name value` lines, as written by Gurobi and SCIP. Comments
    /// (`#`), the SCIP status header and trailing `(obj:...)` notes are
    /// skipped.
    pub fn parse(text: &str, formulation: &Formulation) -> Result<Self, SolutionError> {
        let mut values = HashMap::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with("solution status:")
                || line.starts_with("objective value:")
            {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let (Some(name), Some(value)) = (tokens.next(), tokens.next()) else {
                return Err(SolutionError::Malformed { line: i + 1, text: line.to_string() });
            };
            let value: f64 = value
                .parse()
                .map_err(|_| SolutionError::Malformed { line: i + 1, text: line.to_string() })?;
            if !formulation.milp.is_variable(name) {
                return Err(SolutionError::UnknownVariable { line: i + 1, name: name.to_string() });
            }
            values.insert(name.to_string(), value);
        }
        Ok(Solution { values })
    }

    pub fn value(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }
}

/// A constraint not satisfied by a solution.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub constraint: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkSchedule {
    pub link: Link,
    /// Active (time slot, channel id) pairs.
    pub slots: Vec<(usize, usize)>,
    pub rate: Option<RateOption>,
    pub interference: f64,
    pub sinr: f64,
}

impl Formulation {
    pub fn objective_value(&self, solution: &Solution) -> f64 {
        self.milp.objective.value(&solution.values)
    }

    pub fn violations(&self, solution: &Solution, tolerance: f64) -> Vec<Violation> {
        self.milp
            .constraints
            .iter()
            .filter_map(|c| {
                let amount = c.violation(&solution.values);
                (amount > tolerance).then(|| Violation { constraint: c.name.clone(), amount })
            })
            .collect()
    }

    pub fn schedule(&self, solution: &Solution) -> Vec<LinkSchedule> {
        self.sets
            .links
            .iter()
            .map(|&link| {
                let mut slots = vec![];
                for &t in &self.sets.time_slots {
                    for c in &self.sets.channels {
                        if solution.value(&x_name(link, t, c.id)) > ACTIVE {
                            slots.push((t, c.id));
                        }
                    }
                }
                let rate = self.sets.rates.iter().find(|r| solution.value(&y_name(link, r)) > ACTIVE).cloned();
                LinkSchedule {
                    link,
                    slots,
                    rate,
                    interference: solution.value(&interference_name(link)),
                    sinr: solution.value(&sinr_name(link)),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formulation::builder::{interfered_name, tests::build, ModelOptions};
    use crate::formulation::sets::ChannelPlan;
    use crate::instance::ProblemType;

    fn rate<'a>(f: &'a Formulation, class: usize, tier: usize) -> &'a RateOption {
        f.sets.rates.iter().find(|r| r.class == class && r.tier == tier).unwrap()
    }

    /// Both links on 160 MHz channels in the single slot: link 1 on channel
    /// 1 of the split plan (160), link 2 on channel 2 (160 of the 240 MHz
    /// spectrum).
    fn consistent(f: &Formulation) -> Solution {
        let l1 = Link { i: 1, j: 1 };
        let l2 = Link { i: 2, j: 2 };
        let mut values = HashMap::new();
        values.insert(x_name(l1, 1, 1), 1.0);
        values.insert(x_name(l2, 1, 2), 1.0);
        values.insert(y_name(l1, rate(f, 4, 1)), 1.0);
        values.insert(y_name(l2, rate(f, 4, 3)), 1.0);

        // the product of the two active x variables
        let w = f
            .milp
            .constraints
            .iter()
            .find(|c| {
                c.name.starts_with("and_ge_")
                    && c.expr.terms.contains_key(&x_name(l1, 1, 1))
                    && c.expr.terms.contains_key(&x_name(l2, 1, 2))
            })
            .map(|c| c.name.trim_start_matches("and_ge_").to_string())
            .unwrap();
        values.insert(w, 1.0);

        // interference on each link is the other link's signal
        let (s1, s2) = (f.sets.signal(0), f.sets.signal(1));
        values.insert(interference_name(l1), s2);
        values.insert(interference_name(l2), s1);
        values.insert(interfered_name(l1), 1.0);
        values.insert(interfered_name(l2), 1.0);
        values.insert(sinr_name(l1), s1 / s2);
        values.insert(sinr_name(l2), s2 / s1);
        Solution { values }
    }

    fn split() -> Formulation {
        build(ProblemType::Vrbsp, ModelOptions { channels: ChannelPlan::Split, ..ModelOptions::default() })
    }

    #[test]
    fn consistent_assignment_satisfies_every_row() {
        let f = split();
        let solution = consistent(&f);
        assert_eq!(f.violations(&solution, 1e-6), vec![]);
        assert!((f.objective_value(&solution) - (72.1 + 216.2)).abs() < 1e-9);

        let sinr = solution.value("sinr_1_1");
        let expected = f.sets.signal(0) / (solution.value("interference_1_1") + f.sets.noise);
        assert!((sinr - expected).abs() < 1e-12);
        assert!(solution.value("interference_2_2") >= 0.0);
    }

    #[test]
    fn links_alone_on_their_channel_are_feasible() {
        // per-spectrum plan: only the 160 MHz channel serves any rate, so both
        // links share it and nobody interferes
        let f = build(ProblemType::Vrbsp, ModelOptions::default());
        for sinr in [0.0, 1.0, 1e6] {
            let mut values = HashMap::new();
            for link in [Link { i: 1, j: 1 }, Link { i: 2, j: 2 }] {
                values.insert(x_name(link, 1, 1), 1.0);
                values.insert(y_name(link, rate(&f, 4, 1)), 1.0);
                values.insert(sinr_name(link), sinr);
            }
            let solution = Solution { values };
            assert_eq!(f.violations(&solution, 1e-6), vec![]);
            assert!((f.objective_value(&solution) - 2.0 * 72.1).abs() < 1e-9);
        }
    }

    #[test]
    fn interference_without_the_flag_is_a_violation() {
        let f = split();
        let mut solution = consistent(&f);
        solution.values.remove(&interfered_name(Link { i: 1, j: 1 }));
        let violated: Vec<String> = f.violations(&solution, 1e-6).into_iter().map(|v| v.constraint).collect();
        assert!(violated.contains(&"sinr_def_1_1".to_string()));
        assert!(violated.iter().any(|c| c.starts_with("interfered_by_")));
    }

    #[test]
    fn double_assignment_is_a_violation() {
        let f = split();
        let mut solution = consistent(&f);
        solution.values.insert(x_name(Link { i: 1, j: 1 }, 1, 3), 1.0);
        let violated: Vec<String> = f.violations(&solution, 1e-6).into_iter().map(|v| v.constraint).collect();
        assert!(violated.contains(&"one_time_channel_1_1".to_string()));
    }

    #[test]
    fn missing_speed_is_a_violation() {
        let f = split();
        let mut solution = consistent(&f);
        solution.values.remove(&y_name(Link { i: 2, j: 2 }, rate(&f, 4, 3)));
        let violated = f.violations(&solution, 1e-6);
        assert_eq!(violated, vec![Violation { constraint: "one_speed_2_2".into(), amount: 1.0 }]);
    }

    #[test]
    fn wrong_sinr_is_a_violation() {
        let f = split();
        let mut solution = consistent(&f);
        solution.values.insert(sinr_name(Link { i: 1, j: 1 }), 1.0);
        let violated: Vec<String> = f.violations(&solution, 1e-6).into_iter().map(|v| v.constraint).collect();
        assert_eq!(violated, vec!["sinr_def_1_1".to_string()]);
    }

    #[test]
    fn schedule_reads_active_variables() {
        let f = split();
        let schedule = f.schedule(&consistent(&f));
        assert_eq!(schedule[0].slots, vec![(1, 1)]);
        assert_eq!(schedule[1].slots, vec![(1, 2)]);
        assert_eq!(schedule[1].rate.as_ref().map(|r| r.rate), Some(216.2));
    }

    #[test]
    fn parses_solver_files() {
        let f = split();
        let text = "# Objective value = 288.3\nx_1_1_1_1 1\nsinr_1_1 0.064 \t(obj:0)\n\n";
        let solution = Solution::parse(text, &f).unwrap();
        assert_eq!(solution.value("x_1_1_1_1"), 1.0);
        assert_eq!(solution.value("sinr_1_1"), 0.064);
        assert_eq!(solution.value("x_2_2_1_1"), 0.0);

        assert!(matches!(
            Solution::parse("x_1_1_1_1 yes\n", &f),
            Err(SolutionError::Malformed { line: 1, .. })
        ));
        assert!(matches!(
            Solution::parse("x_9_9_1_1 1\n", &f),
            Err(SolutionError::UnknownVariable { line: 1, .. })
        ));
    }
}
