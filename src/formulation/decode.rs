use std::{fs::{self, OpenOptions}, io::Write, path::{Path, PathBuf}};

use anyhow::{bail, Context};
use clap::Args;
use tracing::{debug, info, warn};

use crate::instance::{ProblemType, VrbspInstance};

use super::builder::{Formulation, ModelOptions};
use super::solution::Solution;

#[derive(Debug, Args)]
pub struct Decode {
    /// The problem variant the model was built for
    pub problem_type: ProblemType,
    /// The path to the instance file
    pub instance: PathBuf,
    /// The solution file written by the solver
    pub solution: PathBuf,
    #[clap(flatten)]
    pub options: ModelOptions,
    /// Largest violation still accepted when checking constraints
    #[clap(long, default_value="1e-6")]
    pub tolerance: f64,
    /// Directory where objectives.txt and time.txt are appended to
    #[clap(short, long)]
    pub results: Option<PathBuf>,
    /// Wall-clock solve time in seconds, recorded in time.txt
    #[clap(short, long)]
    pub time: Option<f64>,
}

impl Decode {
    pub fn decode(&self) -> anyhow::Result<()> {
        let instance = VrbspInstance::load(&self.instance)
            .with_context(|| format!("cannot read instance {}", self.instance.display()))?;
        let formulation = Formulation::build(&instance, self.problem_type, &self.options)?;
        let solution = Solution::load(&self.solution, &formulation)
            .with_context(|| format!("cannot read solution {}", self.solution.display()))?;

        let violations = formulation.violations(&solution, self.tolerance);
        for v in &violations {
            warn!("constraint {} violated by {}", v.constraint, v.amount);
        }
        if violations.is_empty() {
            info!("solution satisfies every constraint");
        }

        for entry in formulation.schedule(&solution) {
            let (i, j) = (entry.link.i, entry.link.j);
            debug!("link ({i},{j}): interference {}, sinr {}", entry.interference, entry.sinr);
            for (t, c) in &entry.slots {
                println!("Link ({i},{j}) active at time {t} on channel {c}");
            }
            if let Some(rate) = &entry.rate {
                println!(
                    "Link ({i},{j}) transmits at speed {} Mbps with bandwidth {} MHz and SINR >= {} dB",
                    rate.rate, rate.bandwidth, rate.sinr_db
                );
            }
        }

        let objective = formulation.objective_value(&solution);
        println!("objective {objective}");

        if !violations.is_empty() {
            bail!("solution violates {} constraints, nothing recorded", violations.len());
        }

        if let Some(dir) = &self.results {
            fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
            append_line(&dir.join("objectives.txt"), &objective.to_string())?;
            if let Some(time) = self.time {
                append_line(&dir.join("time.txt"), &time.to_string())?;
            }
            info!("results recorded in {}", dir.display());
        }
        Ok(())
    }
}

fn append_line(path: &Path, line: &str) -> anyhow::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    writeln!(file, "{line}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::tests::two_links;

    #[test]
    fn records_objective_and_time() {
        let dir = tempfile::tempdir().unwrap();
        let instance = dir.path().join("two.txt");
        two_links().save(&instance).unwrap();
        let solution = dir.path().join("two.sol");
        // both links alone on the 160 MHz channel, so their SINR is free
        fs::write(
            &solution,
            "# Objective value = 144.2\nx_1_1_1_1 1\ny_1_1_4_1 1\nsinr_1_1 1e6\nx_2_2_1_1 1\ny_2_2_4_1 1\nsinr_2_2 1e6\n",
        )
        .unwrap();

        let results = dir.path().join("out").join("2");
        let cmd = Decode {
            problem_type: ProblemType::Vrbsp,
            instance,
            solution,
            options: ModelOptions::default(),
            tolerance: 1e-6,
            results: Some(results.clone()),
            time: Some(1.5),
        };
        cmd.decode().unwrap();
        cmd.decode().unwrap();

        let objectives = fs::read_to_string(results.join("objectives.txt")).unwrap();
        assert_eq!(objectives, "144.2\n144.2\n");
        let times = fs::read_to_string(results.join("time.txt")).unwrap();
        assert_eq!(times, "1.5\n1.5\n");
    }

    #[test]
    fn violated_solutions_are_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let instance = dir.path().join("two.txt");
        two_links().save(&instance).unwrap();
        let solution = dir.path().join("two.sol");
        // link 2 is never scheduled
        fs::write(&solution, "x_1_1_1_1 1\ny_1_1_4_12 1\ny_2_2_4_12 1\n").unwrap();

        let results = dir.path().join("out");
        let cmd = Decode {
            problem_type: ProblemType::Vrbsp,
            instance,
            solution,
            options: ModelOptions::default(),
            tolerance: 1e-6,
            results: Some(results.clone()),
            time: Some(1.5),
        };
        let err = cmd.decode().unwrap_err();
        assert!(format!("{err:#}").contains("nothing recorded"));
        assert!(!results.join("objectives.txt").exists());
        assert!(!results.join("time.txt").exists());
    }

    #[test]
    fn unknown_variables_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let instance = dir.path().join("two.txt");
        two_links().save(&instance).unwrap();
        let solution = dir.path().join("two.sol");
        fs::write(&solution, "z_1 1\n").unwrap();

        let cmd = Decode {
            problem_type: ProblemType::Vrbsp,
            instance,
            solution,
            options: ModelOptions::default(),
            tolerance: 1e-6,
            results: None,
            time: None,
        };
        let err = cmd.decode().unwrap_err();
        assert!(format!("{err:#}").contains("no variable `z_1`"));
    }
}
