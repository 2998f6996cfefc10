use std::{fs, path::PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::{info, warn};

use crate::instance::{ProblemType, VrbspInstance};

use super::builder::{Formulation, ModelOptions};
use super::linear::emit_lp;
use super::presolve::find_conflict;

#[derive(Debug, Args)]
pub struct BuildModel {
    /// The problem variant, VRBSP (one time slot) or MD-VRBSP (one slot per link)
    pub problem_type: ProblemType,
    /// The path to the instance file
    pub instance: PathBuf,
    #[clap(flatten)]
    pub options: ModelOptions,
    /// Where to write the LP file, defaults to the instance path with an .lp extension
    #[clap(short, long)]
    pub output: Option<PathBuf>,
    /// Where to write the conflicting rows, as an LP file, when the model is found infeasible
    #[clap(long)]
    pub iis: Option<PathBuf>,
    /// Where to write a JSON summary of the model size
    #[clap(long)]
    pub summary: Option<PathBuf>,
}

impl BuildModel {
    pub fn build(&self) -> anyhow::Result<()> {
        let instance = VrbspInstance::load(&self.instance)
            .with_context(|| format!("cannot read instance {}", self.instance.display()))?;
        info!("building {} model for {} links", self.problem_type, instance.nb_links);

        let formulation = Formulation::build(&instance, self.problem_type, &self.options)?;
        let summary = formulation.summary();
        info!(
            binaries = summary.binaries,
            continuous = summary.continuous,
            constraints = summary.constraints,
            "model built"
        );

        let output = self.output.clone().unwrap_or_else(|| self.instance.with_extension("lp"));
        fs::write(&output, emit_lp(&formulation.milp))
            .with_context(|| format!("cannot write {}", output.display()))?;
        println!("{}", output.display());

        if let Some(path) = &self.summary {
            fs::write(path, serde_json::to_string_pretty(&summary)?)
                .with_context(|| format!("cannot write {}", path.display()))?;
        }

        if let Some(conflict) = find_conflict(&formulation.milp) {
            let names: Vec<&str> = conflict.iter().map(|&i| formulation.milp.constraints[i].name.as_str()).collect();
            warn!("model is infeasible, irreducible conflict: {}", names.join(", "));
            if let Some(path) = &self.iis {
                fs::write(path, emit_lp(&formulation.milp.subsystem(&conflict)))
                    .with_context(|| format!("cannot write {}", path.display()))?;
                info!("conflict written to {}", path.display());
            }
        }

        Ok(())
    }
}
