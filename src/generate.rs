use std::{fs, path::PathBuf, time::{SystemTime, UNIX_EPOCH}};

use anyhow::Context;
use clap::{Args, ValueEnum};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;
use rand_distr::{Uniform, Distribution};
use thiserror::Error;
use tracing::{debug, info};

use crate::instance::{Point, ProblemType, VrbspInstance};
use crate::tables::{self, DATA_RATES, LEGACY_DEMANDS, SINR_DB};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("the number of devices must be at least 1")]
    NoDevices,
    #[error("the dimension must be a positive finite number, got {0}")]
    BadDimension(f64),
    #[error("at least one spectrum is required")]
    NoSpectrum,
}

/// The discrete set traffic demands are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemandMenu {
    /// Every entry of the data rate table
    Flattened,
    /// The older hand-typed menu, which lists 260.3 instead of 360.3
    Legacy,
}

impl DemandMenu {
    pub fn values(self) -> Vec<f64> {
        match self {
            DemandMenu::Flattened => tables::flattened_rates(),
            DemandMenu::Legacy => LEGACY_DEMANDS.to_vec(),
        }
    }
}

#[derive(Debug, Args)]
pub struct VrbspGenerator {
    /// The problem variant, VRBSP (one time slot) or MD-VRBSP (one slot per link)
    problem_type: ProblemType,
    /// The number of instances to generate
    nb_instances: usize,
    /// The number of links (sender/receiver pairs) in each instance
    nb_devices: usize,
    /// The side of the square area devices are placed in
    dimension: f64,
    /// An optional seed to kickstart the instance generation
    #[clap(short='s', long)]
    seed: Option<u128>,
    /// The path-loss exponent
    #[clap(long, default_value_t=tables::DEFAULT_ALPHA)]
    alpha: f64,
    /// The ambient noise power
    #[clap(long, default_value_t=tables::DEFAULT_NOISE)]
    noise: f64,
    /// The transmit power of every sender
    #[clap(long, default_value_t=tables::DEFAULT_POWER)]
    power: f64,
    /// The width of each available spectrum, in MHz
    #[clap(long, value_delimiter=',', default_value="160,240,100")]
    spectrums: Vec<u32>,
    /// The menu traffic demands are drawn from
    #[clap(long, value_enum, default_value="flattened")]
    demand_menu: DemandMenu,
    /// Directory where the instances are written
    #[clap(short, long, default_value="instances")]
    output_dir: PathBuf,
    /// Remove the output directory before generating
    #[clap(long)]
    clean: bool,
    /// Also write each instance as JSON
    #[clap(long)]
    json: bool,
}

impl VrbspGenerator {

    pub fn generate(&self) -> anyhow::Result<()> {
        self.validate()?;

        let base_seed = self.seed.unwrap_or_else(|| {
            SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or_default()
        });
        info!(seed = %base_seed, problem = %self.problem_type, "generating {} instances", self.nb_instances);

        if self.clean && self.output_dir.exists() {
            fs::remove_dir_all(&self.output_dir)
                .with_context(|| format!("cannot clean {}", self.output_dir.display()))?;
        }
        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("cannot create {}", self.output_dir.display()))?;

        for k in 1..=self.nb_instances {
            let mut rng = seeded_rng(base_seed.wrapping_add(k as u128));
            let instance = self.generate_instance(&mut rng);

            let path = self.output_dir.join(self.file_name(k));
            instance.save(&path).with_context(|| format!("cannot write {}", path.display()))?;
            if self.json {
                let json_path = path.with_extension("json");
                let json = serde_json::to_string_pretty(&instance)?;
                fs::write(&json_path, json).with_context(|| format!("cannot write {}", json_path.display()))?;
            }
            debug!("wrote {}", path.display());
        }

        info!("{} instances generated in folder '{}'", self.nb_instances, self.output_dir.display());
        Ok(())
    }

    fn validate(&self) -> Result<(), GenerateError> {
        if self.nb_devices == 0 {
            return Err(GenerateError::NoDevices);
        }
        if !(self.dimension.is_finite() && self.dimension > 0.0) {
            return Err(GenerateError::BadDimension(self.dimension));
        }
        if self.spectrums.is_empty() {
            return Err(GenerateError::NoSpectrum);
        }
        Ok(())
    }

    fn file_name(&self, k: usize) -> String {
        format!("{}_U_{}_{}.txt", self.problem_type, self.nb_devices, k)
    }

    pub fn generate_instance(&self, rng: &mut impl Rng) -> VrbspInstance {
        let receivers = self.generate_receivers(rng);
        let senders = self.generate_senders(rng, &receivers);
        let gamma = self.generate_demands(rng);

        VrbspInstance {
            nb_links: self.nb_devices,
            alpha: self.alpha,
            noise: self.noise,
            power: self.power,
            spectrums: self.spectrums.clone(),
            receivers,
            senders,
            gamma,
            data_rates: DATA_RATES.to_vec(),
            sinr: SINR_DB.to_vec(),
        }
    }

    fn generate_receivers(&self, rng: &mut impl Rng) -> Vec<Point> {
        let rand_coord = Uniform::new_inclusive(0.0, self.dimension);

        (0..self.nb_devices)
            .map(|_| Point { x: rand_coord.sample(rng), y: rand_coord.sample(rng) })
            .collect()
    }

    fn generate_senders(&self, rng: &mut impl Rng, receivers: &[Point]) -> Vec<Point> {
        let rand_coord = Uniform::new_inclusive(0.0, self.dimension);
        let max_distance = tables::max_link_distance();

        let mut senders = vec![];
        for receiver in receivers {
            loop {
                let sender = Point { x: rand_coord.sample(rng), y: rand_coord.sample(rng) };
                if sender.distance(receiver) <= max_distance {
                    senders.push(sender);
                    break;
                }
            }
        }

        senders
    }

    fn generate_demands(&self, rng: &mut impl Rng) -> Vec<f64> {
        let menu = self.demand_menu.values();
        let rand_entry = Uniform::new(0, menu.len());

        (0..self.nb_devices).map(|_| menu[rand_entry.sample(rng)]).collect()
    }

}

pub fn seeded_rng(init: u128) -> ChaChaRng {
    let mut seed = [0_u8; 32];
    seed.iter_mut().zip(init.to_be_bytes().into_iter()).for_each(|(s, i)| *s = i);
    seed.iter_mut().rev().zip(init.to_le_bytes().into_iter()).for_each(|(s, i)| *s = i);
    ChaChaRng::from_seed(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(problem_type: ProblemType, nb_devices: usize, dimension: f64) -> VrbspGenerator {
        VrbspGenerator {
            problem_type,
            nb_instances: 1,
            nb_devices,
            dimension,
            seed: Some(7),
            alpha: tables::DEFAULT_ALPHA,
            noise: tables::DEFAULT_NOISE,
            power: tables::DEFAULT_POWER,
            spectrums: vec![160, 240, 100],
            demand_menu: DemandMenu::Flattened,
            output_dir: PathBuf::from("instances"),
            clean: false,
            json: false,
        }
    }

    #[test]
    fn senders_stay_close_to_receivers() {
        let gen = generator(ProblemType::MdVrbsp, 200, 100.0);
        for seed in 0..5 {
            let instance = gen.generate_instance(&mut seeded_rng(seed));
            assert_eq!(instance.senders.len(), 200);
            for i in 0..instance.nb_links {
                assert!(instance.link_distance(i) <= tables::max_link_distance());
                for p in [instance.senders[i], instance.receivers[i]] {
                    assert!((0.0..=100.0).contains(&p.x) && (0.0..=100.0).contains(&p.y));
                }
            }
        }
    }

    #[test]
    fn demands_come_from_the_rate_table() {
        let rates = tables::flattened_rates();
        let instance = generator(ProblemType::Vrbsp, 300, 50.0).generate_instance(&mut seeded_rng(3));
        assert!(instance.gamma.iter().all(|g| rates.contains(g)));
    }

    #[test]
    fn legacy_menu_is_opt_in() {
        let mut gen = generator(ProblemType::Vrbsp, 500, 50.0);
        gen.demand_menu = DemandMenu::Legacy;
        let instance = gen.generate_instance(&mut seeded_rng(11));
        assert!(instance.gamma.iter().all(|g| LEGACY_DEMANDS.contains(g)));
    }

    #[test]
    fn same_seed_same_instance() {
        let gen = generator(ProblemType::Vrbsp, 10, 30.0);
        let a = gen.generate_instance(&mut seeded_rng(42));
        let b = gen.generate_instance(&mut seeded_rng(42));
        let c = gen.generate_instance(&mut seeded_rng(43));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn two_devices_file_shape() {
        let dir = tempfile::tempdir().unwrap();
        let mut gen = generator(ProblemType::Vrbsp, 2, 10.0);
        gen.output_dir = dir.path().to_path_buf();
        gen.generate().unwrap();

        let text = fs::read_to_string(dir.path().join("VRBSP_U_2_1.txt")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        let header: Vec<&str> = lines[0].split_whitespace().collect();
        assert_eq!(header[0], "2");
        assert_eq!(header[4], "3");
        assert_eq!(&header[5..], &["160", "240", "100"]);

        let blocks: Vec<Vec<&str>> = text
            .split("\n\n")
            .map(|b| b.lines().filter(|l| !l.is_empty()).collect::<Vec<_>>())
            .filter(|b| !b.is_empty())
            .collect();
        let sizes: Vec<usize> = blocks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![1, 4, 2, 12, 12]);
        assert!(blocks[3].iter().all(|row| row.split_whitespace().count() == 4));

        let parsed = VrbspInstance::load(dir.path().join("VRBSP_U_2_1.txt")).unwrap();
        assert_eq!(parsed, gen.generate_instance(&mut seeded_rng(8)));
    }

    #[test]
    fn batch_names_and_clean() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("batch");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("stale.txt"), "old").unwrap();

        let mut gen = generator(ProblemType::MdVrbsp, 3, 20.0);
        gen.nb_instances = 3;
        gen.output_dir = out.clone();
        gen.clean = true;
        gen.json = true;
        gen.generate().unwrap();

        let mut names: Vec<String> = fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "MD-VRBSP_U_3_1.json", "MD-VRBSP_U_3_1.txt",
                "MD-VRBSP_U_3_2.json", "MD-VRBSP_U_3_2.txt",
                "MD-VRBSP_U_3_3.json", "MD-VRBSP_U_3_3.txt",
            ]
        );

        let json = fs::read_to_string(out.join("MD-VRBSP_U_3_2.json")).unwrap();
        let from_json: VrbspInstance = serde_json::from_str(&json).unwrap();
        let from_text = VrbspInstance::load(out.join("MD-VRBSP_U_3_2.txt")).unwrap();
        assert_eq!(from_json.nb_links, from_text.nb_links);
        assert_eq!(from_json.spectrums, from_text.spectrums);
        assert_eq!(from_json.sinr, from_text.sinr);
    }

    #[test]
    fn invalid_sizes_are_rejected() {
        assert!(matches!(generator(ProblemType::Vrbsp, 0, 10.0).validate(), Err(GenerateError::NoDevices)));
        assert!(matches!(generator(ProblemType::Vrbsp, 2, 0.0).validate(), Err(GenerateError::BadDimension(_))));
        let mut gen = generator(ProblemType::Vrbsp, 2, 10.0);
        gen.spectrums.clear();
        assert!(matches!(gen.validate(), Err(GenerateError::NoSpectrum)));
    }
}
