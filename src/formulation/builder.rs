use std::collections::HashMap;

use clap::{Args, ValueEnum};
use serde::Serialize;
use tracing::debug;

use crate::instance::{ProblemType, VrbspInstance};
use crate::tables::db_to_linear;

use super::error::FormulationError;
use super::linear::{Constraint, LinearExpr, Milp, ObjSense, QuadTerm, Sense};
use super::sets::{ChannelPlan, Link, RateOption, Sets};

/// Bound on the number of active links a device takes part in per time slot.
///
/// Links pair a device with itself, so every active link counts twice for its
/// device: `strict` leaves no room to schedule anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceLimit {
    /// No such constraint
    Omit,
    /// At most 1
    Strict,
    /// At most 2
    Relaxed,
}

impl DeviceLimit {
    fn bound(self) -> Option<f64> {
        match self {
            DeviceLimit::Omit => None,
            DeviceLimit::Strict => Some(1.0),
            DeviceLimit::Relaxed => Some(2.0),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ModelOptions {
    /// How the spectrums are turned into channels
    #[clap(long, value_enum, default_value="per-spectrum")]
    pub channels: ChannelPlan,
    /// Limit on the links a device takes part in during one time slot
    #[clap(long, value_enum, default_value="relaxed")]
    pub device_limit: DeviceLimit,
    /// Require the achieved SINR to reach the threshold of the chosen tier
    #[clap(long)]
    pub sinr_threshold: bool,
}

impl Default for ModelOptions {
    fn default() -> Self {
        ModelOptions { channels: ChannelPlan::PerSpectrum, device_limit: DeviceLimit::Relaxed, sinr_threshold: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSummary {
    pub links: usize,
    pub time_slots: usize,
    pub channels: usize,
    pub rate_options: usize,
    pub binaries: usize,
    pub continuous: usize,
    pub constraints: usize,
}

pub fn x_name(link: Link, t: usize, c: usize) -> String {
    format!("x_{}_{}_{}_{}", link.i, link.j, t, c)
}

pub fn y_name(link: Link, r: &RateOption) -> String {
    format!("y_{}_{}_{}_{}", link.i, link.j, r.class, r.tier)
}

pub fn interference_name(link: Link) -> String {
    format!("interference_{}_{}", link.i, link.j)
}

pub fn sinr_name(link: Link) -> String {
    format!("sinr_{}_{}", link.i, link.j)
}

pub fn interfered_name(link: Link) -> String {
    format!("interfered_{}_{}", link.i, link.j)
}

/// The MILP built for one instance, with the sets it was built from.
pub struct Formulation {
    pub sets: Sets,
    pub milp: Milp,
    /// cache: (x, x') -> AND var
    products: HashMap<(String, String), String>,
}

impl Formulation {
    pub fn build(instance: &VrbspInstance, problem_type: ProblemType, options: &ModelOptions) -> Result<Self, FormulationError> {
        let sets = Sets::new(instance, problem_type, options.channels);
        if sets.channels.is_empty() {
            return Err(FormulationError::NoChannels);
        }
        if let Some(l) = sets.distance.iter().position(|&d| d == 0.0) {
            return Err(FormulationError::ZeroDistance(l + 1));
        }

        let mut f = Formulation { sets, milp: Milp::new(ObjSense::Maximize), products: HashMap::new() };
        f.declare_variables();
        f.set_objective();
        f.single_assignment();
        f.single_speed();
        f.interference();
        f.sinr();
        f.rate_feasibility();
        if let Some(bound) = options.device_limit.bound() {
            f.device_limit(bound);
        }
        if options.sinr_threshold {
            f.sinr_threshold();
        }
        f.milp.normalize();

        debug!(?options, "model built: {:?}", f.summary());
        Ok(f)
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            links: self.sets.links.len(),
            time_slots: self.sets.time_slots.len(),
            channels: self.sets.channels.len(),
            rate_options: self.sets.rates.len(),
            binaries: self.milp.binaries.len(),
            continuous: self.milp.continuous.len(),
            constraints: self.milp.constraints.len(),
        }
    }

    /// Every `x` variable of `link`, with its slot and channel.
    fn assignments(&self, link: Link) -> Vec<(usize, usize, String)> {
        let mut xs = vec![];
        for &t in &self.sets.time_slots {
            for c in &self.sets.channels {
                xs.push((t, c.id, x_name(link, t, c.id)));
            }
        }
        xs
    }

    fn declare_variables(&mut self) {
        for &link in &self.sets.links {
            for (_, _, x) in self.assignments(link) {
                self.milp.binaries.insert(x);
            }
            for r in &self.sets.rates {
                self.milp.binaries.insert(y_name(link, r));
            }
            self.milp.continuous.insert(interference_name(link));
            self.milp.continuous.insert(sinr_name(link));
        }
    }

    fn set_objective(&mut self) {
        let slots = self.sets.time_slots.len() as f64;
        let mut obj = LinearExpr::zero();
        for &link in &self.sets.links {
            for r in &self.sets.rates {
                obj.add_term(&y_name(link, r), r.rate / slots);
            }
        }
        self.milp.objective = obj;
    }

    fn single_assignment(&mut self) {
        for link in self.sets.links.clone() {
            let mut expr = LinearExpr::zero();
            for (_, _, x) in self.assignments(link) {
                expr.add_term(&x, 1.0);
            }
            self.push(format!("one_time_channel_{}_{}", link.i, link.j), expr, Sense::Eq, 1.0);
        }
    }

    fn single_speed(&mut self) {
        for link in self.sets.links.clone() {
            let mut expr = LinearExpr::zero();
            for r in &self.sets.rates {
                expr.add_term(&y_name(link, r), 1.0);
            }
            self.push(format!("one_speed_{}_{}", link.i, link.j), expr, Sense::Eq, 1.0);
        }
    }

    fn interference(&mut self) {
        let links = self.sets.links.clone();
        let overlaps = self.sets.overlaps.clone();
        let slots = self.sets.time_slots.clone();

        for &link in &links {
            let mut expr = LinearExpr::from_var(&interference_name(link), 1.0);
            let mut products = vec![];
            for (l2, &other) in links.iter().enumerate() {
                if other == link {
                    continue;
                }
                let coef = self.sets.signal(l2);
                for &t in &slots {
                    for &(c, c2) in &overlaps {
                        let w = self.and(x_name(link, t, c), x_name(other, t, c2));
                        expr.add_term(&w, -coef);
                        products.push(w);
                    }
                }
            }
            self.push(format!("interference_def_{}_{}", link.i, link.j), expr, Sense::Eq, 0.0);
            if self.noiseless() {
                self.interfered(link, &products);
            }
        }
    }

    fn noiseless(&self) -> bool {
        self.sets.noise == 0.0
    }

    /// Binary `interfered = OR(products)`: set exactly when some other link
    /// transmits on an overlapping channel of the same slot.
    fn interfered(&mut self, link: Link, products: &[String]) {
        let flag = interfered_name(link);
        self.milp.binaries.insert(flag.clone());

        let mut any = LinearExpr::from_var(&flag, 1.0);
        for w in products {
            any.add_term(w, -1.0);
            let by = LinearExpr::from_var(w, 1.0).sub(LinearExpr::from_var(&flag, 1.0));
            self.push(format!("interfered_by_{}_{}_{}", w, link.i, link.j), by, Sense::Le, 0.0);
        }
        self.push(format!("interfered_def_{}_{}", link.i, link.j), any, Sense::Le, 0.0);
    }

    /// `sinr · (interference + N) = P / d^alpha`
    ///
    /// Without noise a link nobody interferes with has an unbounded SINR, so
    /// the right-hand side is switched on by `interfered` instead:
    /// `sinr · interference = P / d^alpha · interfered`, leaving `sinr` free
    /// when the link is alone on its channel.
    fn sinr(&mut self) {
        for (l, link) in self.sets.links.clone().into_iter().enumerate() {
            let sinr = sinr_name(link);
            let signal = self.sets.signal(l);
            let (expr, rhs) = if self.noiseless() {
                (LinearExpr::from_var(&interfered_name(link), -signal), 0.0)
            } else {
                (LinearExpr::from_var(&sinr, self.sets.noise), signal)
            };
            let constraint = Constraint {
                name: format!("sinr_def_{}_{}", link.i, link.j),
                expr,
                quad: vec![QuadTerm { coef: 1.0, left: sinr, right: interference_name(link) }],
                sense: Sense::Eq,
                rhs,
            };
            self.milp.constraints.push(constraint);
        }
    }

    fn rate_feasibility(&mut self) {
        for link in self.sets.links.clone() {
            for r in self.sets.rates.clone() {
                let mut expr = LinearExpr::from_var(&y_name(link, &r), 1.0);
                for &t in &self.sets.time_slots {
                    for c in self.sets.channels.iter().filter(|c| c.bandwidth == r.bandwidth) {
                        expr.add_term(&x_name(link, t, c.id), -1.0);
                    }
                }
                self.push(format!("speed_bandwidth_{}_{}_{}_{}", link.i, link.j, r.class, r.tier), expr, Sense::Le, 0.0);
            }
        }
    }

    fn device_limit(&mut self, bound: f64) {
        for v in self.sets.devices.clone() {
            for t in self.sets.time_slots.clone() {
                let mut expr = LinearExpr::zero();
                for &link in self.sets.links.iter().filter(|l| l.i == v) {
                    for c in &self.sets.channels {
                        expr.add_term(&x_name(link, t, c.id), 1.0);
                    }
                }
                for &link in self.sets.links.iter().filter(|l| l.j == v) {
                    for c in &self.sets.channels {
                        expr.add_term(&x_name(link, t, c.id), 1.0);
                    }
                }
                self.push(format!("one_link_per_device_{}_time_{}", v, t), expr, Sense::Le, bound);
            }
        }
    }

    /// `sinr >= Σ 10^(s/10) · y`
    fn sinr_threshold(&mut self) {
        for link in self.sets.links.clone() {
            let mut expr = LinearExpr::from_var(&sinr_name(link), 1.0);
            for r in &self.sets.rates {
                expr.add_term(&y_name(link, r), -db_to_linear(r.sinr_db));
            }
            self.push(format!("sinr_threshold_{}_{}", link.i, link.j), expr, Sense::Ge, 0.0);
        }
    }

    /// Binary `w = a AND b`, shared by both orders of the pair.
    fn and(&mut self, a: String, b: String) -> String {
        let key = if a <= b { (a, b) } else { (b, a) };
        if let Some(w) = self.products.get(&key) {
            return w.clone();
        }

        let w = format!("w_{}", self.products.len() + 1);
        self.milp.binaries.insert(w.clone());
        let (a, b) = &key;

        // w <= a
        self.push(format!("and_le1_{}", w), LinearExpr::from_var(&w, 1.0).sub(LinearExpr::from_var(a, 1.0)), Sense::Le, 0.0);
        // w <= b
        self.push(format!("and_le2_{}", w), LinearExpr::from_var(&w, 1.0).sub(LinearExpr::from_var(b, 1.0)), Sense::Le, 0.0);
        // w >= a + b - 1  <=>  a + b - w <= 1
        let mut expr = LinearExpr::from_var(a, 1.0);
        expr.add_term(b, 1.0);
        expr.add_term(&w, -1.0);
        self.push(format!("and_ge_{}", w), expr, Sense::Le, 1.0);

        self.products.insert(key, w.clone());
        w
    }

    fn push(&mut self, name: String, expr: LinearExpr, sense: Sense, rhs: f64) {
        self.milp.constraints.push(Constraint::linear(name, expr, sense, rhs));
    }
}
