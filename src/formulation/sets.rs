//! Index sets and parameters derived from a parsed instance.

use clap::ValueEnum;

use crate::instance::{ProblemType, VrbspInstance};
use crate::tables::{BANDWIDTH_CLASSES, NB_CLASSES};

/// How the available spectrums are turned into channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChannelPlan {
    /// One channel per spectrum, as wide as the spectrum
    PerSpectrum,
    /// Each spectrum cut greedily into 160/80/40/20 MHz channels
    Split,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// 1-based channel index.
    pub id: usize,
    pub bandwidth: u32,
}

/// A (bandwidth, SINR tier) combination and the rate it yields.
#[derive(Debug, Clone, PartialEq)]
pub struct RateOption {
    /// 1-based table column.
    pub class: usize,
    /// 1-based table row.
    pub tier: usize,
    pub bandwidth: u32,
    pub sinr_db: f64,
    pub rate: f64,
}

/// A schedulable link, written `(i, j)`. Every link pairs the sender and
/// the receiver of device `i`, so `i == j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Link {
    pub i: usize,
    pub j: usize,
}

#[derive(Debug, Clone)]
pub struct Sets {
    /// Devices, `1..=n`.
    pub devices: Vec<usize>,
    pub links: Vec<Link>,
    pub time_slots: Vec<usize>,
    pub channels: Vec<Channel>,
    pub rates: Vec<RateOption>,
    /// Ordered pairs of distinct channel ids.
    pub overlaps: Vec<(usize, usize)>,
    /// Transmit power, indexed like `links`.
    pub power: Vec<f64>,
    /// Sender to receiver distance, indexed like `links`.
    pub distance: Vec<f64>,
    pub alpha: f64,
    pub noise: f64,
}

impl Sets {
    pub fn new(instance: &VrbspInstance, problem_type: ProblemType, plan: ChannelPlan) -> Self {
        let n = instance.nb_links;
        let devices: Vec<usize> = (1..=n).collect();
        let links = devices.iter().map(|&i| Link { i, j: i }).collect();
        let time_slots = (1..=problem_type.time_slots(n)).collect();
        let channels = channels(&instance.spectrums, plan);

        let mut rates = vec![];
        for class in 0..NB_CLASSES {
            for (tier, (rate_row, sinr_row)) in instance.data_rates.iter().zip(&instance.sinr).enumerate() {
                rates.push(RateOption {
                    class: class + 1,
                    tier: tier + 1,
                    bandwidth: BANDWIDTH_CLASSES[class],
                    sinr_db: sinr_row[class],
                    rate: rate_row[class],
                });
            }
        }

        let ids: Vec<usize> = channels.iter().map(|c: &Channel| c.id).collect();
        let overlaps = ids
            .iter()
            .flat_map(|&a| ids.iter().filter(move |&&b| b != a).map(move |&b| (a, b)))
            .collect();

        Sets {
            devices,
            links,
            time_slots,
            channels,
            rates,
            overlaps,
            power: vec![instance.power; n],
            distance: (0..n).map(|i| instance.link_distance(i)).collect(),
            alpha: instance.alpha,
            noise: instance.noise,
        }
    }

    /// Received power `P / d^alpha` of the link at position `l`.
    pub fn signal(&self, l: usize) -> f64 {
        self.power[l] / self.distance[l].powf(self.alpha)
    }
}

fn channels(spectrums: &[u32], plan: ChannelPlan) -> Vec<Channel> {
    let mut channels = vec![];
    for &width in spectrums {
        match plan {
            ChannelPlan::PerSpectrum => channels.push(Channel { id: channels.len() + 1, bandwidth: width }),
            ChannelPlan::Split => {
                for bandwidth in split_spectrum(width) {
                    channels.push(Channel { id: channels.len() + 1, bandwidth });
                }
            }
        }
    }
    channels
}

/// Greedy split, widest channel first. A remainder narrower than 20 MHz is
/// left unused.
fn split_spectrum(width: u32) -> Vec<u32> {
    let widest = BANDWIDTH_CLASSES[NB_CLASSES - 1];
    let narrowest = BANDWIDTH_CLASSES[0];

    let mut left = width;
    let mut parts = vec![];
    while left >= narrowest {
        let mut bw = widest;
        while bw > left {
            bw /= 2;
        }
        parts.push(bw);
        left -= bw;
    }
    parts
}
