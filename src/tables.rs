//! Physical constants and the IEEE 802.11ac lookup tables shipped with every
//! instance.

/// Number of MCS tiers (table rows).
pub const NB_TIERS: usize = 12;
/// Number of bandwidth classes (table columns).
pub const NB_CLASSES: usize = 4;

/// Channel width in MHz of each table column.
pub const BANDWIDTH_CLASSES: [u32; NB_CLASSES] = [20, 40, 80, 160];

pub const DEFAULT_ALPHA: f64 = 3.0;
pub const DEFAULT_NOISE: f64 = 0.0;
pub const DEFAULT_POWER: f64 = 1000.0;

/// Largest admissible distance between a sender and its receiver: `6·√2`.
pub fn max_link_distance() -> f64 {
    6.0 * std::f64::consts::SQRT_2
}

/// Achievable rate in Mbps, indexed by `[tier][class]`.
pub const DATA_RATES: [[f64; NB_CLASSES]; NB_TIERS] = [
    [8.6, 17.2, 36.0, 72.1],
    [17.2, 34.4, 72.1, 144.1],
    [25.8, 51.6, 108.1, 216.2],
    [34.4, 68.8, 144.1, 288.2],
    [51.6, 103.2, 216.2, 432.4],
    [68.8, 137.6, 288.2, 576.5],
    [77.4, 154.9, 324.3, 648.5],
    [86.0, 172.1, 360.3, 720.6],
    [103.2, 206.5, 432.4, 864.7],
    [114.7, 229.4, 480.4, 960.8],
    [129.0, 258.1, 540.4, 1080.9],
    [143.4, 286.8, 600.5, 1201.0],
];

/// Minimum SINR in dB, indexed by `[tier][class]`.
///
/// Row 8 is not monotone across classes (`25 19 31 34`); it is kept as
/// published.
pub const SINR_DB: [[f64; NB_CLASSES]; NB_TIERS] = [
    [2.0, 5.0, 8.0, 11.0],
    [5.0, 8.0, 11.0, 14.0],
    [7.0, 10.0, 13.0, 16.0],
    [10.0, 13.0, 16.0, 19.0],
    [14.0, 17.0, 20.0, 23.0],
    [18.0, 21.0, 24.0, 27.0],
    [19.0, 22.0, 25.0, 28.0],
    [20.0, 23.0, 26.0, 29.0],
    [25.0, 19.0, 31.0, 34.0],
    [27.0, 30.0, 33.0, 36.0],
    [30.0, 33.0, 36.0, 39.0],
    [32.0, 35.0, 38.0, 41.0],
];

/// Hand-typed demand menu found in an older generator, column-major.
///
/// Entry 31 reads `260.3` where the rate table has `360.3`. This is most
/// likely a typo but it is reproduced verbatim so old instance batches can be
/// regenerated.
pub const LEGACY_DEMANDS: [f64; NB_TIERS * NB_CLASSES] = [
    8.6, 17.2, 25.8, 34.4, 51.6, 68.8, 77.4, 86.0, 103.2, 114.7, 129.0, 143.4,
    17.2, 34.4, 51.6, 68.8, 103.2, 137.6, 154.9, 172.1, 206.5, 229.4, 258.1, 286.8,
    36.0, 72.1, 108.1, 144.1, 216.2, 288.2, 324.3, 260.3, 432.4, 480.4, 540.4, 600.5,
    72.1, 144.1, 216.2, 288.2, 432.4, 576.5, 648.5, 720.6, 864.7, 960.8, 1080.9, 1201.0,
];

/// Every entry of [`DATA_RATES`], row by row.
pub fn flattened_rates() -> Vec<f64> {
    DATA_RATES.iter().flatten().copied().collect()
}

/// Converts a dB value to linear scale. Zero is kept as zero.
pub fn db_to_linear(db: f64) -> f64 {
    if db == 0.0 {
        0.0
    } else {
        10_f64.powf(db / 10.0)
    }
}
