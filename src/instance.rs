//! This module defines an abstract representation of a VRBSP instance and its
//! canonical text layout.
//!
//! ```text
//! n alpha noise power qtd_spectrum spectrum_1 ... spectrum_k
//!
//! n lines: receiver_x receiver_y
//! n lines: sender_x sender_y
//!
//! n lines: gamma_i
//!
//! 12 lines: data rates (4 columns)
//!
//! 12 lines: SINR thresholds in dB (4 columns)
//!
//! ```
//!
//! Readers only look at non-blank lines, at fixed positions. Files produced by
//! older generators carry extra blank lines between the position blocks and
//! still parse.

use std::{
    fmt,
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tables::{NB_CLASSES, NB_TIERS};

#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("instance file `{0}` does not exist")]
    MissingFile(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("unexpected end of file while reading {0}")]
    Truncated(&'static str),
    #[error("line {line}: expected {expected} values, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: cannot read `{token}` as {what}")]
    Value {
        line: usize,
        token: String,
        what: &'static str,
    },
    #[error("the header declares no links")]
    NoLinks,
    #[error("line {0}: unexpected content after the SINR table")]
    Trailing(usize),
}

/// Selects how many time slots the formulation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemType {
    /// A single shared time slot.
    Vrbsp,
    /// One time slot per link.
    MdVrbsp,
}

impl ProblemType {
    pub fn time_slots(self, nb_links: usize) -> usize {
        match self {
            ProblemType::Vrbsp => 1,
            ProblemType::MdVrbsp => nb_links,
        }
    }
}

#[derive(Debug, Error)]
#[error("could not recognize problem type `{0}` (expected VRBSP or MD-VRBSP)")]
pub struct UnknownProblemType(pub String);

impl FromStr for ProblemType {
    type Err = UnknownProblemType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VRBSP" => Ok(ProblemType::Vrbsp),
            "MD-VRBSP" => Ok(ProblemType::MdVrbsp),
            other => Err(UnknownProblemType(other.to_string())),
        }
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemType::Vrbsp => f.write_str("VRBSP"),
            ProblemType::MdVrbsp => f.write_str("MD-VRBSP"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

pub type RateTable = Vec<[f64; NB_CLASSES]>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VrbspInstance {
    pub nb_links: usize,
    pub alpha: f64,
    pub noise: f64,
    pub power: f64,
    /// Width of each available spectrum, in MHz.
    pub spectrums: Vec<u32>,
    pub receivers: Vec<Point>,
    pub senders: Vec<Point>,
    /// Traffic demand of each link, in Mbps.
    pub gamma: Vec<f64>,
    /// `[tier][class]` achievable rate.
    pub data_rates: RateTable,
    /// `[tier][class]` minimum SINR in dB.
    pub sinr: RateTable,
}

impl VrbspInstance {
    /// Distance between the sender and the receiver of link `i` (0-based).
    pub fn link_distance(&self, i: usize) -> f64 {
        self.senders[i].distance(&self.receivers[i])
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, InstanceError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(InstanceError::MissingFile(path.to_path_buf()));
        }
        std::fs::read_to_string(path)?.parse()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), InstanceError> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_to(&mut out)?;
        out.flush()?;
        Ok(())
    }

    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        write!(
            out,
            "{} {:?} {:?} {:?} {}",
            self.nb_links,
            self.alpha,
            self.noise,
            self.power,
            self.spectrums.len()
        )?;
        for s in &self.spectrums {
            write!(out, " {s}")?;
        }
        writeln!(out)?;

        writeln!(out)?;
        for p in self.receivers.iter().chain(self.senders.iter()) {
            writeln!(out, "{:?} {:?}", p.x, p.y)?;
        }

        writeln!(out)?;
        for g in &self.gamma {
            writeln!(out, "{g:?}")?;
        }

        writeln!(out)?;
        for row in &self.data_rates {
            writeln!(out, "{}", join(row.iter().map(|v| format!("{v:?}"))))?;
        }

        writeln!(out)?;
        for row in &self.sinr {
            writeln!(out, "{}", join(row.iter().map(|v| format!("{v:?}"))))?;
        }
        writeln!(out)
    }
}

impl FromStr for VrbspInstance {
    type Err = InstanceError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut lines = Lines::new(text);

        let (line, header) = lines.next("the header")?;
        if header.len() < 5 {
            return Err(InstanceError::FieldCount { line, expected: 5, found: header.len() });
        }
        let nb_links: usize = parse_token(line, header[0], "a link count")?;
        if nb_links == 0 {
            return Err(InstanceError::NoLinks);
        }
        let alpha = parse_token(line, header[1], "a number")?;
        let noise = parse_token(line, header[2], "a number")?;
        let power = parse_token(line, header[3], "a number")?;
        let nb_spectrums: usize = parse_token(line, header[4], "a spectrum count")?;
        if header.len() != 5 + nb_spectrums {
            return Err(InstanceError::FieldCount { line, expected: 5 + nb_spectrums, found: header.len() });
        }
        let spectrums = header[5..]
            .iter()
            .map(|t| parse_bandwidth(line, t))
            .collect::<Result<Vec<_>, _>>()?;

        let receivers = lines.points(nb_links, "the receiver positions")?;
        let senders = lines.points(nb_links, "the sender positions")?;

        let mut gamma = Vec::with_capacity(nb_links);
        for _ in 0..nb_links {
            let [g] = lines.row::<1>("the traffic demands")?;
            gamma.push(g);
        }

        let data_rates = lines.table("the data rate table")?;
        let sinr = lines.table("the SINR table")?;

        if let Some((line, _)) = lines.peek() {
            return Err(InstanceError::Trailing(line));
        }

        Ok(VrbspInstance { nb_links, alpha, noise, power, spectrums, receivers, senders, gamma, data_rates, sinr })
    }
}

fn join(values: impl Iterator<Item = String>) -> String {
    values.collect::<Vec<_>>().join(" ")
}

fn parse_token<T: FromStr>(line: usize, token: &str, what: &'static str) -> Result<T, InstanceError> {
    token.parse().map_err(|_| InstanceError::Value { line, token: token.to_string(), what })
}

/// Spectrum widths are integers, but some writers print them as `160.0`.
fn parse_bandwidth(line: usize, token: &str) -> Result<u32, InstanceError> {
    let value: f64 = parse_token(line, token, "a bandwidth")?;
    if value <= 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(InstanceError::Value { line, token: token.to_string(), what: "a bandwidth" });
    }
    Ok(value as u32)
}

/// Cursor over the non-blank lines of an instance file, keeping 1-based line
/// numbers for error reporting.
struct Lines<'a> {
    inner: std::iter::Peekable<Box<dyn Iterator<Item = (usize, &'a str)> + 'a>>,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        let iter: Box<dyn Iterator<Item = (usize, &'a str)> + 'a> = Box::new(
            text.lines()
                .enumerate()
                .map(|(i, l)| (i + 1, l.trim()))
                .filter(|(_, l)| !l.is_empty()),
        );
        Lines { inner: iter.peekable() }
    }

    fn peek(&mut self) -> Option<(usize, &'a str)> {
        self.inner.peek().copied()
    }

    fn next(&mut self, section: &'static str) -> Result<(usize, Vec<&'a str>), InstanceError> {
        let (line, text) = self.inner.next().ok_or(InstanceError::Truncated(section))?;
        Ok((line, text.split_whitespace().collect()))
    }

    fn row<const N: usize>(&mut self, section: &'static str) -> Result<[f64; N], InstanceError> {
        let (line, tokens) = self.next(section)?;
        if tokens.len() != N {
            return Err(InstanceError::FieldCount { line, expected: N, found: tokens.len() });
        }
        let mut row = [0.0; N];
        for (slot, token) in row.iter_mut().zip(tokens) {
            *slot = parse_token(line, token, "a number")?;
        }
        Ok(row)
    }

    fn points(&mut self, n: usize, section: &'static str) -> Result<Vec<Point>, InstanceError> {
        (0..n)
            .map(|_| self.row::<2>(section).map(|[x, y]| Point { x, y }))
            .collect()
    }

    fn table(&mut self, section: &'static str) -> Result<RateTable, InstanceError> {
        (0..NB_TIERS).map(|_| self.row::<NB_CLASSES>(section)).collect()
    }
}
