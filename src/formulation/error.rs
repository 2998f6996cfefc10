use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning an instance into a model
#[derive(Debug, Error)]
pub enum FormulationError {
    /// No channel could be derived from the spectrums
    #[error("the instance yields no channel")]
    NoChannels,
    /// Sender and receiver coincide, so the received power is unbounded
    #[error("link {0} has its sender on top of its receiver")]
    ZeroDistance(usize),
}

/// Errors raised while reading a solver solution
#[derive(Debug, Error)]
pub enum SolutionError {
    #[error("solution file `{0}` does not exist")]
    MissingFile(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected `name value`, found `{text}`")]
    Malformed { line: usize, text: String },
    #[error("line {line}: the model has no variable `{name}`")]
    UnknownVariable { line: usize, name: String },
}
