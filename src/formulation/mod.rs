//! The MILP model of a VRBSP instance: sets, constraint construction, LP
//! output, conflict detection and solution checking.

mod build;
mod builder;
mod decode;
mod error;
mod linear;
mod presolve;
mod sets;
mod solution;

pub use build::BuildModel;
pub use decode::Decode;
