pub mod error;
pub mod registry;
pub mod solver;

pub use error::SolveError;
pub use registry::ExpertRegistry;
pub use solver::{Expert, apply_compute, resolve, run_trace};
