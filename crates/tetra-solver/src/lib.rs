//! Solver configuration, statuses and the adapter protocol shared by Tetra backends.
//!
//! A backend implements [`SolverAdapter`]; [`run_adapter`] drives its phases
//! against a compiled [`tetra_core::IntermediateModel`]. [`AdapterSolver`]
//! turns an adapter factory into a [`Solver`], and
//! [`SerialCombinatorialSolver`] chains several solvers.

mod adapter;
mod callback;
mod config;
mod error;
mod monitor;
mod output;
mod serial;
mod status;

pub use adapter::{AdapterSolver, Solver, SolverAdapter, run_adapter};
pub use callback::{CancelRequest, SolvingStatus, StatusCallback, relative_gap};
pub use config::SolverConfig;
pub use error::SolverError;
pub use monitor::{AbortReason, Decision, ImprovementMonitor};
pub use output::SolverOutput;
pub use serial::SerialCombinatorialSolver;
pub use status::SolverStatus;
