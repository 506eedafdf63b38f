//! HiGHS backend for Tetra.
//!
//! [`HighsAdapter`] implements the [`tetra_solver::SolverAdapter`] phases on
//! top of the `highs` crate. Row translation runs on a rayon pool when the
//! `parallel` feature is enabled; native calls stay sequential.

mod adapter;
mod dump;
pub mod ffi;
mod status;

pub use adapter::{HighsAdapter, highs_solver};
pub use ffi::{
    HighsOption, HighsProgress, HighsSession, HighsSessionError, HighsStatus, highs_version,
};
