//! Population stability module
//!
//! Measures how far a feature's distribution has moved between a reference
//! sample and a current sample with the Population Stability Index, one
//! feature at a time or over a whole table.

mod psi;
mod table;

pub use psi::{
    psi_from_shares, BinBoundaries, PopulationStabilityIndex, PsiBin, PsiConfig, PsiRecord, PsiThresholds,
    StabilityClass, DEFAULT_EPSILON,
};
pub use table::{psi_for_frames, psi_for_matrices, PsiFailure, PsiTable};
