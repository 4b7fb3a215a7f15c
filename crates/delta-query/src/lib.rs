//! Query construction for δ-robustness verification.
//!
//! Turns a network handle, a base input, a perturbation radius δ and a set
//! of pairwise output assertions into a fully bounded [`Query`]:
//! - [`QueryBuilder`]: single-query construction with validation
//! - [`DeltaSweep`]: one independent query per δ, serial or rayon-parallel
//! - [`vnnlib`]: VNN-LIB rendering for solvers that read property files

pub mod builder;
pub mod sweep;
pub mod vnnlib;

pub use builder::{validate_delta, validate_large, QueryBuilder};
pub use sweep::DeltaSweep;

pub use delta_core::{
    Bound, DeltaError, LinearAssertion, NetworkDescriptor, NetworkHandle, Query, QueryDiagnostic,
    Result,
};
