//! Numerical building blocks.
//!
//! This module provides:
//! - [`linalg`]: distances, neighbour ordering, normalization, matrix power
//! - [`pca`]: principal component projection
//! - [`mds`]: classical scaling and SMACOF stress minimization

pub mod linalg;
pub mod mds;
pub mod pca;

pub use linalg::{is_symmetric, matrix_power, pairwise_distances, row_normalize, symmetrize};
pub use mds::{classical_mds, smacof, MdsResult};
pub use pca::{compute_pca, PcaProjection};
