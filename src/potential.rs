//! Potential distances and their low-dimensional embedding.
//!
//! Diffusion probabilities are turned into dissimilarities with
//! `U = -ln(P_t + epsilon)`. `P_t` is not symmetric even for a symmetric
//! graph (rows are normalized by different sums), so `U` is averaged with
//! its transpose before being placed with SMACOF.

use nalgebra::DMatrix;

use crate::config::MdsConfig;
use crate::error::{Result, TrajectoryError};
use crate::math::linalg::symmetrize;
use crate::math::mds::{smacof, MdsResult};

/// Default additive floor inside the logarithm.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Symmetrized potential matrix `((-ln(P + eps)) + (-ln(P + eps))^T) / 2`.
///
/// # Errors
///
/// Returns an error if `diffused` is not square, `epsilon` is not positive,
/// or an entry of the result is not finite.
pub fn potential_matrix(diffused: &DMatrix<f64>, epsilon: f64) -> Result<DMatrix<f64>> {
    if !diffused.is_square() {
        return Err(TrajectoryError::invalid_input(format!(
            "diffusion matrix must be square, got {}x{}",
            diffused.nrows(),
            diffused.ncols()
        )));
    }
    if !(epsilon > 0.0) {
        return Err(TrajectoryError::invalid_config("epsilon must be positive"));
    }

    let raw = diffused.map(|p| -(p + epsilon).ln());
    let potential = symmetrize(&raw);

    if let Some((idx, v)) = potential.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        let n = potential.nrows();
        return Err(TrajectoryError::embedding_failure(format!(
            "potential {} at ({}, {}) is not finite",
            v,
            idx % n,
            idx / n
        )));
    }
    Ok(potential)
}

/// Convert a potential matrix into a dissimilarity matrix for MDS.
///
/// The diagonal is set to zero. Off-diagonal values may dip below zero by
/// at most `-ln(1 + epsilon)` (a transition probability of one); those are
/// clamped to zero. Anything more negative means the diffusion matrix was
/// not stochastic and is reported as an embedding failure.
///
/// # Errors
///
/// Returns [`TrajectoryError::EmbeddingFailure`] for clearly negative entries.
pub fn to_dissimilarity(potential: &DMatrix<f64>, epsilon: f64) -> Result<DMatrix<f64>> {
    let tolerance = (1.0 + epsilon).ln() + 1e-9;
    let n = potential.nrows();
    for i in 0..n {
        for j in 0..n {
            if i != j && potential[(i, j)] < -tolerance {
                return Err(TrajectoryError::embedding_failure(format!(
                    "negative potential {} at ({}, {})",
                    potential[(i, j)],
                    i,
                    j
                )));
            }
        }
    }
    Ok(DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            0.0
        } else {
            potential[(i, j)].max(0.0)
        }
    }))
}

/// Embed a diffused transition matrix into `n_components` dimensions.
///
/// Row `i` of the result corresponds to row `i` of `transition_t`, so the
/// temporal order of the trajectory is preserved.
///
/// # Errors
///
/// - [`TrajectoryError::InsufficientData`] if `T <= n_components`, checked
///   before any computation.
/// - [`TrajectoryError::EmbeddingFailure`] for malformed potentials or a
///   failed MDS.
pub fn embed_from_diffusion(
    transition_t: &DMatrix<f64>,
    n_components: usize,
    epsilon: f64,
    mds: &MdsConfig,
) -> Result<MdsResult> {
    let n = transition_t.nrows();
    if n_components == 0 {
        return Err(TrajectoryError::invalid_config(
            "n_components must be at least 1",
        ));
    }
    if n <= n_components {
        return Err(TrajectoryError::insufficient_data(
            "n_components",
            n_components,
            n,
        ));
    }

    let potential = potential_matrix(transition_t, epsilon)?;
    let dissimilarity = to_dissimilarity(&potential, epsilon)?;
    smacof(&dissimilarity, n_components, mds)
}
