//! Adaptive-bandwidth affinity kernel.
//!
//! Each point `i` gets its own Gaussian width `sigma_i`, the distance to its
//! k-th nearest other point, so the kernel follows local density:
//!
//! ```text
//! K[i][j] = exp(-d(i, j)^2 / (2 * sigma_i^2))    for i != j
//! K[i][i] = 0
//! ```

use nalgebra::DMatrix;

use crate::config::BandwidthPolicy;
use crate::error::{Result, TrajectoryError};
use crate::math::linalg::{nearest_neighbors, pairwise_distances};
use crate::math::pca::compute_pca;

/// Affinity kernel together with the quantities it was built from.
#[derive(Debug, Clone)]
pub struct AffinityKernel {
    /// `T x T` kernel, zero diagonal. Not symmetric in general.
    pub kernel: DMatrix<f64>,
    /// `T x T` Euclidean distances (after the optional PCA step).
    pub distances: DMatrix<f64>,
    /// Per-point bandwidths, after any floor was applied.
    pub bandwidths: Vec<f64>,
    /// The `k` nearest other points of each point, closest first.
    pub neighbors: Vec<Vec<usize>>,
    /// Dimensionality the distances were computed in.
    pub feature_dim: usize,
}

/// Whether the PCA pre-step applies: `n_pca` must be below both `T - 1`
/// and `D`, otherwise it would not reduce anything.
#[must_use]
pub fn pca_step_applies(n_pca: Option<usize>, n_points: usize, n_features: usize) -> bool {
    matches!(n_pca, Some(p) if p < n_features && p < n_points.saturating_sub(1))
}

/// Build the adaptive kernel of `data` (`T x D`) with zero bandwidths
/// treated as errors.
///
/// # Errors
///
/// See [`build_kernel_with_policy`].
pub fn build_kernel(data: &DMatrix<f64>, k: usize, n_pca: Option<usize>) -> Result<AffinityKernel> {
    build_kernel_with_policy(data, k, n_pca, BandwidthPolicy::Fail)
}

/// Build the adaptive kernel of `data` (`T x D`).
///
/// # Errors
///
/// - [`TrajectoryError::InsufficientData`] if `T <= k`.
/// - [`TrajectoryError::DegenerateBandwidth`] if a bandwidth is zero under
///   [`BandwidthPolicy::Fail`].
/// - [`TrajectoryError::InvalidConfig`] if `k` is zero.
pub fn build_kernel_with_policy(
    data: &DMatrix<f64>,
    k: usize,
    n_pca: Option<usize>,
    policy: BandwidthPolicy,
) -> Result<AffinityKernel> {
    let (n, d) = data.shape();
    if k == 0 {
        return Err(TrajectoryError::invalid_config("k must be at least 1"));
    }
    if n <= k {
        return Err(TrajectoryError::insufficient_data("k", k, n));
    }
    if d == 0 {
        return Err(TrajectoryError::invalid_input("trajectory has no features"));
    }

    let reduced;
    let points = if pca_step_applies(n_pca, n, d) {
        let n_pca = n_pca.unwrap_or(d);
        let pca = compute_pca(data, n_pca)?;
        log::debug!(
            "kernel: PCA pre-step {} -> {} features ({:.1}% variance kept)",
            d,
            n_pca,
            100.0 * pca.explained_variance_ratio.iter().sum::<f64>()
        );
        reduced = pca.scores;
        &reduced
    } else {
        data
    };

    let distances = pairwise_distances(points);
    let neighbors = nearest_neighbors(&distances, k);

    let mut bandwidths = Vec::with_capacity(n);
    for (i, nbrs) in neighbors.iter().enumerate() {
        let sigma = distances[(i, nbrs[k - 1])];
        let sigma = if sigma > 0.0 {
            sigma
        } else {
            match policy {
                BandwidthPolicy::Fail => {
                    return Err(TrajectoryError::DegenerateBandwidth { index: i });
                }
                BandwidthPolicy::Floor(floor) => {
                    log::debug!("kernel: point {} has zero bandwidth, using floor {:e}", i, floor);
                    floor
                }
            }
        };
        bandwidths.push(sigma);
    }

    let kernel = DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            0.0
        } else {
            let r = distances[(i, j)] / bandwidths[i];
            (-0.5 * r * r).exp()
        }
    });

    if kernel.iter().any(|v| !v.is_finite()) {
        return Err(TrajectoryError::numerical_instability(
            "affinity kernel contains non-finite values",
        ));
    }

    Ok(AffinityKernel {
        kernel,
        distances,
        bandwidths,
        neighbors,
        feature_dim: points.ncols(),
    })
}
