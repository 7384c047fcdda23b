//! Multidimensional scaling of a precomputed dissimilarity matrix.
//!
//! [`smacof`] minimizes raw stress with Guttman-transform iterations
//! (metric SMACOF). [`classical_mds`] gives the Torgerson solution, used as
//! a deterministic starting point.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{MdsConfig, MdsInit};
use crate::error::{Result, TrajectoryError};
use crate::math::linalg::{normalize_column_signs, pairwise_distances};

/// Distances below this are treated as this value in the Guttman transform.
const MIN_DISTANCE: f64 = 1e-5;

/// Outcome of a stress minimization.
#[derive(Debug, Clone)]
pub struct MdsResult {
    /// Coordinates, one row per input point, in input order.
    pub coords: DMatrix<f64>,
    /// Raw stress: half the sum of squared residuals over all ordered pairs.
    pub stress: f64,
    /// Iterations run by the winning start.
    pub n_iter: usize,
    /// Whether the winning start met the tolerance before `max_iter`.
    pub converged: bool,
}

/// Classical (Torgerson) scaling into `n_components` dimensions.
///
/// # Errors
///
/// Returns an error if the matrix is malformed or has too few points.
pub fn classical_mds(dissimilarities: &DMatrix<f64>, n_components: usize) -> Result<DMatrix<f64>> {
    check_dissimilarities(dissimilarities, n_components)?;
    let n = dissimilarities.nrows();

    let squared = dissimilarities.component_mul(dissimilarities);
    let row_means: Vec<f64> = squared.row_iter().map(|row| row.mean()).collect();
    let grand_mean = squared.mean();

    // Double centering: B = -1/2 J D^2 J
    let b = DMatrix::from_fn(n, n, |i, j| {
        -0.5 * (squared[(i, j)] - row_means[i] - row_means[j] + grand_mean)
    });
    let b = (&b + b.transpose()) * 0.5;

    let eigen = SymmetricEigen::new(b);
    let mut pairs: Vec<(f64, DVector<f64>)> = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .map(|(i, &v)| (v, eigen.eigenvectors.column(i).into_owned()))
        .collect();
    pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut coords = DMatrix::from_fn(n, n_components, |row, col| {
        let (value, vector) = &pairs[col];
        vector[row] * value.max(0.0).sqrt()
    });
    normalize_column_signs(&mut coords);
    Ok(coords)
}

/// Metric SMACOF embedding of `dissimilarities` into `n_components`
/// dimensions.
///
/// With [`MdsInit::Random`], `n_init` starts are drawn uniformly from
/// `[0, 1)` using a ChaCha8 stream seeded with `config.seed`, and the run
/// with the lowest stress is kept (earliest wins on ties).
///
/// # Errors
///
/// - [`TrajectoryError::InsufficientData`] if `T <= n_components`.
/// - [`TrajectoryError::EmbeddingFailure`] for a non-square, asymmetric,
///   negative or non-finite matrix, if the result is not finite, or if the
///   best start did not converge within `max_iter` iterations (unless
///   `config.allow_unconverged` is set).
pub fn smacof(
    dissimilarities: &DMatrix<f64>,
    n_components: usize,
    config: &MdsConfig,
) -> Result<MdsResult> {
    config.validate()?;
    check_dissimilarities(dissimilarities, n_components)?;
    let n = dissimilarities.nrows();

    let best = match config.init {
        MdsInit::Classical => {
            let init = classical_mds(dissimilarities, n_components)?;
            smacof_single(dissimilarities, init, config.max_iter, config.eps)
        }
        MdsInit::Random => {
            let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
            let mut best: Option<MdsResult> = None;
            for run in 0..config.n_init {
                let init = DMatrix::from_fn(n, n_components, |_, _| rng.gen::<f64>());
                let result = smacof_single(dissimilarities, init, config.max_iter, config.eps);
                log::debug!(
                    "smacof start {}: stress {:.6} after {} iterations",
                    run,
                    result.stress,
                    result.n_iter
                );
                let better = best
                    .as_ref()
                    .map_or(true, |current| result.stress < current.stress);
                if better {
                    best = Some(result);
                }
            }
            best.ok_or_else(|| TrajectoryError::embedding_failure("no SMACOF start was run"))?
        }
    };

    if !best.stress.is_finite() || best.coords.iter().any(|v| !v.is_finite()) {
        return Err(TrajectoryError::embedding_failure(format!(
            "SMACOF produced non-finite output (stress {})",
            best.stress
        )));
    }
    if !best.converged {
        if !config.allow_unconverged {
            return Err(TrajectoryError::embedding_failure(format!(
                "SMACOF did not converge within {} iterations (stress {:.6})",
                config.max_iter, best.stress
            )));
        }
        log::warn!(
            "smacof did not converge within {} iterations (stress {:.6})",
            config.max_iter,
            best.stress
        );
    }
    Ok(best)
}

/// One SMACOF run from `init`.
fn smacof_single(dis: &DMatrix<f64>, init: DMatrix<f64>, max_iter: usize, eps: f64) -> MdsResult {
    let n = dis.nrows();
    let mut x = init;
    let mut old_stress: Option<f64> = None;
    let mut stress = f64::INFINITY;
    let mut n_iter = 0;
    let mut converged = false;

    for it in 0..max_iter {
        n_iter = it + 1;
        let d = pairwise_distances(&x);
        stress = (&d - dis).norm_squared() / 2.0;

        // Guttman transform: X <- B(X) X / n
        let ratio = DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                0.0
            } else {
                dis[(i, j)] / d[(i, j)].max(MIN_DISTANCE)
            }
        });
        let row_sums: Vec<f64> = ratio.row_iter().map(|row| row.sum()).collect();
        let b = DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                row_sums[i]
            } else {
                -ratio[(i, j)]
            }
        });
        x = (b * &x) / n as f64;

        let scale: f64 = x.row_iter().map(|row| row.norm()).sum();
        if scale == 0.0 {
            converged = true;
            break;
        }
        let normalized = stress / scale;
        if let Some(old) = old_stress {
            if old - normalized < eps {
                converged = true;
                break;
            }
        }
        old_stress = Some(normalized);
    }

    MdsResult {
        coords: x,
        stress,
        n_iter,
        converged,
    }
}

fn check_dissimilarities(dis: &DMatrix<f64>, n_components: usize) -> Result<()> {
    if !dis.is_square() {
        return Err(TrajectoryError::embedding_failure(format!(
            "dissimilarity matrix must be square, got {}x{}",
            dis.nrows(),
            dis.ncols()
        )));
    }
    if n_components == 0 {
        return Err(TrajectoryError::invalid_config(
            "n_components must be at least 1",
        ));
    }
    let n = dis.nrows();
    if n <= n_components {
        return Err(TrajectoryError::insufficient_data(
            "n_components",
            n_components,
            n,
        ));
    }
    for i in 0..n {
        for j in 0..n {
            let v = dis[(i, j)];
            if !v.is_finite() || v < 0.0 {
                return Err(TrajectoryError::embedding_failure(format!(
                    "invalid dissimilarity {v} at ({i}, {j})"
                )));
            }
            if (v - dis[(j, i)]).abs() > 1e-9 * v.abs().max(1.0) {
                return Err(TrajectoryError::embedding_failure(format!(
                    "dissimilarity matrix is not symmetric at ({i}, {j})"
                )));
            }
        }
    }
    Ok(())
}
