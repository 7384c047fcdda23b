//! Exact t-SNE, used as a non-linear baseline next to the diffusion
//! embedding.
//!
//! The implementation follows the standard formulation: Gaussian
//! conditionals calibrated to a target perplexity, symmetrized joint
//! probabilities, a Student-t kernel in the output space and gradient
//! descent with momentum, per-parameter gains and early exaggeration.
//! Trajectories here have at most a few hundred points, so all pairwise
//! terms are computed exactly.

use nalgebra::DMatrix;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::config::TsneConfig;
use crate::error::{Result, TrajectoryError};

/// Floor for probabilities and normalizers.
const MACHINE_EPSILON: f64 = 1e-12;

/// Entropy tolerance of the perplexity bisection.
const PERPLEXITY_TOL: f64 = 1e-5;

/// Bisection steps per row.
const PERPLEXITY_STEPS: usize = 100;

/// Standard deviation of the initial coordinates.
const INIT_STD: f64 = 1e-2;

/// Smallest per-parameter gain.
const MIN_GAIN: f64 = 0.01;

/// Outcome of a t-SNE run.
#[derive(Debug, Clone)]
pub struct TsneResult {
    /// `T x n_components` coordinates in input order.
    pub coords: DMatrix<f64>,
    /// KL divergence between P and Q at the end of optimization.
    pub kl_divergence: f64,
    /// Perplexity the conditionals were calibrated to.
    pub perplexity: f64,
}

/// Run t-SNE on the rows of `data`.
///
/// # Errors
///
/// - [`TrajectoryError::InsufficientData`] if `T <= n_components` or the
///   perplexity is not below `T`.
/// - [`TrajectoryError::NumericalInstability`] if the optimization diverges.
pub fn tsne(data: &DMatrix<f64>, config: &TsneConfig) -> Result<TsneResult> {
    config.validate()?;
    let n = data.nrows();
    let n_components = config.n_components;
    if n <= n_components {
        return Err(TrajectoryError::insufficient_data(
            "n_components",
            n_components,
            n,
        ));
    }
    let perplexity = config.perplexity_for(n);
    if perplexity >= n as f64 {
        return Err(TrajectoryError::insufficient_data(
            "perplexity",
            perplexity.ceil() as usize,
            n,
        ));
    }

    let sq = squared_distances(data);
    let conditional = conditional_probabilities(&sq, perplexity);
    let joint = joint_probabilities(&conditional);

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut y = DMatrix::from_fn(n, n_components, |_, _| {
        let z: f64 = StandardNormal.sample(&mut rng);
        z * INIT_STD
    });

    let learning_rate = config.learning_rate_for(n);
    let mut update = DMatrix::<f64>::zeros(n, n_components);
    let mut gains = DMatrix::<f64>::from_element(n, n_components, 1.0);

    for it in 0..config.max_iter {
        let early = it < config.exaggeration_iter;
        let exaggeration = if early { config.early_exaggeration } else { 1.0 };
        let momentum = if early { 0.5 } else { 0.8 };

        let grad = gradient(&joint, &y, exaggeration);

        for idx in 0..grad.len() {
            if update[idx] * grad[idx] < 0.0 {
                gains[idx] += 0.2;
            } else {
                gains[idx] *= 0.8;
            }
            gains[idx] = gains[idx].max(MIN_GAIN);
            update[idx] = momentum * update[idx] - learning_rate * gains[idx] * grad[idx];
        }
        y += &update;

        if y.iter().any(|v| !v.is_finite()) {
            return Err(TrajectoryError::numerical_instability(format!(
                "t-SNE diverged at iteration {it}"
            )));
        }
    }

    let kl_divergence = kl_divergence(&joint, &y);
    log::debug!(
        "tsne: {} points, perplexity {}, KL {:.6}",
        n,
        perplexity,
        kl_divergence
    );

    Ok(TsneResult {
        coords: y,
        kl_divergence,
        perplexity,
    })
}

fn squared_distances(points: &DMatrix<f64>) -> DMatrix<f64> {
    let n = points.nrows();
    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            0.0
        } else {
            (points.row(i) - points.row(j)).norm_squared()
        }
    })
}

/// Row-conditional probabilities `P(j | i)` whose entropy (natural log)
/// matches `ln(perplexity)`, found by bisection on the precision `beta`.
fn conditional_probabilities(sq: &DMatrix<f64>, perplexity: f64) -> DMatrix<f64> {
    let n = sq.nrows();
    let target = perplexity.ln();
    let mut p = DMatrix::<f64>::zeros(n, n);

    for i in 0..n {
        let mut beta = 1.0;
        let mut beta_min = f64::NEG_INFINITY;
        let mut beta_max = f64::INFINITY;
        let mut row = vec![0.0; n];

        for _ in 0..PERPLEXITY_STEPS {
            let mut sum = 0.0;
            for j in 0..n {
                row[j] = if i == j { 0.0 } else { (-sq[(i, j)] * beta).exp() };
                sum += row[j];
            }
            if sum == 0.0 {
                sum = 1e-8;
            }
            let weighted: f64 = (0..n).map(|j| sq[(i, j)] * row[j]).sum();
            let entropy = sum.ln() + beta * weighted / sum;
            for v in &mut row {
                *v /= sum;
            }

            let diff = entropy - target;
            if diff.abs() <= PERPLEXITY_TOL {
                break;
            }
            if diff > 0.0 {
                beta_min = beta;
                beta = if beta_max.is_infinite() {
                    beta * 2.0
                } else {
                    (beta + beta_max) / 2.0
                };
            } else {
                beta_max = beta;
                beta = if beta_min.is_infinite() {
                    beta / 2.0
                } else {
                    (beta + beta_min) / 2.0
                };
            }
        }

        for j in 0..n {
            p[(i, j)] = row[j];
        }
    }
    p
}

/// `(P + P^T) / sum`, floored at machine epsilon off the diagonal.
fn joint_probabilities(conditional: &DMatrix<f64>) -> DMatrix<f64> {
    let sym = conditional + conditional.transpose();
    let total = sym.sum().max(MACHINE_EPSILON);
    let n = sym.nrows();
    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            0.0
        } else {
            (sym[(i, j)] / total).max(MACHINE_EPSILON)
        }
    })
}

/// Student-t affinities `1 / (1 + |y_i - y_j|^2)` with a zero diagonal.
fn student_t(y: &DMatrix<f64>) -> DMatrix<f64> {
    let n = y.nrows();
    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            0.0
        } else {
            1.0 / (1.0 + (y.row(i) - y.row(j)).norm_squared())
        }
    })
}

fn gradient(p: &DMatrix<f64>, y: &DMatrix<f64>, exaggeration: f64) -> DMatrix<f64> {
    let (n, c) = y.shape();
    let num = student_t(y);
    let sum_num = num.sum().max(MACHINE_EPSILON);

    let mut grad = DMatrix::<f64>::zeros(n, c);
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let q = num[(i, j)] / sum_num;
            let mult = 4.0 * (exaggeration * p[(i, j)] - q) * num[(i, j)];
            for d in 0..c {
                grad[(i, d)] += mult * (y[(i, d)] - y[(j, d)]);
            }
        }
    }
    grad
}

fn kl_divergence(p: &DMatrix<f64>, y: &DMatrix<f64>) -> f64 {
    let num = student_t(y);
    let sum_num = num.sum().max(MACHINE_EPSILON);
    let n = p.nrows();
    let mut kl = 0.0;
    for i in 0..n {
        for j in 0..n {
            if i != j {
                let q = (num[(i, j)] / sum_num).max(MACHINE_EPSILON);
                kl += p[(i, j)] * (p[(i, j)] / q).ln();
            }
        }
    }
    kl
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Two well separated groups of eight points.
    fn two_blobs() -> DMatrix<f64> {
        DMatrix::from_fn(16, 3, |i, j| {
            let offset = if i < 8 { 0.0 } else { 20.0 };
            offset + ((i * 3 + j * 5) % 7) as f64 * 0.1
        })
    }

    #[test]
    fn test_conditional_perplexity() {
        let data = two_blobs();
        let sq = squared_distances(&data);
        let p = conditional_probabilities(&sq, 5.0);

        for i in 0..16 {
            let row: Vec<f64> = (0..16).map(|j| p[(i, j)]).collect();
            assert_relative_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
            assert_eq!(row[i], 0.0);
            let entropy: f64 = -row
                .iter()
                .filter(|&&v| v > 0.0)
                .map(|v| v * v.ln())
                .sum::<f64>();
            assert_relative_eq!(entropy.exp(), 5.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_joint_is_symmetric_and_normalized() {
        let data = two_blobs();
        let joint = joint_probabilities(&conditional_probabilities(&squared_distances(&data), 5.0));
        assert_relative_eq!(joint.sum(), 1.0, epsilon = 1e-6);
        for i in 0..16 {
            for j in 0..16 {
                assert_relative_eq!(joint[(i, j)], joint[(j, i)], epsilon = 1e-15);
            }
        }
    }

    #[test]
    fn test_tsne_separates_blobs() {
        let result = tsne(&two_blobs(), &TsneConfig::default()).unwrap();
        assert_eq!(result.coords.shape(), (16, 2));
        assert_eq!(result.perplexity, 5.0);
        assert!(result.kl_divergence.is_finite());

        let centroid = |range: std::ops::Range<usize>| {
            let len = range.len() as f64;
            let mut c = [0.0; 2];
            for i in range {
                c[0] += result.coords[(i, 0)] / len;
                c[1] += result.coords[(i, 1)] / len;
            }
            c
        };
        let a = centroid(0..8);
        let b = centroid(8..16);
        let between = ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt();

        let spread = (0..8)
            .map(|i| {
                let dx = result.coords[(i, 0)] - a[0];
                let dy = result.coords[(i, 1)] - a[1];
                (dx * dx + dy * dy).sqrt()
            })
            .fold(0.0, f64::max);
        assert!(between > spread, "between {between} vs spread {spread}");
    }

    #[test]
    fn test_tsne_is_deterministic() {
        let config = TsneConfig::default().with_max_iter(300);
        let a = tsne(&two_blobs(), &config).unwrap();
        let b = tsne(&two_blobs(), &config).unwrap();
        assert_eq!(a.coords, b.coords);
    }

    #[test]
    fn test_perplexity_must_be_below_sample_count() {
        let data = DMatrix::from_fn(5, 2, |i, j| (i + j) as f64);
        let err = tsne(&data, &TsneConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            TrajectoryError::InsufficientData {
                parameter: "perplexity",
                ..
            }
        ));

        let ok = tsne(&data, &TsneConfig::default().with_perplexity(2.0).with_max_iter(300));
        assert!(ok.is_ok());
    }
}
