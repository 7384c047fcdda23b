//! Principal component analysis.
//!
//! Used both as the PCA baseline embedding and as the optional noise
//! reduction step in front of the affinity kernel. Eigendecomposition is
//! done with nalgebra's symmetric solver on the `D x D` covariance.

use nalgebra::{DMatrix, DVector, SymmetricEigen};

use crate::error::{Result, TrajectoryError};
use crate::math::linalg::normalize_column_signs;

/// Result of a PCA fit and projection.
#[derive(Debug, Clone)]
pub struct PcaProjection {
    /// Projected data, `T x n_components`.
    pub scores: DMatrix<f64>,

    /// Principal axes as columns, `D x n_components`, sorted by
    /// descending eigenvalue.
    pub components: DMatrix<f64>,

    /// Variance along each kept axis.
    pub explained_variance: Vec<f64>,

    /// Fraction of total variance along each kept axis.
    pub explained_variance_ratio: Vec<f64>,

    /// Per-feature mean removed before projection.
    pub mean: DVector<f64>,
}

impl PcaProjection {
    /// Number of kept components.
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.components.ncols()
    }

    /// Project new rows onto the fitted axes.
    ///
    /// # Errors
    ///
    /// Returns an error if the feature width differs from the fitted data.
    pub fn transform(&self, data: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if data.ncols() != self.mean.len() {
            return Err(TrajectoryError::invalid_input(format!(
                "PCA fitted on {} features, got {}",
                self.mean.len(),
                data.ncols()
            )));
        }
        Ok(center(data, &self.mean) * &self.components)
    }
}

/// Fit PCA on the rows of `data` and project onto `n_components` axes.
///
/// Axis signs are normalized so the largest-magnitude loading of each axis
/// is positive.
///
/// # Errors
///
/// Returns an error if there are fewer than two rows or `n_components` is
/// zero or exceeds `min(T, D)`.
pub fn compute_pca(data: &DMatrix<f64>, n_components: usize) -> Result<PcaProjection> {
    let (n, d) = data.shape();
    if n < 2 {
        return Err(TrajectoryError::insufficient_data("pca", 1, n));
    }
    if n_components == 0 || n_components > n.min(d) {
        return Err(TrajectoryError::invalid_input(format!(
            "n_components must be in 1..={} for {}x{} data, got {}",
            n.min(d),
            n,
            d,
            n_components
        )));
    }

    let mean = data.row_mean().transpose();
    let centered = center(data, &mean);
    let cov = (centered.transpose() * &centered) / (n - 1) as f64;

    let eigen = SymmetricEigen::new(cov);

    // Collect eigenvalue-eigenvector pairs and sort descending
    let mut pairs: Vec<(f64, DVector<f64>)> = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .map(|(i, &v)| (v.max(0.0), eigen.eigenvectors.column(i).into_owned()))
        .collect();
    pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let total: f64 = pairs.iter().map(|(v, _)| v).sum();
    let kept = &pairs[..n_components];

    let mut components = DMatrix::from_fn(d, n_components, |row, col| kept[col].1[row]);
    normalize_column_signs(&mut components);

    let explained_variance: Vec<f64> = kept.iter().map(|(v, _)| *v).collect();
    let explained_variance_ratio = explained_variance
        .iter()
        .map(|v| if total > 0.0 { v / total } else { 0.0 })
        .collect();

    let scores = &centered * &components;

    Ok(PcaProjection {
        scores,
        components,
        explained_variance,
        explained_variance_ratio,
        mean,
    })
}

/// Subtract `mean` from every row.
fn center(data: &DMatrix<f64>, mean: &DVector<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(data.nrows(), data.ncols(), |i, j| data[(i, j)] - mean[j])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::linalg::pairwise_distances;
    use approx::assert_relative_eq;

    fn line_with_noise() -> DMatrix<f64> {
        // Points along x with a small y wobble.
        DMatrix::from_fn(10, 3, |i, j| match j {
            0 => i as f64,
            1 => 0.05 * (i as f64 * 1.7).sin(),
            _ => 0.0,
        })
    }

    #[test]
    fn test_pca_major_axis() {
        let pca = compute_pca(&line_with_noise(), 2).unwrap();

        assert_eq!(pca.scores.shape(), (10, 2));
        assert_eq!(pca.components.shape(), (3, 2));
        assert!(pca.explained_variance[0] >= pca.explained_variance[1]);
        assert!(pca.explained_variance_ratio[0] > 0.99);

        // Major axis is x, sign-normalized to point along +x.
        assert_relative_eq!(pca.components[(0, 0)], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_scores_are_centered() {
        let pca = compute_pca(&line_with_noise(), 2).unwrap();
        for col in pca.scores.column_iter() {
            assert_relative_eq!(col.sum(), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_full_rank_projection_preserves_distances() {
        let data = DMatrix::from_fn(6, 4, |i, j| ((i * 7 + j * 3) % 5) as f64 + 0.1 * i as f64);
        let pca = compute_pca(&data, 4).unwrap();

        let before = pairwise_distances(&data);
        let after = pairwise_distances(&pca.scores);
        for (a, b) in before.iter().zip(after.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_transform_matches_scores() {
        let data = line_with_noise();
        let pca = compute_pca(&data, 2).unwrap();
        let projected = pca.transform(&data).unwrap();
        for (a, b) in projected.iter().zip(pca.scores.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
        assert!(pca.transform(&DMatrix::zeros(2, 5)).is_err());
    }

    #[test]
    fn test_invalid_requests() {
        let data = line_with_noise();
        assert!(compute_pca(&data, 0).is_err());
        assert!(compute_pca(&data, 4).is_err());
        assert!(compute_pca(&DMatrix::zeros(1, 3), 1).is_err());
    }
}
