//! Low-dimensional embedding of a trajectory.
//!
//! An [`Embedding`] holds one coordinate row per trajectory timestep, in
//! temporal order, plus method-specific diagnostics.
//!
//! # Diagnostics by method
//!
//! | Method | Field | Meaning |
//! |--------|-------|---------|
//! | PCA | `explained_variance_ratio` | variance share per axis |
//! | t-SNE | `kl_divergence`, `perplexity` | final objective, perplexity used |
//! | T-PHATE | `stress`, `converged` | SMACOF objective and convergence |
//! | T-PHATE | `edge_count`, `isolated_points` | graph size, points without edges |

use std::fmt;

use nalgebra::DMatrix;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Dimensionality-reduction method that produced an embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EmbeddingMethod {
    /// Linear principal component projection.
    Pca,
    /// t-distributed stochastic neighbour embedding.
    Tsne,
    /// Diffusion-potential embedding.
    Tphate,
}

impl EmbeddingMethod {
    /// All methods, in the order the batch driver runs them.
    pub const ALL: [Self; 3] = [Self::Pca, Self::Tsne, Self::Tphate];

    /// Short lowercase tag, suitable for file names.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Pca => "pca",
            Self::Tsne => "tsne",
            Self::Tphate => "tphate",
        }
    }
}

impl fmt::Display for EmbeddingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pca => "PCA",
            Self::Tsne => "t-SNE",
            Self::Tphate => "T-PHATE",
        })
    }
}

/// Method-specific information about how an embedding was obtained.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EmbeddingDiagnostics {
    /// Variance share of each PCA axis.
    pub explained_variance_ratio: Option<Vec<f64>>,

    /// Final Kullback-Leibler divergence of t-SNE.
    pub kl_divergence: Option<f64>,

    /// Perplexity used by t-SNE.
    pub perplexity: Option<f64>,

    /// Final raw stress of SMACOF.
    pub stress: Option<f64>,

    /// Whether SMACOF met its tolerance.
    pub converged: Option<bool>,

    /// Undirected edges in the sparsified graph.
    pub edge_count: Option<usize>,

    /// Points left without edges by sparsification.
    pub isolated_points: Vec<usize>,
}

/// Low-dimensional coordinates of a trajectory.
#[derive(Debug, Clone)]
pub struct Embedding {
    /// Method that produced the coordinates.
    pub method: EmbeddingMethod,

    /// `T x n_components` coordinates; row `i` is timestep `i`.
    pub coords: DMatrix<f64>,

    /// Method-specific diagnostics.
    pub diagnostics: EmbeddingDiagnostics,
}

impl Embedding {
    /// Create an embedding with empty diagnostics.
    #[must_use]
    pub fn new(method: EmbeddingMethod, coords: DMatrix<f64>) -> Self {
        Self {
            method,
            coords,
            diagnostics: EmbeddingDiagnostics::default(),
        }
    }

    /// Number of embedded timesteps.
    #[must_use]
    pub fn n_points(&self) -> usize {
        self.coords.nrows()
    }

    /// Output dimensionality.
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.coords.ncols()
    }

    /// Coordinates of timestep `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.n_points()`.
    #[must_use]
    pub fn point(&self, i: usize) -> Vec<f64> {
        self.coords.row(i).iter().copied().collect()
    }

    /// Copy out as row vectors, in temporal order.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.n_points()).map(|i| self.point(i)).collect()
    }

    /// Euclidean distance between timesteps `i` and `j` in embedding space.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    #[must_use]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        (self.coords.row(i) - self.coords.row(j)).norm()
    }

    /// Sum of consecutive step lengths.
    #[must_use]
    pub fn path_length(&self) -> f64 {
        (1..self.n_points()).map(|i| self.distance(i - 1, i)).sum()
    }

    /// Distance between the first and last timestep.
    #[must_use]
    pub fn start_end_distance(&self) -> f64 {
        match self.n_points() {
            0 | 1 => 0.0,
            n => self.distance(0, n - 1),
        }
    }

    /// Whether any point was left without graph edges.
    #[must_use]
    pub fn has_isolated_points(&self) -> bool {
        !self.diagnostics.isolated_points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square_walk() -> Embedding {
        let coords = DMatrix::from_row_slice(4, 2, &[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
        Embedding::new(EmbeddingMethod::Tphate, coords)
    }

    #[test]
    fn test_geometry() {
        let emb = square_walk();
        assert_eq!(emb.n_points(), 4);
        assert_eq!(emb.n_components(), 2);
        assert_relative_eq!(emb.path_length(), 3.0);
        assert_relative_eq!(emb.start_end_distance(), 1.0);
        assert_relative_eq!(emb.distance(0, 2), 2.0f64.sqrt());
        assert_eq!(emb.point(2), vec![1.0, 1.0]);
        assert_eq!(emb.to_rows().len(), 4);
    }

    #[test]
    fn test_single_point() {
        let emb = Embedding::new(EmbeddingMethod::Pca, DMatrix::from_row_slice(1, 2, &[3.0, 4.0]));
        assert_eq!(emb.path_length(), 0.0);
        assert_eq!(emb.start_end_distance(), 0.0);
    }

    #[test]
    fn test_method_names() {
        assert_eq!(EmbeddingMethod::Tphate.to_string(), "T-PHATE");
        assert_eq!(EmbeddingMethod::Tsne.to_string(), "t-SNE");
        assert_eq!(EmbeddingMethod::Pca.tag(), "pca");
        assert_eq!(EmbeddingMethod::ALL.len(), 3);
    }

    #[test]
    fn test_isolated_flag() {
        let mut emb = square_walk();
        assert!(!emb.has_isolated_points());
        emb.diagnostics.isolated_points.push(3);
        assert!(emb.has_isolated_points());
    }
}
