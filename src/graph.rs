//! k-nearest-neighbour sparsification of the affinity kernel.
//!
//! Row `i` keeps only the kernel values of its `k` nearest other points (by
//! raw distance, ties by index); everything else, the diagonal included, is
//! zero. The masked matrix `M` is then symmetrized as `(M + M^T) / 2`.
//!
//! An edge therefore survives when *either* endpoint lists the other. A
//! one-sided edge keeps half its weight, and a point listed by many others
//! can end up with more than `k` edges.

use nalgebra::DMatrix;

use crate::error::{Result, TrajectoryError};
use crate::math::linalg::{nearest_neighbors, symmetrize};

/// Sparsify `kernel` to each row's `k` nearest neighbours under
/// `distances`, then symmetrize.
///
/// # Errors
///
/// Returns an error if the matrices are not square of the same size, or
/// if `k` is zero or not below the number of points.
pub fn sparsify(kernel: &DMatrix<f64>, distances: &DMatrix<f64>, k: usize) -> Result<DMatrix<f64>> {
    if !kernel.is_square() || kernel.shape() != distances.shape() {
        return Err(TrajectoryError::invalid_input(format!(
            "kernel {:?} and distances {:?} must be square and equal in shape",
            kernel.shape(),
            distances.shape()
        )));
    }
    let n = kernel.nrows();
    if k == 0 {
        return Err(TrajectoryError::invalid_config("k must be at least 1"));
    }
    if n <= k {
        return Err(TrajectoryError::insufficient_data("k", k, n));
    }

    let mut keep = DMatrix::from_element(n, n, false);
    for (i, nbrs) in nearest_neighbors(distances, k).iter().enumerate() {
        for &j in nbrs {
            keep[(i, j)] = true;
        }
    }

    let masked = DMatrix::from_fn(n, n, |i, j| if keep[(i, j)] { kernel[(i, j)] } else { 0.0 });
    let graph = symmetrize(&masked);

    log::debug!("graph: {} points, {} edges (k = {})", n, edge_count(&graph), k);
    Ok(graph)
}

/// Number of undirected edges with positive weight.
#[must_use]
pub fn edge_count(graph: &DMatrix<f64>) -> usize {
    let n = graph.nrows().min(graph.ncols());
    (0..n)
        .map(|i| (i + 1..n).filter(|&j| graph[(i, j)] > 0.0).count())
        .sum()
}

/// Number of positive-weight edges incident to each point.
#[must_use]
pub fn degrees(graph: &DMatrix<f64>) -> Vec<usize> {
    graph
        .row_iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .enumerate()
                .filter(|&(j, &w)| j != i && w > 0.0)
                .count()
        })
        .collect()
}
