//! Dense matrix helpers for the diffusion pipeline.
//!
//! Every function returns a new matrix; inputs are never edited in place.

use nalgebra::DMatrix;

use crate::error::{Result, TrajectoryError};

/// Full Euclidean distance matrix between the rows of `points`.
///
/// The result is exactly symmetric with a zero diagonal. Norms are scaled
/// before squaring, so coordinates far outside `1e-150..1e150` neither
/// underflow to zero nor overflow to infinity.
#[must_use]
pub fn pairwise_distances(points: &DMatrix<f64>) -> DMatrix<f64> {
    let n = points.nrows();
    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            0.0
        } else {
            (points.row(i) - points.row(j)).stable_norm()
        }
    })
}

/// Indices of all other points ordered by increasing distance from `i`.
///
/// Equal distances are ordered by index, so the neighbour order (and
/// therefore the bandwidth and graph) is deterministic under ties.
#[must_use]
pub fn neighbor_order(distances: &DMatrix<f64>, i: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..distances.ncols()).filter(|&j| j != i).collect();
    order.sort_by(|&a, &b| {
        distances[(i, a)]
            .total_cmp(&distances[(i, b)])
            .then(a.cmp(&b))
    });
    order
}

/// The `k` nearest non-self neighbours of every point.
#[must_use]
pub fn nearest_neighbors(distances: &DMatrix<f64>, k: usize) -> Vec<Vec<usize>> {
    (0..distances.nrows())
        .map(|i| {
            let mut order = neighbor_order(distances, i);
            order.truncate(k);
            order
        })
        .collect()
}

/// `(m + m^T) / 2`.
#[must_use]
pub fn symmetrize(m: &DMatrix<f64>) -> DMatrix<f64> {
    (m + m.transpose()) * 0.5
}

/// Whether `m` is square and equal to its transpose within `tol`.
#[must_use]
pub fn is_symmetric(m: &DMatrix<f64>, tol: f64) -> bool {
    if !m.is_square() {
        return false;
    }
    let n = m.nrows();
    (0..n).all(|i| (i + 1..n).all(|j| (m[(i, j)] - m[(j, i)]).abs() <= tol))
}

/// Divide every row by its sum.
///
/// Rows whose sum is exactly zero are divided by one instead and stay
/// all-zero; their indices are returned alongside the normalized matrix.
#[must_use]
pub fn row_normalize(m: &DMatrix<f64>) -> (DMatrix<f64>, Vec<usize>) {
    let sums: Vec<f64> = m.row_iter().map(|row| row.sum()).collect();
    let zero_rows: Vec<usize> = sums
        .iter()
        .enumerate()
        .filter(|(_, &s)| s == 0.0)
        .map(|(i, _)| i)
        .collect();

    let normalized = DMatrix::from_fn(m.nrows(), m.ncols(), |i, j| {
        let s = if sums[i] == 0.0 { 1.0 } else { sums[i] };
        m[(i, j)] / s
    });
    (normalized, zero_rows)
}

/// Integer matrix power `m^t` for `t >= 1`, by repeated squaring.
///
/// # Errors
///
/// Returns an error if `m` is not square or `t` is zero.
pub fn matrix_power(m: &DMatrix<f64>, t: usize) -> Result<DMatrix<f64>> {
    if !m.is_square() {
        return Err(TrajectoryError::invalid_input(format!(
            "matrix power needs a square matrix, got {}x{}",
            m.nrows(),
            m.ncols()
        )));
    }
    if t == 0 {
        return Err(TrajectoryError::invalid_config("t must be at least 1"));
    }

    let mut result: Option<DMatrix<f64>> = None;
    let mut base = m.clone();
    let mut exp = t;
    loop {
        if exp & 1 == 1 {
            result = Some(match result {
                Some(acc) => acc * &base,
                None => base.clone(),
            });
        }
        exp >>= 1;
        if exp == 0 {
            break;
        }
        base = &base * &base;
    }
    // exp >= 1 guarantees at least one set bit.
    result.ok_or_else(|| TrajectoryError::numerical_instability("empty matrix power"))
}

/// Population variance of the strict upper triangle of a square matrix.
#[must_use]
pub fn upper_triangle_variance(m: &DMatrix<f64>) -> f64 {
    let n = m.nrows().min(m.ncols());
    let values: Vec<f64> = (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .map(|(i, j)| m[(i, j)])
        .collect();
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

/// Flip each column so that its largest-magnitude entry is positive.
///
/// Eigenvector signs are arbitrary; fixing them makes projections
/// reproducible across platforms.
pub fn normalize_column_signs(m: &mut DMatrix<f64>) {
    for mut column in m.column_iter_mut() {
        let pivot = column
            .iter()
            .copied()
            .max_by(|a, b| a.abs().total_cmp(&b.abs()))
            .unwrap_or(0.0);
        if pivot < 0.0 {
            column.neg_mut();
        }
    }
}
