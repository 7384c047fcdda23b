//! Markov diffusion over the sparsified graph.
//!
//! The graph is row-normalized into a transition matrix and raised to the
//! diffusion time `t`. A row that sums to zero (a point left without edges
//! by sparsification) cannot be normalized; it stays all-zero, which later
//! puts that point at maximal potential distance from everything. Such
//! points are logged as warnings and reported in [`DiffusionOperator::isolated`].

use nalgebra::DMatrix;

use crate::error::{Result, TrajectoryError};
use crate::math::linalg::{matrix_power, row_normalize};

/// Diffusion operator at time `t`.
#[derive(Debug, Clone)]
pub struct DiffusionOperator {
    /// One-step transition matrix. Rows sum to 1, or to 0 for isolated points.
    pub transition: DMatrix<f64>,
    /// `transition^t`.
    pub diffused: DMatrix<f64>,
    /// Diffusion time.
    pub t: usize,
    /// Points whose graph row summed to zero.
    pub isolated: Vec<usize>,
}

/// Row-normalize `graph` into a transition matrix.
///
/// Returns the matrix and the indices of all-zero rows.
///
/// # Errors
///
/// Returns an error if `graph` is not square or holds negative or
/// non-finite weights.
pub fn transition_matrix(graph: &DMatrix<f64>) -> Result<(DMatrix<f64>, Vec<usize>)> {
    if !graph.is_square() {
        return Err(TrajectoryError::invalid_input(format!(
            "graph must be square, got {}x{}",
            graph.nrows(),
            graph.ncols()
        )));
    }
    if graph.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(TrajectoryError::invalid_input(
            "graph weights must be finite and non-negative",
        ));
    }

    let (transition, isolated) = row_normalize(graph);
    for &i in &isolated {
        log::warn!(
            "diffusion: point {} has no edges; it gets maximal potential distance",
            i
        );
    }
    Ok((transition, isolated))
}

/// Build the `t`-step diffusion operator of `graph`.
///
/// # Errors
///
/// Returns an error if `t` is zero or the graph is malformed.
pub fn diffuse(graph: &DMatrix<f64>, t: usize) -> Result<DiffusionOperator> {
    if t == 0 {
        return Err(TrajectoryError::invalid_config("t must be at least 1"));
    }
    let (transition, isolated) = transition_matrix(graph)?;
    let diffused = matrix_power(&transition, t)?;
    log::debug!("diffusion: t = {}, {} isolated points", t, isolated.len());

    Ok(DiffusionOperator {
        transition,
        diffused,
        t,
        isolated,
    })
}
