//! Latent trajectory container.
//!
//! A [`Trajectory`] is an ordered sequence of `T` feature vectors of width
//! `D`, stored row-per-timestep in a dense matrix. It is validated once on
//! construction and never mutated afterwards.

use nalgebra::DMatrix;

use crate::error::{Result, TrajectoryError};

/// Ordered `T x D` latent trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    data: DMatrix<f64>,
}

impl Trajectory {
    /// Build a trajectory from row vectors, one per timestep.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no rows, the first row is empty, rows
    /// differ in width, or any value is not finite.
    ///
    /// # Example
    ///
    /// ```
    /// use latent_trajectory::Trajectory;
    ///
    /// let traj = Trajectory::from_rows(&[vec![0.0, 1.0], vec![0.5, 1.5], vec![1.0, 2.0]])?;
    /// assert_eq!(traj.len(), 3);
    /// assert_eq!(traj.dim(), 2);
    /// # Ok::<(), latent_trajectory::TrajectoryError>(())
    /// ```
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let first = rows
            .first()
            .ok_or_else(|| TrajectoryError::invalid_input("trajectory has no timesteps"))?;
        let dim = first.as_ref().len();
        if dim == 0 {
            return Err(TrajectoryError::invalid_input(
                "trajectory rows have no features",
            ));
        }

        for (row, values) in rows.iter().enumerate() {
            let values = values.as_ref();
            if values.len() != dim {
                return Err(TrajectoryError::RaggedRows {
                    row,
                    expected: dim,
                    actual: values.len(),
                });
            }
        }

        let data = DMatrix::from_fn(rows.len(), dim, |i, j| rows[i].as_ref()[j]);
        Self::from_matrix(data)
    }

    /// Wrap an existing `T x D` matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is empty or holds non-finite values.
    pub fn from_matrix(data: DMatrix<f64>) -> Result<Self> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(TrajectoryError::invalid_input(format!(
                "trajectory must be non-empty, got {}x{}",
                data.nrows(),
                data.ncols()
            )));
        }
        for j in 0..data.ncols() {
            for i in 0..data.nrows() {
                if !data[(i, j)].is_finite() {
                    return Err(TrajectoryError::NonFinite { row: i, col: j });
                }
            }
        }
        Ok(Self { data })
    }

    /// Number of timesteps `T`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    /// Always false: construction rejects empty trajectories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    /// Feature width `D`.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.ncols()
    }

    /// Borrow the underlying matrix.
    #[must_use]
    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Consume into the underlying matrix.
    #[must_use]
    pub fn into_matrix(self) -> DMatrix<f64> {
        self.data
    }

    /// Feature vector at timestep `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    #[must_use]
    pub fn point(&self, i: usize) -> Vec<f64> {
        self.data.row(i).iter().copied().collect()
    }

    /// Copy out as row vectors.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.len()).map(|i| self.point(i)).collect()
    }

    /// Trajectory made of the given timesteps, in the given order.
    ///
    /// # Errors
    ///
    /// Returns an error if `indices` is empty or out of range.
    pub fn select(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(TrajectoryError::invalid_input(format!(
                "timestep {bad} out of range for trajectory of length {}",
                self.len()
            )));
        }
        Self::from_matrix(self.data.select_rows(indices))
    }
}
