//! Error types for trajectory embedding operations.
//!
//! Every failure is local to one trajectory's computation. Callers that
//! process many entities attach the entity identifier with
//! [`TrajectoryError::for_entity`] and keep going.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for trajectory embedding operations.
#[derive(Error, Debug)]
pub enum TrajectoryError {
    /// Input validation errors.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Rows of a trajectory have different widths.
    #[error("Ragged trajectory: row {row} has {actual} values, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// A trajectory value is NaN or infinite.
    #[error("Non-finite value at row {row}, column {col}")]
    NonFinite { row: usize, col: usize },

    /// Too few trajectory points for the requested parameter.
    #[error("Insufficient data: {parameter}={value} needs more than {value} points, got {points}")]
    InsufficientData {
        parameter: &'static str,
        value: usize,
        points: usize,
    },

    /// A point's adaptive bandwidth is zero (duplicate points).
    #[error("Degenerate bandwidth at point {index}: k-th neighbour distance is zero")]
    DegenerateBandwidth { index: usize },

    /// The multidimensional scaling step could not produce coordinates.
    #[error("Embedding failure: {reason}")]
    EmbeddingFailure { reason: String },

    /// Numerical computation resulted in NaN or Inf.
    #[error("Numerical instability: {context}")]
    NumericalInstability { context: String },

    /// Configuration validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failure attributed to one named entity of a batch.
    #[error("{id}: {source}")]
    Entity {
        id: String,
        #[source]
        source: Box<TrajectoryError>,
    },

    /// Filesystem access failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A latent or embedding file could not be (de)serialized.
    #[cfg(feature = "serde")]
    #[error("JSON error on {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type alias for trajectory embedding operations.
pub type Result<T> = std::result::Result<T, TrajectoryError>;

impl TrajectoryError {
    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an insufficient data error for the named parameter.
    #[must_use]
    pub const fn insufficient_data(parameter: &'static str, value: usize, points: usize) -> Self {
        Self::InsufficientData {
            parameter,
            value,
            points,
        }
    }

    /// Create an embedding failure.
    #[must_use]
    pub fn embedding_failure(reason: impl Into<String>) -> Self {
        Self::EmbeddingFailure {
            reason: reason.into(),
        }
    }

    /// Create a numerical instability error.
    #[must_use]
    pub fn numerical_instability(context: impl Into<String>) -> Self {
        Self::NumericalInstability {
            context: context.into(),
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an I/O error for `path`.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach an entity identifier. Already-attributed errors are left as is.
    #[must_use]
    pub fn for_entity(self, id: impl Into<String>) -> Self {
        match self {
            Self::Entity { .. } => self,
            other => Self::Entity {
                id: id.into(),
                source: Box::new(other),
            },
        }
    }

    /// The entity identifier, if one was attached.
    #[must_use]
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Self::Entity { id, .. } => Some(id),
            _ => None,
        }
    }

    /// The underlying error with any entity attribution stripped.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Entity { source, .. } => source.root(),
            other => other,
        }
    }
}
