//! End-to-end embedding of a single trajectory.
//!
//! [`run_tphate`] chains the stages of the diffusion embedding:
//!
//! 1. [`build_kernel_with_policy`]: adaptive Gaussian affinities
//! 2. [`sparsify`]: k-NN graph, symmetrized
//! 3. [`diffuse`]: row-normalized transition matrix raised to `t`
//! 4. [`embed_from_diffusion`]: potential distances placed with SMACOF
//!
//! [`run_pca`] and [`run_tsne`] provide the baselines, and
//! [`compare_embeddings`] runs all three on the same trajectory.
//! Every entry point is a pure function of its inputs.

use crate::config::{TphateConfig, TsneConfig};
use crate::diffusion::diffuse;
use crate::embedding::{Embedding, EmbeddingDiagnostics, EmbeddingMethod};
use crate::error::{Result, TrajectoryError};
use crate::graph::{edge_count, sparsify};
use crate::kernel::build_kernel_with_policy;
use crate::math::pca::compute_pca;
use crate::potential::embed_from_diffusion;
use crate::trajectory::Trajectory;
use crate::tsne::tsne;

/// Embed `trajectory` with the diffusion-potential method.
///
/// Sample-size requirements are checked before any matrix is built:
/// `T > k` first, then `T > n_components`.
///
/// # Errors
///
/// - [`TrajectoryError::InvalidConfig`] for an invalid configuration.
/// - [`TrajectoryError::InsufficientData`] if the trajectory is too short.
/// - [`TrajectoryError::DegenerateBandwidth`] for repeated points under the
///   default bandwidth policy.
/// - [`TrajectoryError::EmbeddingFailure`] if MDS fails.
///
/// # Example
///
/// ```
/// use latent_trajectory::{run_tphate, TphateConfig, Trajectory};
///
/// let rows: Vec<Vec<f64>> = (0..12)
///     .map(|i| {
///         let a = 0.4 * i as f64;
///         vec![a.cos(), a.sin(), 0.1 * i as f64]
///     })
///     .collect();
/// let trajectory = Trajectory::from_rows(&rows)?;
///
/// let embedding = run_tphate(&trajectory, &TphateConfig::default())?;
/// assert_eq!(embedding.coords.shape(), (12, 2));
/// # Ok::<(), latent_trajectory::TrajectoryError>(())
/// ```
pub fn run_tphate(trajectory: &Trajectory, config: &TphateConfig) -> Result<Embedding> {
    config.validate()?;
    let n = trajectory.len();
    if n <= config.k {
        return Err(TrajectoryError::insufficient_data("k", config.k, n));
    }
    if n <= config.n_components {
        return Err(TrajectoryError::insufficient_data(
            "n_components",
            config.n_components,
            n,
        ));
    }

    let kernel = build_kernel_with_policy(
        trajectory.as_matrix(),
        config.k,
        config.n_pca,
        config.bandwidth_policy,
    )?;
    let graph = sparsify(&kernel.kernel, &kernel.distances, config.k)?;
    let edges = edge_count(&graph);
    let operator = diffuse(&graph, config.t)?;
    let mds = embed_from_diffusion(
        &operator.diffused,
        config.n_components,
        config.epsilon,
        &config.mds,
    )?;

    log::debug!(
        "tphate: {} points, {} edges, stress {:.6} after {} iterations",
        n,
        edges,
        mds.stress,
        mds.n_iter
    );

    Ok(Embedding {
        method: EmbeddingMethod::Tphate,
        coords: mds.coords,
        diagnostics: EmbeddingDiagnostics {
            stress: Some(mds.stress),
            converged: Some(mds.converged),
            edge_count: Some(edges),
            isolated_points: operator.isolated,
            ..EmbeddingDiagnostics::default()
        },
    })
}

/// Project `trajectory` onto its first `n_components` principal axes.
///
/// # Errors
///
/// Returns an error if `T < 2` or `n_components` is outside
/// `1..=min(T, D)`.
pub fn run_pca(trajectory: &Trajectory, n_components: usize) -> Result<Embedding> {
    let pca = compute_pca(trajectory.as_matrix(), n_components)?;
    Ok(Embedding {
        method: EmbeddingMethod::Pca,
        coords: pca.scores,
        diagnostics: EmbeddingDiagnostics {
            explained_variance_ratio: Some(pca.explained_variance_ratio),
            ..EmbeddingDiagnostics::default()
        },
    })
}

/// Embed `trajectory` with exact t-SNE.
///
/// # Errors
///
/// Returns [`TrajectoryError::InsufficientData`] if the perplexity is not
/// below `T`, and propagates optimization failures.
pub fn run_tsne(trajectory: &Trajectory, config: &TsneConfig) -> Result<Embedding> {
    let result = tsne(trajectory.as_matrix(), config)?;
    Ok(Embedding {
        method: EmbeddingMethod::Tsne,
        coords: result.coords,
        diagnostics: EmbeddingDiagnostics {
            kl_divergence: Some(result.kl_divergence),
            perplexity: Some(result.perplexity),
            ..EmbeddingDiagnostics::default()
        },
    })
}

/// The three embeddings of one trajectory.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub pca: Embedding,
    pub tsne: Embedding,
    pub tphate: Embedding,
}

impl Comparison {
    /// Embeddings in [`EmbeddingMethod::ALL`] order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &Embedding> {
        [&self.pca, &self.tsne, &self.tphate].into_iter()
    }

    /// Embedding produced by `method`.
    #[must_use]
    pub const fn get(&self, method: EmbeddingMethod) -> &Embedding {
        match method {
            EmbeddingMethod::Pca => &self.pca,
            EmbeddingMethod::Tsne => &self.tsne,
            EmbeddingMethod::Tphate => &self.tphate,
        }
    }
}

/// Run PCA, t-SNE and T-PHATE on the same trajectory.
///
/// PCA uses the T-PHATE output dimensionality.
///
/// # Errors
///
/// Returns the first failure among the three methods.
pub fn compare_embeddings(
    trajectory: &Trajectory,
    tphate: &TphateConfig,
    tsne: &TsneConfig,
) -> Result<Comparison> {
    Ok(Comparison {
        pca: run_pca(trajectory, tphate.n_components)?,
        tsne: run_tsne(trajectory, tsne)?,
        tphate: run_tphate(trajectory, tphate)?,
    })
}
