//! Embedding of many named trajectories.
//!
//! Each entity is processed independently. A failure is attributed to its
//! entity, logged, recorded in the report and skipped; the rest of the
//! batch still runs.

use crate::config::{TphateConfig, TsneConfig};
use crate::embedding::{Embedding, EmbeddingMethod};
use crate::error::{Result, TrajectoryError};
use crate::pipeline::{run_pca, run_tphate, run_tsne};
use crate::stats::{compute_trajectory_stats, TrajectoryStats};
use crate::trajectory::Trajectory;

/// Settings for a batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// Diffusion embedding settings. `n_components` also applies to PCA.
    pub tphate: TphateConfig,

    /// t-SNE settings.
    pub tsne: TsneConfig,

    /// Methods to run, in order.
    pub methods: Vec<EmbeddingMethod>,

    /// Process at most this many entities.
    pub limit: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            tphate: TphateConfig::default(),
            tsne: TsneConfig::default(),
            methods: EmbeddingMethod::ALL.to_vec(),
            limit: None,
        }
    }
}

impl BatchConfig {
    /// Run only the diffusion embedding.
    #[must_use]
    pub fn tphate_only(tphate: TphateConfig) -> Self {
        Self {
            tphate,
            methods: vec![EmbeddingMethod::Tphate],
            ..Self::default()
        }
    }

    /// Limit the number of entities processed.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no method is selected or a method's settings are
    /// invalid.
    pub fn validate(&self) -> Result<()> {
        if self.methods.is_empty() {
            return Err(TrajectoryError::invalid_config(
                "batch must run at least one method",
            ));
        }
        if self.methods.contains(&EmbeddingMethod::Tphate) {
            self.tphate.validate()?;
        }
        if self.methods.contains(&EmbeddingMethod::Tsne) {
            self.tsne.validate()?;
        }
        Ok(())
    }

    /// Run `method` on one trajectory.
    ///
    /// # Errors
    ///
    /// Propagates the method's failure.
    pub fn run(&self, method: EmbeddingMethod, trajectory: &Trajectory) -> Result<Embedding> {
        match method {
            EmbeddingMethod::Pca => run_pca(trajectory, self.tphate.n_components),
            EmbeddingMethod::Tsne => run_tsne(trajectory, &self.tsne),
            EmbeddingMethod::Tphate => run_tphate(trajectory, &self.tphate),
        }
    }
}

/// Embeddings of one successfully processed entity.
#[derive(Debug, Clone)]
pub struct EntityEmbeddings {
    /// Entity identifier.
    pub id: String,

    /// Motion statistics of the input trajectory.
    pub stats: TrajectoryStats,

    /// One embedding per configured method, in configured order.
    pub embeddings: Vec<Embedding>,
}

impl EntityEmbeddings {
    /// Embedding produced by `method`, if it was run.
    #[must_use]
    pub fn get(&self, method: EmbeddingMethod) -> Option<&Embedding> {
        self.embeddings.iter().find(|e| e.method == method)
    }
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Entities for which every method succeeded.
    pub completed: Vec<EntityEmbeddings>,

    /// Failures, each attributed to its entity.
    pub failures: Vec<TrajectoryError>,
}

impl BatchReport {
    /// Entities attempted.
    #[must_use]
    pub fn n_attempted(&self) -> usize {
        self.completed.len() + self.failures.len()
    }

    /// Identifiers of failed entities.
    #[must_use]
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures.iter().filter_map(TrajectoryError::entity_id).collect()
    }

    /// `(id, stats)` pairs of completed entities, for cohort analysis.
    #[must_use]
    pub fn stats_entries(&self) -> Vec<(String, TrajectoryStats)> {
        self.completed
            .iter()
            .map(|e| (e.id.clone(), e.stats.clone()))
            .collect()
    }

    pub(crate) fn record_failure(&mut self, err: TrajectoryError) {
        log::error!("batch: {}", err);
        self.failures.push(err);
    }
}

/// Embed one entity with every configured method.
///
/// # Errors
///
/// Returns the first failure, attributed to `id`.
pub fn embed_entity(
    id: &str,
    trajectory: &Trajectory,
    config: &BatchConfig,
) -> Result<EntityEmbeddings> {
    let attempt = || -> Result<EntityEmbeddings> {
        let stats = compute_trajectory_stats(trajectory)?;
        let embeddings = config
            .methods
            .iter()
            .map(|&method| config.run(method, trajectory))
            .collect::<Result<Vec<_>>>()?;
        Ok(EntityEmbeddings {
            id: id.to_string(),
            stats,
            embeddings,
        })
    };
    attempt().map_err(|e| e.for_entity(id))
}

/// Embed every `(id, trajectory)` pair, skipping failures.
///
/// # Errors
///
/// Returns an error only for an invalid configuration; per-entity failures
/// are collected in the report.
pub fn embed_batch<I, S>(entities: I, config: &BatchConfig) -> Result<BatchReport>
where
    I: IntoIterator<Item = (S, Trajectory)>,
    S: AsRef<str>,
{
    config.validate()?;
    let mut report = BatchReport::default();
    let limit = config.limit.unwrap_or(usize::MAX);

    for (id, trajectory) in entities.into_iter().take(limit) {
        let id = id.as_ref();
        log::debug!("batch: embedding {} ({} x {})", id, trajectory.len(), trajectory.dim());
        match embed_entity(id, &trajectory, config) {
            Ok(done) => report.completed.push(done),
            Err(err) => report.record_failure(err),
        }
    }

    log::info!(
        "batch: {} completed, {} failed",
        report.completed.len(),
        report.failures.len()
    );
    Ok(report)
}
