//! JSON input and output of latent trajectories and embeddings.
//!
//! A latent file `<id>_z.json` holds one trajectory as a JSON array of
//! rows, one row per timestep:
//!
//! ```json
//! [[0.12, -0.80, 1.05], [0.15, -0.77, 1.01]]
//! ```
//!
//! Embeddings are written as one JSON object per entity and method.
//! Cohort statistics are written as one JSON array of per-entity records,
//! and outlier reports as a single object.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::batch::{embed_batch, BatchConfig, BatchReport};
use crate::embedding::{Embedding, EmbeddingDiagnostics, EmbeddingMethod};
use crate::error::{Result, TrajectoryError};
use crate::stats::{OutlierReport, TrajectoryStats};
use crate::trajectory::Trajectory;

/// File name suffix of latent trajectory files.
pub const LATENT_SUFFIX: &str = "_z.json";

/// On-disk form of an embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub method: EmbeddingMethod,
    pub n_points: usize,
    pub n_components: usize,
    /// Coordinate rows in temporal order.
    pub coords: Vec<Vec<f64>>,
    pub path_length: f64,
    pub diagnostics: EmbeddingDiagnostics,
}

impl EmbeddingRecord {
    /// Build the record of `embedding` for entity `id`.
    #[must_use]
    pub fn new(id: &str, embedding: &Embedding) -> Self {
        Self {
            id: id.to_string(),
            method: embedding.method,
            n_points: embedding.n_points(),
            n_components: embedding.n_components(),
            coords: embedding.to_rows(),
            path_length: embedding.path_length(),
            diagnostics: embedding.diagnostics.clone(),
        }
    }
}

/// On-disk form of one entity's trajectory statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    pub id: String,
    pub stats: TrajectoryStats,
}

/// Entity id of a latent file: its name without [`LATENT_SUFFIX`].
#[must_use]
pub fn entity_id(path: &Path) -> Option<String> {
    path.file_name()?
        .to_str()?
        .strip_suffix(LATENT_SUFFIX)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Latent files in `dir`, sorted by file name, paired with their entity id.
///
/// # Errors
///
/// Returns [`TrajectoryError::Io`] if the directory cannot be read.
pub fn discover_latent_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(dir).map_err(|e| TrajectoryError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| TrajectoryError::io(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(id) = entity_id(&path) {
            files.push((id, path));
        }
    }
    files.sort_by(|a, b| a.1.file_name().cmp(&b.1.file_name()));

    log::debug!("io: {} latent files in {}", files.len(), dir.display());
    Ok(files)
}

/// Load a trajectory from a JSON array of rows.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the rows do
/// not form a valid trajectory.
pub fn load_trajectory(path: &Path) -> Result<Trajectory> {
    let text = fs::read_to_string(path).map_err(|e| TrajectoryError::io(path, e))?;
    let rows: Vec<Vec<f64>> = serde_json::from_str(&text).map_err(|source| TrajectoryError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Trajectory::from_rows(&rows)
}

/// Write a trajectory as a JSON array of rows.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_trajectory(path: &Path, trajectory: &Trajectory) -> Result<()> {
    write_json(path, &trajectory.to_rows())
}

/// Write `embedding` of entity `id` to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_embedding(path: &Path, id: &str, embedding: &Embedding) -> Result<()> {
    write_json(path, &EmbeddingRecord::new(id, embedding))
}

/// Read an embedding record written by [`save_embedding`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_embedding_record(path: &Path) -> Result<EmbeddingRecord> {
    read_json(path)
}

/// Write per-entity statistics, in the given order, as a JSON array of
/// [`StatsRecord`]s.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_stats_summary(path: &Path, entries: &[(String, TrajectoryStats)]) -> Result<()> {
    let records: Vec<StatsRecord> = entries
        .iter()
        .map(|(id, stats)| StatsRecord {
            id: id.clone(),
            stats: stats.clone(),
        })
        .collect();
    write_json(path, &records)?;
    log::info!("io: wrote stats of {} entities to {}", records.len(), path.display());
    Ok(())
}

/// Read a summary written by [`save_stats_summary`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_stats_summary(path: &Path) -> Result<Vec<(String, TrajectoryStats)>> {
    let records: Vec<StatsRecord> = read_json(path)?;
    Ok(records.into_iter().map(|r| (r.id, r.stats)).collect())
}

/// Write an outlier report as a JSON object.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_outlier_report(path: &Path, report: &OutlierReport) -> Result<()> {
    write_json(path, report)
}

/// Read a report written by [`save_outlier_report`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_outlier_report(path: &Path) -> Result<OutlierReport> {
    read_json(path)
}

/// Output path of an embedding: `<dir>/<id>_<method>.json`.
#[must_use]
pub fn embedding_path(dir: &Path, id: &str, method: EmbeddingMethod) -> PathBuf {
    dir.join(format!("{id}_{}.json", method.tag()))
}

/// Load every latent file in `dir` and embed it.
///
/// Files that fail to load are recorded as failures of their entity, like
/// embedding failures. `config.limit` counts discovered files, so a file
/// that fails to load still uses up one slot.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed or the configuration
/// is invalid.
pub fn embed_directory(dir: &Path, config: &BatchConfig) -> Result<BatchReport> {
    config.validate()?;
    let mut files = discover_latent_files(dir)?;
    if let Some(limit) = config.limit {
        files.truncate(limit);
    }

    let mut loaded = Vec::with_capacity(files.len());
    let mut load_failures = Vec::new();
    for (id, path) in files {
        match load_trajectory(&path) {
            Ok(trajectory) => loaded.push((id, trajectory)),
            Err(err) => load_failures.push(err.for_entity(id)),
        }
    }

    let mut report = embed_batch(loaded, config)?;
    for err in load_failures {
        report.record_failure(err);
    }
    Ok(report)
}

/// Write every embedding of `report` into `out_dir`, creating it if needed.
///
/// Returns the written paths.
///
/// # Errors
///
/// Returns an error if the directory or a file cannot be written.
pub fn save_report(out_dir: &Path, report: &BatchReport) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir).map_err(|e| TrajectoryError::io(out_dir, e))?;
    let mut written = Vec::new();
    for entity in &report.completed {
        for embedding in &entity.embeddings {
            let path = embedding_path(out_dir, &entity.id, embedding.method);
            save_embedding(&path, &entity.id, embedding)?;
            written.push(path);
        }
    }
    log::info!("io: wrote {} embeddings to {}", written.len(), out_dir.display());
    Ok(written)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|e| TrajectoryError::io(path, e))?;
    serde_json::from_str(&text).map_err(|source| TrajectoryError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|source| TrajectoryError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|e| TrajectoryError::io(path, e))
}
