//! Latent Trajectory Library
//!
//! Low-dimensional embedding of ordered latent trajectories, such as the
//! per-frame latent vectors an autoencoder produces for a time-lapse
//! recording.
//!
//! The main method is a diffusion-potential embedding (T-PHATE style): an
//! adaptive-bandwidth affinity graph over the timesteps is diffused for `t`
//! steps, converted to potential distances and placed in 2D or 3D with
//! metric SMACOF. PCA and exact t-SNE are provided as baselines.
//!
//! # Features
//!
//! - **Adaptive kernel**: per-point bandwidth from the k-th neighbour distance
//! - **Diffusion smoothing**: larger `t` trades local detail for global order
//! - **Deterministic**: every random start comes from a seeded ChaCha8 stream
//! - **Batch friendly**: per-entity failures are reported, not fatal
//!
//! # Quick Start
//!
//! ```
//! use latent_trajectory::{run_tphate, TphateConfig, Trajectory};
//!
//! // A slow spiral in 8 dimensions.
//! let rows: Vec<Vec<f64>> = (0..16)
//!     .map(|i| {
//!         let a = 0.4 * i as f64;
//!         vec![a.cos(), a.sin(), 0.1 * i as f64, 0.0, 0.0, 0.0, 0.0, 0.0]
//!     })
//!     .collect();
//! let trajectory = Trajectory::from_rows(&rows)?;
//!
//! let embedding = run_tphate(&trajectory, &TphateConfig::default())?;
//! assert_eq!(embedding.coords.shape(), (16, 2));
//!
//! // Start and end stay further apart than neighbouring timesteps.
//! assert!(embedding.start_end_distance() > embedding.distance(0, 1));
//! # Ok::<(), latent_trajectory::TrajectoryError>(())
//! ```
//!
//! # Pipeline
//!
//! | Stage | Function | Output |
//! |-------|----------|--------|
//! | Kernel | [`build_kernel`] | `T x T` adaptive affinities |
//! | Graph | [`sparsify`] | symmetric k-NN graph |
//! | Diffusion | [`diffuse`] | `P^t` |
//! | Embedding | [`embed_from_diffusion`] | `T x n_components` |
//!
//! # Presets
//!
//! ```
//! use latent_trajectory::TphateConfig;
//!
//! let local = TphateConfig::default();
//! let global = TphateConfig::global();
//! let wide_latents = TphateConfig::denoised(10);
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::many_single_char_names)]

pub mod batch;
pub mod config;
pub mod diffusion;
pub mod embedding;
pub mod error;
pub mod graph;
#[cfg(feature = "serde")]
pub mod io;
pub mod kernel;
pub mod math;
pub mod pipeline;
pub mod potential;
pub mod stats;
pub mod trajectory;
pub mod tsne;
pub mod windowing;

// Re-exports for convenient access
pub use batch::{embed_batch, embed_entity, BatchConfig, BatchReport, EntityEmbeddings};
pub use config::{BandwidthPolicy, MdsConfig, MdsInit, TphateConfig, TsneConfig, WindowConfig};
pub use diffusion::{diffuse, DiffusionOperator};
pub use embedding::{Embedding, EmbeddingDiagnostics, EmbeddingMethod};
pub use error::{Result, TrajectoryError};
pub use graph::sparsify;
#[cfg(feature = "serde")]
pub use io::{
    discover_latent_files, embed_directory, load_trajectory, save_embedding, save_outlier_report,
    save_stats_summary,
};
pub use kernel::{build_kernel, build_kernel_with_policy, AffinityKernel};
pub use math::{compute_pca, MdsResult, PcaProjection};
pub use pipeline::{compare_embeddings, run_pca, run_tphate, run_tsne, Comparison};
pub use potential::embed_from_diffusion;
pub use stats::{
    compute_trajectory_stats, detect_outliers, rank_by, OutlierReport, RankOrder, StatMetric,
    TrajectoryStats,
};
pub use trajectory::Trajectory;
pub use windowing::{sequence_windows, split_trajectory, SequenceWindow};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
