//! Configuration for trajectory embedding.
//!
//! [`TphateConfig`] centralizes the diffusion-potential parameters, with
//! [`MdsConfig`] for the stress-minimization step. [`TsneConfig`] and
//! [`WindowConfig`] cover the t-SNE baseline and temporal windowing.
//!
//! # Example
//!
//! ```
//! use latent_trajectory::{BandwidthPolicy, TphateConfig};
//!
//! let config = TphateConfig::default().with_t(3).with_n_pca(10);
//! assert!(config.validate().is_ok());
//!
//! let tolerant = TphateConfig::default().with_bandwidth_policy(BandwidthPolicy::Floor(1e-9));
//! assert!(tolerant.validate().is_ok());
//! ```

use crate::error::{Result, TrajectoryError};

/// Upper clamp of the adaptive t-SNE perplexity.
pub const MAX_ADAPTIVE_PERPLEXITY: usize = 30;

/// Lower clamp of the adaptive t-SNE perplexity.
pub const MIN_ADAPTIVE_PERPLEXITY: usize = 5;

/// Behaviour when a point's k-th neighbour distance is zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BandwidthPolicy {
    /// Return [`TrajectoryError::DegenerateBandwidth`].
    #[default]
    Fail,
    /// Replace a zero bandwidth with the given positive floor. Duplicates of
    /// the point then get kernel 1, every other point kernel ~0.
    Floor(f64),
}

/// Initialization of the SMACOF iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MdsInit {
    /// `n_init` uniform random starts drawn from the seeded stream; the run
    /// with the lowest stress wins.
    #[default]
    Random,
    /// A single start from classical (Torgerson) scaling.
    Classical,
}

/// Metric multidimensional scaling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MdsConfig {
    /// Starting configuration strategy.
    pub init: MdsInit,
    /// Number of random starts (ignored for [`MdsInit::Classical`]).
    pub n_init: usize,
    /// Maximum SMACOF iterations per start.
    pub max_iter: usize,
    /// Relative stress improvement below which a run stops.
    pub eps: f64,
    /// Seed of the random starts.
    pub seed: u64,
    /// Accept a result whose best start ran out of iterations. When false,
    /// such a result is an [`TrajectoryError::EmbeddingFailure`].
    pub allow_unconverged: bool,
}

impl Default for MdsConfig {
    fn default() -> Self {
        Self {
            init: MdsInit::Random,
            n_init: 4,
            max_iter: 300,
            eps: 1e-3,
            seed: 42,
            allow_unconverged: false,
        }
    }
}

impl MdsConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.n_init < 1 {
            return Err(TrajectoryError::invalid_config("mds.n_init must be at least 1"));
        }
        if self.max_iter < 1 {
            return Err(TrajectoryError::invalid_config(
                "mds.max_iter must be at least 1",
            ));
        }
        if !(self.eps > 0.0) {
            return Err(TrajectoryError::invalid_config("mds.eps must be positive"));
        }
        Ok(())
    }
}

/// Configuration of the diffusion-potential (T-PHATE style) embedding.
///
/// # Core Parameters
///
/// - `k`: neighbours per point, also the rank of the adaptive bandwidth.
/// - `t`: diffusion time. `1` keeps local structure, larger values smooth
///   toward global structure.
/// - `n_pca`: optional principal-component pre-step before distances.
/// - `n_components`: output dimensionality.
#[derive(Debug, Clone, PartialEq)]
pub struct TphateConfig {
    /// Output dimensionality.
    pub n_components: usize,

    /// Number of nearest neighbours.
    pub k: usize,

    /// Diffusion time (matrix power).
    pub t: usize,

    /// Principal components kept before distance computation.
    /// Only applied when smaller than both `T - 1` and `D`.
    pub n_pca: Option<usize>,

    /// Additive floor inside the potential logarithm.
    pub epsilon: f64,

    /// Zero-bandwidth handling.
    pub bandwidth_policy: BandwidthPolicy,

    /// Stress-minimization settings.
    pub mds: MdsConfig,
}

impl Default for TphateConfig {
    fn default() -> Self {
        Self {
            n_components: 2,
            k: 5,
            t: 1,
            n_pca: None,
            epsilon: 1e-6,
            bandwidth_policy: BandwidthPolicy::Fail,
            mds: MdsConfig::default(),
        }
    }
}

impl TphateConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.n_components < 1 {
            return Err(TrajectoryError::invalid_config(
                "n_components must be at least 1",
            ));
        }
        if self.k < 1 {
            return Err(TrajectoryError::invalid_config("k must be at least 1"));
        }
        if self.t < 1 {
            return Err(TrajectoryError::invalid_config("t must be at least 1"));
        }
        if self.n_pca == Some(0) {
            return Err(TrajectoryError::invalid_config("n_pca must be at least 1"));
        }
        if !(self.epsilon > 0.0) || !self.epsilon.is_finite() {
            return Err(TrajectoryError::invalid_config(
                "epsilon must be positive and finite",
            ));
        }
        if let BandwidthPolicy::Floor(floor) = self.bandwidth_policy {
            if !(floor > 0.0) || !floor.is_finite() {
                return Err(TrajectoryError::invalid_config(
                    "bandwidth floor must be positive and finite",
                ));
            }
        }
        self.mds.validate()
    }

    /// Preset for long diffusion: emphasizes the global ordering of a
    /// trajectory over local jitter.
    #[must_use]
    pub fn global() -> Self {
        Self {
            t: 5,
            ..Self::default()
        }
    }

    /// Preset for wide autoencoder latents: denoise with a principal
    /// component pre-step and use the deterministic classical start.
    #[must_use]
    pub fn denoised(n_pca: usize) -> Self {
        Self {
            n_pca: Some(n_pca),
            mds: MdsConfig {
                init: MdsInit::Classical,
                ..MdsConfig::default()
            },
            ..Self::default()
        }
    }

    /// Set the number of neighbours.
    #[must_use]
    pub const fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set the diffusion time.
    #[must_use]
    pub const fn with_t(mut self, t: usize) -> Self {
        self.t = t;
        self
    }

    /// Set the output dimensionality.
    #[must_use]
    pub const fn with_n_components(mut self, n_components: usize) -> Self {
        self.n_components = n_components;
        self
    }

    /// Enable the principal-component pre-step.
    #[must_use]
    pub const fn with_n_pca(mut self, n_pca: usize) -> Self {
        self.n_pca = Some(n_pca);
        self
    }

    /// Set the zero-bandwidth policy.
    #[must_use]
    pub const fn with_bandwidth_policy(mut self, policy: BandwidthPolicy) -> Self {
        self.bandwidth_policy = policy;
        self
    }

    /// Set the MDS seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.mds.seed = seed;
        self
    }

    /// Set the MDS initialization.
    #[must_use]
    pub const fn with_mds_init(mut self, init: MdsInit) -> Self {
        self.mds.init = init;
        self
    }
}

/// Configuration of the t-SNE baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TsneConfig {
    /// Output dimensionality.
    pub n_components: usize,

    /// Fixed perplexity. `None` selects [`TsneConfig::adaptive_perplexity`].
    pub perplexity: Option<f64>,

    /// Multiplier of P during the early phase.
    pub early_exaggeration: f64,

    /// Iterations spent in the early phase.
    pub exaggeration_iter: usize,

    /// Fixed learning rate. `None` uses `max(T / exaggeration / 4, 50)`.
    pub learning_rate: Option<f64>,

    /// Total gradient-descent iterations.
    pub max_iter: usize,

    /// Seed of the initial coordinates.
    pub seed: u64,
}

impl Default for TsneConfig {
    fn default() -> Self {
        Self {
            n_components: 2,
            perplexity: None,
            early_exaggeration: 12.0,
            exaggeration_iter: 250,
            learning_rate: None,
            max_iter: 1000,
            seed: 42,
        }
    }
}

impl TsneConfig {
    /// Perplexity clamped to stay valid for short trajectories:
    /// `min(30, max(5, n_points / 3))`.
    #[must_use]
    pub fn adaptive_perplexity(n_points: usize) -> f64 {
        (n_points / 3).clamp(MIN_ADAPTIVE_PERPLEXITY, MAX_ADAPTIVE_PERPLEXITY) as f64
    }

    /// Perplexity used for a trajectory of `n_points`.
    #[must_use]
    pub fn perplexity_for(&self, n_points: usize) -> f64 {
        self.perplexity
            .unwrap_or_else(|| Self::adaptive_perplexity(n_points))
    }

    /// Learning rate used for a trajectory of `n_points`.
    #[must_use]
    pub fn learning_rate_for(&self, n_points: usize) -> f64 {
        self.learning_rate
            .unwrap_or_else(|| (n_points as f64 / self.early_exaggeration / 4.0).max(50.0))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.n_components < 1 {
            return Err(TrajectoryError::invalid_config(
                "n_components must be at least 1",
            ));
        }
        if let Some(p) = self.perplexity {
            if !(p > 0.0) || !p.is_finite() {
                return Err(TrajectoryError::invalid_config(
                    "perplexity must be positive and finite",
                ));
            }
        }
        if let Some(lr) = self.learning_rate {
            if !(lr > 0.0) || !lr.is_finite() {
                return Err(TrajectoryError::invalid_config(
                    "learning_rate must be positive and finite",
                ));
            }
        }
        if !(self.early_exaggeration >= 1.0) {
            return Err(TrajectoryError::invalid_config(
                "early_exaggeration must be >= 1",
            ));
        }
        if self.max_iter < 1 {
            return Err(TrajectoryError::invalid_config("max_iter must be at least 1"));
        }
        if self.exaggeration_iter > self.max_iter {
            return Err(TrajectoryError::invalid_config(
                "exaggeration_iter cannot exceed max_iter",
            ));
        }
        Ok(())
    }

    /// Set the seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set a fixed perplexity.
    #[must_use]
    pub const fn with_perplexity(mut self, perplexity: f64) -> Self {
        self.perplexity = Some(perplexity);
        self
    }

    /// Set the iteration budget.
    #[must_use]
    pub const fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }
}

/// Temporal windowing of a frame or latent sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Frames per window.
    pub length: usize,
    /// Keep every `subsample`-th frame before windowing.
    pub subsample: usize,
    /// Offset between consecutive window starts (in subsampled frames).
    pub stride: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::with_half_overlap(16, 3)
    }
}

impl WindowConfig {
    /// Windows of `length` frames overlapping by half.
    #[must_use]
    pub const fn with_half_overlap(length: usize, subsample: usize) -> Self {
        Self {
            length,
            subsample,
            stride: if length / 2 == 0 { 1 } else { length / 2 },
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is zero.
    pub fn validate(&self) -> Result<()> {
        if self.length < 1 || self.subsample < 1 || self.stride < 1 {
            return Err(TrajectoryError::invalid_config(
                "window length, subsample and stride must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TphateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.k, 5);
        assert_eq!(config.t, 1);
        assert_eq!(config.n_components, 2);
        assert_eq!(config.n_pca, None);
        assert_eq!(config.mds.seed, 42);
        assert!(!config.mds.allow_unconverged);
        assert_eq!(TphateConfig::new(), config);
    }

    #[test]
    fn test_validation() {
        let mut config = TphateConfig::default();

        config.k = 0;
        assert!(config.validate().is_err());

        config.k = 5;
        config.t = 0;
        assert!(config.validate().is_err());

        config.t = 1;
        config.n_pca = Some(0);
        assert!(config.validate().is_err());

        config.n_pca = None;
        config.epsilon = 0.0;
        assert!(config.validate().is_err());

        config.epsilon = 1e-6;
        config.bandwidth_policy = BandwidthPolicy::Floor(0.0);
        assert!(config.validate().is_err());

        config.bandwidth_policy = BandwidthPolicy::Fail;
        config.mds.n_init = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_presets() {
        let global = TphateConfig::global();
        assert!(global.validate().is_ok());
        assert_eq!(global.t, 5);

        let denoised = TphateConfig::denoised(10);
        assert!(denoised.validate().is_ok());
        assert_eq!(denoised.n_pca, Some(10));
        assert_eq!(denoised.mds.init, MdsInit::Classical);
    }

    #[test]
    fn test_builder_pattern() {
        let config = TphateConfig::default().with_k(3).with_t(4).with_seed(7);
        assert_eq!(config.k, 3);
        assert_eq!(config.t, 4);
        assert_eq!(config.mds.seed, 7);
    }

    #[test]
    fn test_adaptive_perplexity() {
        assert_eq!(TsneConfig::adaptive_perplexity(16), 5.0);
        assert_eq!(TsneConfig::adaptive_perplexity(30), 10.0);
        assert_eq!(TsneConfig::adaptive_perplexity(300), 30.0);
        assert_eq!(TsneConfig::adaptive_perplexity(4), 5.0);

        let fixed = TsneConfig::default().with_perplexity(8.0);
        assert_eq!(fixed.perplexity_for(100), 8.0);
    }

    #[test]
    fn test_tsne_learning_rate() {
        let config = TsneConfig::default();
        assert_eq!(config.learning_rate_for(16), 50.0);
        assert_eq!(config.learning_rate_for(4800), 100.0);
    }

    #[test]
    fn test_tsne_validation() {
        assert!(TsneConfig::default().validate().is_ok());
        assert!(TsneConfig::default().with_perplexity(-1.0).validate().is_err());
        assert!(TsneConfig::default().with_max_iter(100).validate().is_err());
    }

    #[test]
    fn test_window_config() {
        let config = WindowConfig::default();
        assert_eq!(config.length, 16);
        assert_eq!(config.subsample, 3);
        assert_eq!(config.stride, 8);
        assert!(config.validate().is_ok());
        assert_eq!(WindowConfig::with_half_overlap(1, 1).stride, 1);
    }
}
