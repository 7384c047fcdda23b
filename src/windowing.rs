//! Fixed-length windows over frame sequences.
//!
//! Frames are first subsampled (every `subsample`-th frame is kept), then
//! cut into windows of `length` consecutive subsampled frames whose starts
//! are `stride` apart. Trailing frames that do not fill a window are
//! dropped.

use crate::config::WindowConfig;
use crate::error::Result;
use crate::trajectory::Trajectory;

/// One window of a frame sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceWindow {
    /// Start position in the subsampled sequence.
    pub start_idx: usize,

    /// Indices into the full, non-subsampled sequence.
    pub frame_indices: Vec<usize>,
}

impl SequenceWindow {
    /// Number of frames in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frame_indices.len()
    }

    /// Whether the window holds no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frame_indices.is_empty()
    }
}

/// Windows over a sequence of `n_frames` frames.
///
/// Returns no windows when fewer than `config.length` frames survive
/// subsampling.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
///
/// # Example
///
/// ```
/// use latent_trajectory::{sequence_windows, WindowConfig};
///
/// // 60 frames keep 20 after subsampling by 3, enough for one window.
/// let windows = sequence_windows(60, &WindowConfig::default())?;
/// assert_eq!(windows.len(), 1);
/// assert_eq!(windows[0].frame_indices[1], 3);
/// # Ok::<(), latent_trajectory::TrajectoryError>(())
/// ```
pub fn sequence_windows(n_frames: usize, config: &WindowConfig) -> Result<Vec<SequenceWindow>> {
    config.validate()?;
    let kept = n_frames.div_ceil(config.subsample);
    if kept < config.length {
        return Ok(Vec::new());
    }

    let windows: Vec<SequenceWindow> = (0..=kept - config.length)
        .step_by(config.stride)
        .map(|start| SequenceWindow {
            start_idx: start,
            frame_indices: (start..start + config.length)
                .map(|i| i * config.subsample)
                .collect(),
        })
        .collect();

    log::debug!(
        "windowing: {} frames -> {} subsampled -> {} windows",
        n_frames,
        kept,
        windows.len()
    );
    Ok(windows)
}

/// Cut `trajectory` into windowed sub-trajectories.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn split_trajectory(
    trajectory: &Trajectory,
    config: &WindowConfig,
) -> Result<Vec<(SequenceWindow, Trajectory)>> {
    sequence_windows(trajectory.len(), config)?
        .into_iter()
        .map(|window| {
            let part = trajectory.select(&window.frame_indices)?;
            Ok((window, part))
        })
        .collect()
}
