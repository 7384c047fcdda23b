//! Per-trajectory motion statistics and cohort-level outlier analysis.
//!
//! Speeds are Euclidean step lengths in latent space. Within a trajectory
//! spreads are population standard deviations; across a cohort they are
//! sample standard deviations (`ddof = 1`).

use std::cmp::Ordering;

use crate::error::{Result, TrajectoryError};
use crate::trajectory::Trajectory;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Summary statistics of one trajectory.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrajectoryStats {
    /// Number of timesteps.
    pub n_frames: usize,

    /// Mean step length.
    pub mean_speed: f64,

    /// Population standard deviation of step lengths.
    pub std_speed: f64,

    /// Largest step length.
    pub max_speed: f64,

    /// Sum of step lengths.
    pub path_length: f64,

    /// Distance between the first and last timestep.
    pub start_end_distance: f64,

    /// Mean of all feature values.
    pub mean_feature: f64,

    /// Population standard deviation of all feature values.
    pub std_feature: f64,
}

impl TrajectoryStats {
    /// Value of `metric`.
    #[must_use]
    pub const fn metric(&self, metric: StatMetric) -> f64 {
        match metric {
            StatMetric::MeanSpeed => self.mean_speed,
            StatMetric::StdSpeed => self.std_speed,
            StatMetric::MaxSpeed => self.max_speed,
            StatMetric::PathLength => self.path_length,
            StatMetric::StartEndDistance => self.start_end_distance,
        }
    }
}

/// Statistic used for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StatMetric {
    MeanSpeed,
    StdSpeed,
    MaxSpeed,
    PathLength,
    StartEndDistance,
}

/// Ranking direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankOrder {
    /// Largest values first.
    Top,
    /// Smallest values first.
    Bottom,
}

/// Entities outside the cohort's `mean ± n_sigma * std` band.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OutlierReport {
    /// Threshold multiplier.
    pub n_sigma: f64,

    /// Entities whose mean speed is above the upper threshold.
    pub fast: Vec<String>,

    /// Entities whose mean speed is below the lower threshold.
    pub slow: Vec<String>,

    /// Entities whose path length is above the upper threshold.
    pub long_path: Vec<String>,

    /// `(mean, std)` of mean speed across the cohort.
    pub speed_summary: (f64, f64),

    /// `(mean, std)` of path length across the cohort.
    pub path_summary: (f64, f64),
}

impl OutlierReport {
    /// Whether no entity was flagged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fast.is_empty() && self.slow.is_empty() && self.long_path.is_empty()
    }
}

/// Step lengths `|z[t+1] - z[t]|`, one per consecutive pair.
#[must_use]
pub fn step_speeds(trajectory: &Trajectory) -> Vec<f64> {
    let data = trajectory.as_matrix();
    (1..data.nrows())
        .map(|t| (data.row(t) - data.row(t - 1)).norm())
        .collect()
}

/// Compute motion statistics of `trajectory`.
///
/// # Errors
///
/// Returns [`TrajectoryError::InsufficientData`] if the trajectory has fewer
/// than two timesteps.
pub fn compute_trajectory_stats(trajectory: &Trajectory) -> Result<TrajectoryStats> {
    let n = trajectory.len();
    if n < 2 {
        return Err(TrajectoryError::insufficient_data("steps", 1, n));
    }

    let speeds = step_speeds(trajectory);
    let (mean_speed, std_speed) = population_mean_std(&speeds);
    let max_speed = speeds.iter().copied().fold(0.0, f64::max);
    let path_length = speeds.iter().sum();

    let data = trajectory.as_matrix();
    let start_end_distance = (data.row(n - 1) - data.row(0)).norm();
    let values: Vec<f64> = data.iter().copied().collect();
    let (mean_feature, std_feature) = population_mean_std(&values);

    Ok(TrajectoryStats {
        n_frames: n,
        mean_speed,
        std_speed,
        max_speed,
        path_length,
        start_end_distance,
        mean_feature,
        std_feature,
    })
}

/// Flag cohort outliers by mean speed (both tails) and path length (upper
/// tail).
///
/// Returns an empty report for fewer than two entries.
#[must_use]
pub fn detect_outliers(entries: &[(String, TrajectoryStats)], n_sigma: f64) -> OutlierReport {
    let mut report = OutlierReport {
        n_sigma,
        ..OutlierReport::default()
    };
    if entries.len() < 2 {
        return report;
    }

    let speeds: Vec<f64> = entries.iter().map(|(_, s)| s.mean_speed).collect();
    let paths: Vec<f64> = entries.iter().map(|(_, s)| s.path_length).collect();
    report.speed_summary = sample_mean_std(&speeds);
    report.path_summary = sample_mean_std(&paths);

    let (speed_mean, speed_std) = report.speed_summary;
    let (path_mean, path_std) = report.path_summary;
    let fast = speed_mean + n_sigma * speed_std;
    let slow = speed_mean - n_sigma * speed_std;
    let long = path_mean + n_sigma * path_std;

    for (id, stats) in entries {
        if stats.mean_speed > fast {
            report.fast.push(id.clone());
        }
        if stats.mean_speed < slow {
            report.slow.push(id.clone());
        }
        if stats.path_length > long {
            report.long_path.push(id.clone());
        }
    }

    log::debug!(
        "outliers: {} fast, {} slow, {} long of {} entities",
        report.fast.len(),
        report.slow.len(),
        report.long_path.len(),
        entries.len()
    );
    report
}

/// The `n` entities with the largest (or smallest) value of `metric`.
///
/// Ties keep input order.
#[must_use]
pub fn rank_by<'a>(
    entries: &'a [(String, TrajectoryStats)],
    metric: StatMetric,
    n: usize,
    order: RankOrder,
) -> Vec<(&'a str, f64)> {
    let mut ranked: Vec<(&str, f64)> = entries
        .iter()
        .map(|(id, s)| (id.as_str(), s.metric(metric)))
        .collect();
    ranked.sort_by(|a, b| match order {
        RankOrder::Top => b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal),
        RankOrder::Bottom => a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal),
    });
    ranked.truncate(n);
    ranked
}

fn population_mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn sample_mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n < 2 {
        return (values.first().copied().unwrap_or(0.0), 0.0);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line(step: f64, n: usize) -> Trajectory {
        let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![step * i as f64, 0.0]).collect();
        Trajectory::from_rows(&rows).unwrap()
    }

    fn stats_with(mean_speed: f64, path_length: f64) -> TrajectoryStats {
        TrajectoryStats {
            n_frames: 10,
            mean_speed,
            std_speed: 0.0,
            max_speed: mean_speed,
            path_length,
            start_end_distance: 0.0,
            mean_feature: 0.0,
            std_feature: 0.0,
        }
    }

    #[test]
    fn test_straight_line_stats() {
        let stats = compute_trajectory_stats(&line(0.5, 5)).unwrap();
        assert_eq!(stats.n_frames, 5);
        assert_relative_eq!(stats.mean_speed, 0.5);
        assert_relative_eq!(stats.std_speed, 0.0);
        assert_relative_eq!(stats.max_speed, 0.5);
        assert_relative_eq!(stats.path_length, 2.0);
        assert_relative_eq!(stats.start_end_distance, 2.0);
        // Values 0, 0.5, ..., 2.0 and five zeros.
        assert_relative_eq!(stats.mean_feature, 0.5);
    }

    #[test]
    fn test_uneven_steps() {
        let traj = Trajectory::from_rows(&[[0.0], [1.0], [4.0]]).unwrap();
        assert_eq!(step_speeds(&traj), vec![1.0, 3.0]);

        let stats = compute_trajectory_stats(&traj).unwrap();
        assert_relative_eq!(stats.mean_speed, 2.0);
        assert_relative_eq!(stats.std_speed, 1.0);
        assert_relative_eq!(stats.max_speed, 3.0);
    }

    #[test]
    fn test_single_frame_rejected() {
        let traj = Trajectory::from_rows(&[[1.0, 2.0]]).unwrap();
        assert!(step_speeds(&traj).is_empty());
        assert!(matches!(
            compute_trajectory_stats(&traj),
            Err(TrajectoryError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_outliers() {
        let mut entries: Vec<(String, TrajectoryStats)> = (0..10)
            .map(|i| (format!("e{i}"), stats_with(1.0 + 0.01 * i as f64, 10.0)))
            .collect();
        entries.push(("fast".into(), stats_with(5.0, 50.0)));

        let report = detect_outliers(&entries, 2.0);
        assert_eq!(report.fast, vec!["fast".to_string()]);
        assert_eq!(report.long_path, vec!["fast".to_string()]);
        assert!(report.slow.is_empty());
        assert!(!report.is_empty());
    }

    #[test]
    fn test_sample_std_across_cohort() {
        let entries = vec![
            ("a".to_string(), stats_with(1.0, 1.0)),
            ("b".to_string(), stats_with(3.0, 1.0)),
        ];
        let report = detect_outliers(&entries, 1.0);
        assert_relative_eq!(report.speed_summary.0, 2.0);
        assert_relative_eq!(report.speed_summary.1, 2.0f64.sqrt());
        assert!(report.is_empty());
    }

    #[test]
    fn test_small_cohort_is_empty() {
        let entries = vec![("only".to_string(), stats_with(1.0, 1.0))];
        let report = detect_outliers(&entries, 2.0);
        assert!(report.is_empty());
        assert_eq!(report.n_sigma, 2.0);
    }

    #[test]
    fn test_rank_by() {
        let entries = vec![
            ("a".to_string(), stats_with(2.0, 1.0)),
            ("b".to_string(), stats_with(3.0, 1.0)),
            ("c".to_string(), stats_with(1.0, 1.0)),
        ];
        let top = rank_by(&entries, StatMetric::MeanSpeed, 2, RankOrder::Top);
        assert_eq!(top, vec![("b", 3.0), ("a", 2.0)]);

        let bottom = rank_by(&entries, StatMetric::MeanSpeed, 5, RankOrder::Bottom);
        assert_eq!(bottom.len(), 3);
        assert_eq!(bottom[0].0, "c");
    }
}
