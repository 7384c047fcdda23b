//! Directory-level embedding of latent files.

#![cfg(feature = "serde")]

use std::fs;
use std::path::Path;

use approx::assert_relative_eq;

use latent_trajectory::io::{
    embedding_path, load_embedding_record, load_outlier_report, load_stats_summary, save_report,
    save_trajectory,
};
use latent_trajectory::{
    detect_outliers, discover_latent_files, embed_directory, load_trajectory, save_outlier_report,
    save_stats_summary, BatchConfig, EmbeddingMethod, TphateConfig, Trajectory, TrajectoryError,
    TsneConfig,
};

fn spiral(n: usize, phase: f64) -> Trajectory {
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let a = phase + 0.4 * i as f64;
            vec![a.cos(), a.sin(), 0.1 * i as f64, 0.05 * a.sin()]
        })
        .collect();
    Trajectory::from_rows(&rows).unwrap()
}

fn write_cohort(dir: &Path) {
    save_trajectory(&dir.join("D01_z.json"), &spiral(16, 0.0)).unwrap();
    save_trajectory(&dir.join("D02_z.json"), &spiral(20, 0.7)).unwrap();
    save_trajectory(&dir.join("D03_z.json"), &spiral(3, 0.0)).unwrap();
    fs::write(dir.join("D04_z.json"), "{\"not\": \"rows\"}").unwrap();
    fs::write(dir.join("notes.txt"), "ignored").unwrap();
    fs::write(dir.join("D05.json"), "[[1.0]]").unwrap();
}

#[test]
fn test_discovery_is_sorted_and_filtered() {
    let dir = tempfile::tempdir().unwrap();
    write_cohort(dir.path());

    let files = discover_latent_files(dir.path()).unwrap();
    let ids: Vec<&str> = files.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["D01", "D02", "D03", "D04"]);

    let first = load_trajectory(&files[0].1).unwrap();
    let expected = spiral(16, 0.0);
    assert_eq!(first.len(), 16);
    for (a, b) in first.as_matrix().iter().zip(expected.as_matrix().iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-15);
    }
}

#[test]
fn test_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let err = discover_latent_files(&dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, TrajectoryError::Io { .. }));
}

#[test]
fn test_embed_directory_skips_bad_entities() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    write_cohort(dir.path());

    let config = BatchConfig {
        tsne: TsneConfig::default().with_max_iter(300),
        ..BatchConfig::default()
    };
    let report = embed_directory(dir.path(), &config).unwrap();

    assert_eq!(report.n_attempted(), 4);
    let done: Vec<&str> = report.completed.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(done, vec!["D01", "D02"]);

    let mut failed = report.failed_ids();
    failed.sort_unstable();
    assert_eq!(failed, vec!["D03", "D04"]);
    for err in &report.failures {
        match err.entity_id() {
            Some("D03") => assert!(matches!(err.root(), TrajectoryError::InsufficientData { .. })),
            Some("D04") => assert!(matches!(err.root(), TrajectoryError::Json { .. })),
            other => panic!("unexpected failure {other:?}"),
        }
    }

    let out = tempfile::tempdir().unwrap();
    let written = save_report(out.path(), &report).unwrap();
    assert_eq!(written.len(), 6);

    let record = load_embedding_record(&embedding_path(out.path(), "D02", EmbeddingMethod::Tphate))
        .unwrap();
    assert_eq!(record.id, "D02");
    assert_eq!(record.n_points, 20);
    assert_eq!(record.coords.len(), 20);
    assert!(record.diagnostics.stress.is_some());
}

#[test]
fn test_directory_limit() {
    let dir = tempfile::tempdir().unwrap();
    write_cohort(dir.path());

    let config = BatchConfig::tphate_only(TphateConfig::default()).with_limit(1);
    let report = embed_directory(dir.path(), &config).unwrap();
    assert_eq!(report.n_attempted(), 1);
    assert_eq!(report.completed[0].id, "D01");
}

#[test]
fn test_stats_summary_export() {
    let dir = tempfile::tempdir().unwrap();
    write_cohort(dir.path());

    let config = BatchConfig::tphate_only(TphateConfig::default());
    let report = embed_directory(dir.path(), &config).unwrap();
    let entries = report.stats_entries();
    assert_eq!(entries.len(), 2);

    let out = tempfile::tempdir().unwrap();
    let stats_path = out.path().join("stats_summary.json");
    save_stats_summary(&stats_path, &entries).unwrap();
    let loaded = load_stats_summary(&stats_path).unwrap();

    assert_eq!(loaded.len(), entries.len());
    for ((id, stats), (loaded_id, loaded_stats)) in entries.iter().zip(&loaded) {
        assert_eq!(id, loaded_id);
        assert_eq!(stats.n_frames, loaded_stats.n_frames);
        assert_relative_eq!(stats.mean_speed, loaded_stats.mean_speed, max_relative = 1e-12);
        assert_relative_eq!(stats.path_length, loaded_stats.path_length, max_relative = 1e-12);
        assert_relative_eq!(stats.mean_feature, loaded_stats.mean_feature, epsilon = 1e-12);
    }

    let outliers = detect_outliers(&entries, 2.0);
    let outlier_path = out.path().join("outliers.json");
    save_outlier_report(&outlier_path, &outliers).unwrap();
    let loaded = load_outlier_report(&outlier_path).unwrap();
    assert_eq!(loaded.n_sigma, 2.0);
    assert_eq!(loaded.fast, outliers.fast);
    assert_eq!(loaded.long_path, outliers.long_path);
    assert_relative_eq!(loaded.speed_summary.0, outliers.speed_summary.0, max_relative = 1e-12);
}
