//! Test that exports embeddings to JSON for plotting.
//!
//! Run with: cargo test --test export_embeddings -- --ignored --nocapture

#![cfg(feature = "serde")]

use latent_trajectory::{
    compare_embeddings, compute_trajectory_stats, EmbeddingMethod, TphateConfig, Trajectory,
    TrajectoryStats, TsneConfig,
};
use serde::Serialize;
use std::f64::consts::PI;
use std::fs::File;
use std::io::Write;

#[derive(Serialize)]
struct EmbeddingExport {
    label: String,
    method: EmbeddingMethod,
    coords: Vec<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kl_divergence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    explained_variance_ratio: Option<Vec<f64>>,
}

#[derive(Serialize)]
struct TrajectoryExport {
    label: String,
    stats: TrajectoryStats,
    embeddings: Vec<EmbeddingExport>,
}

#[derive(Serialize)]
struct ExportData {
    trajectories: Vec<TrajectoryExport>,
    config: ConfigExport,
}

#[derive(Serialize)]
struct ConfigExport {
    k: usize,
    t: usize,
    n_components: usize,
    tsne_max_iter: usize,
}

/// Slow spiral drifting along its axis, padded with zero features.
fn generate_spiral(n: usize, dim: usize) -> Trajectory {
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let a = 0.4 * i as f64;
            let mut row = vec![0.0; dim];
            row[0] = a.cos();
            row[1] = a.sin();
            row[2] = 0.1 * i as f64;
            row
        })
        .collect();
    Trajectory::from_rows(&rows).unwrap()
}

/// Closed loop: start and end nearly coincide.
fn generate_loop(n: usize, dim: usize) -> Trajectory {
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let a = 2.0 * PI * i as f64 / n as f64;
            let mut row = vec![0.0; dim];
            row[0] = a.cos();
            row[1] = a.sin();
            row
        })
        .collect();
    Trajectory::from_rows(&rows).unwrap()
}

/// Two slow phases joined by a fast transition, as in a developmental jump.
fn generate_two_phase(n: usize, dim: usize) -> Trajectory {
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let s = i as f64 / (n - 1) as f64;
            let jump = 1.0 / (1.0 + (-(s - 0.5) * 40.0).exp());
            let mut row = vec![0.0; dim];
            row[0] = s + 3.0 * jump;
            row[1] = 0.2 * (6.0 * PI * s).sin();
            row[2] = jump;
            row
        })
        .collect();
    Trajectory::from_rows(&rows).unwrap()
}

/// Export PCA, t-SNE and T-PHATE embeddings of synthetic trajectories.
#[test]
#[ignore] // Run manually with: cargo test --test export_embeddings -- --ignored --nocapture
fn export_comparisons() {
    let tphate = TphateConfig::default();
    let tsne = TsneConfig::default();

    let cases = vec![
        ("spiral", generate_spiral(48, 16)),
        ("loop", generate_loop(40, 16)),
        ("two_phase", generate_two_phase(60, 16)),
    ];

    let mut trajectories = Vec::new();
    for (label, trajectory) in cases {
        let comparison = compare_embeddings(&trajectory, &tphate, &tsne).unwrap();
        let embeddings = comparison
            .iter()
            .map(|e| EmbeddingExport {
                label: label.to_string(),
                method: e.method,
                coords: e.to_rows(),
                stress: e.diagnostics.stress,
                kl_divergence: e.diagnostics.kl_divergence,
                explained_variance_ratio: e.diagnostics.explained_variance_ratio.clone(),
            })
            .collect();

        println!(
            "{label}: T-PHATE start-end {:.3}, path {:.3}",
            comparison.tphate.start_end_distance(),
            comparison.tphate.path_length()
        );

        trajectories.push(TrajectoryExport {
            label: label.to_string(),
            stats: compute_trajectory_stats(&trajectory).unwrap(),
            embeddings,
        });
    }

    let export = ExportData {
        trajectories,
        config: ConfigExport {
            k: tphate.k,
            t: tphate.t,
            n_components: tphate.n_components,
            tsne_max_iter: tsne.max_iter,
        },
    };

    let output_path = concat!(env!("CARGO_TARGET_TMPDIR"), "/embedding_comparison.json");
    let json = serde_json::to_string_pretty(&export).expect("Failed to serialize");
    let mut file = File::create(output_path).expect("Failed to create file");
    file.write_all(json.as_bytes()).expect("Failed to write file");

    println!("Exported {} trajectories to {}", export.trajectories.len(), output_path);
}
