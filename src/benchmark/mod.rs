//! Benchmark utilities: counters, recall, ground truth, vector files and the
//! beam-size sweep used by the CLI.
//!
//! - **Accuracy**: recall@k against a stored or brute-force ground truth
//! - **Speed**: QPS per beam width
//! - **Cost**: visited nodes (average and 99th percentile) and distance
//!   computations, per build and per query batch
//!
//! # Standard Benchmark Datasets
//!
//! | Dataset | Size | Dim | Distance | Use Case |
//! |---------|------|-----|----------|----------|
//! | SIFT-1M | 1M | 128 | L2 | Image descriptors |
//! | Deep-1M | 1M | 96 | L2 | CNN features |
//! | Text2Image-1M | 1M | 200 | IP | Cross-modal |
//!
//! Reference: <https://big-ann-benchmarks.com/>

pub mod datasets;
pub mod ground_truth;
pub mod metrics;
pub mod stats;
pub mod sweep;

pub use datasets::{
    compute_ground_truth, create_benchmark_dataset, create_clustered_dataset, random_vectors,
    Dataset, Vectors,
};
pub use ground_truth::GroundTruth;
pub use metrics::{mean_recall, recall_at_k};
pub use stats::{BuildStats, GraphStats, QueryStats, VisitedStats};
pub use sweep::{default_beams, run_sweep, SweepConfig, SweepReport, SweepRow};
