//! Beam-size sweep: run a query batch at several beam widths and report
//! recall, throughput and traversal cost for each.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::datasets::Vectors;
use super::ground_truth::GroundTruth;
use super::metrics::mean_recall;
use super::stats::{GraphStats, QueryStats, VisitedStats};
use crate::distance::Euclidean;
use crate::error::{IndexError, Result};
use crate::graph::Graph;
use crate::points::PointSet;
use crate::search::{search_batch, QueryParams};

/// Beam widths tried when none are given explicitly.
const DEFAULT_BEAMS: [usize; 10] = [10, 15, 20, 30, 50, 75, 100, 125, 250, 500];

/// Default sweep for `k`: `k` itself, then every default width above it.
pub fn default_beams(k: usize) -> Vec<usize> {
    let mut beams = vec![k];
    beams.extend(DEFAULT_BEAMS.iter().copied().filter(|&b| b > k));
    beams
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub k: usize,
    pub beams: Vec<usize>,
    pub cut: f32,
    pub limit: usize,
    pub degree_limit: usize,
}

impl SweepConfig {
    pub fn new(k: usize) -> Self {
        let base = QueryParams::for_k(k);
        Self {
            k,
            beams: default_beams(k),
            cut: base.cut,
            limit: base.limit,
            degree_limit: base.degree_limit,
        }
    }

    fn params(&self, beam_size: usize) -> QueryParams {
        QueryParams {
            k: self.k,
            beam_size,
            cut: self.cut,
            limit: self.limit,
            degree_limit: self.degree_limit,
        }
    }

    /// Check every point of the sweep before any query runs.
    pub fn validate(&self) -> Result<()> {
        if self.beams.is_empty() {
            return Err(IndexError::InvalidParameter(
                "sweep needs at least one beam size".to_string(),
            ));
        }
        self.beams.iter().try_for_each(|&b| self.params(b).validate())
    }
}

/// One beam width's outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    pub beam_size: usize,
    pub k: usize,
    pub cut: f32,
    /// Mean recall@k; absent without ground truth.
    pub recall: Option<f64>,
    pub qps: f64,
    pub visited: VisitedStats,
    pub avg_distance_comps: f64,
}

/// Everything written to the result file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub metric: String,
    pub start: u32,
    pub graph: GraphStats,
    pub queries: usize,
    pub rows: Vec<SweepRow>,
}

impl SweepReport {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self).map_err(std::io::Error::from)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        info!(path = %path.display(), rows = self.rows.len(), "wrote sweep results");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| IndexError::Format(format!("sweep results: {e}")))
    }

    /// Highest-recall row; the smallest beam wins a tie.
    pub fn best_recall(&self) -> Option<&SweepRow> {
        self.rows
            .iter()
            .filter_map(|r| r.recall.map(|recall| (recall, r)))
            .min_by(|a, b| b.0.total_cmp(&a.0))
            .map(|(_, r)| r)
    }
}

/// Run the whole query batch once per beam width.
pub fn run_sweep<P: PointSet + ?Sized>(
    graph: &Graph,
    points: &P,
    queries: &Vectors,
    start: u32,
    ground_truth: Option<&GroundTruth>,
    config: &SweepConfig,
) -> Result<SweepReport> {
    config.validate()?;
    if let Some(gt) = ground_truth {
        if gt.len() != queries.len() {
            return Err(IndexError::InvalidParameter(format!(
                "ground truth covers {} queries, query file has {}",
                gt.len(),
                queries.len()
            )));
        }
        if gt.results_per_query() < config.k {
            return Err(IndexError::InvalidParameter(format!(
                "k = {} exceeds the {} neighbors stored per query",
                config.k,
                gt.results_per_query()
            )));
        }
    }
    // queries are read as raw coordinates; distances come from `points`
    let query_points = queries.as_points(Euclidean)?;

    let mut rows = Vec::with_capacity(config.beams.len());
    for &beam_size in &config.beams {
        let params = config.params(beam_size);
        let timer = Instant::now();
        let results = search_batch(graph, points, &query_points, start, &params)?;
        let elapsed = timer.elapsed().as_secs_f64();

        let stats = QueryStats::from_stats(results.iter().map(|r| &r.stats));
        let recall = ground_truth
            .map(|gt| mean_recall(&results, gt, config.k))
            .transpose()?;
        let row = SweepRow {
            beam_size,
            k: config.k,
            cut: config.cut,
            recall,
            qps: if elapsed > 0.0 {
                results.len() as f64 / elapsed
            } else {
                0.0
            },
            visited: stats.visited,
            avg_distance_comps: stats.avg_distance_comps,
        };
        info!(
            beam = row.beam_size,
            k = row.k,
            recall = row.recall.unwrap_or(f64::NAN),
            qps = row.qps,
            avg_visited = row.visited.average,
            tail_visited = row.visited.tail,
            avg_distance_comps = row.avg_distance_comps,
            "sweep"
        );
        rows.push(row);
    }

    Ok(SweepReport {
        metric: points.metric().to_string(),
        start,
        graph: GraphStats::of(graph),
        queries: queries.len(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::datasets::compute_ground_truth;

    #[test]
    fn default_beams_start_at_k() {
        assert_eq!(default_beams(10), vec![10, 15, 20, 30, 50, 75, 100, 125, 250, 500]);
        assert_eq!(default_beams(1)[..2], [1, 10]);
        assert_eq!(default_beams(100), vec![100, 125, 250, 500]);
        assert_eq!(default_beams(1000), vec![1000]);
    }

    #[test]
    fn config_rejects_beams_below_k() {
        let mut c = SweepConfig::new(5);
        assert!(c.validate().is_ok());
        c.beams = vec![4];
        assert!(c.validate().is_err());
        c.beams.clear();
        assert!(c.validate().is_err());
    }

    /// Full path graph on a line: exact search for every beam.
    #[test]
    fn sweep_on_a_path_graph() {
        let n = 12;
        let base = Vectors::new((0..n).map(|i| i as f32).collect(), 1).unwrap();
        let points = base.as_points(Euclidean).unwrap();
        let mut graph = Graph::new(2, n).unwrap();
        for i in 0..n as u32 {
            let mut row = graph.neighbors_mut(i).unwrap();
            if i > 0 {
                row.append(i - 1).unwrap();
            }
            if (i as usize) + 1 < n {
                row.append(i + 1).unwrap();
            }
        }
        let queries = Vectors::new(vec![2.9, 8.2, 10.6], 1).unwrap();
        let gt = compute_ground_truth(&points, &queries, 2).unwrap();

        let mut config = SweepConfig::new(2);
        config.cut = f32::INFINITY;
        config.beams = vec![2, 4];
        let report = run_sweep(&graph, &points, &queries, 0, Some(&gt), &config).unwrap();
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.queries, 3);
        assert_eq!(report.graph.edges, 2 * (n - 1));
        for row in &report.rows {
            assert_eq!(row.recall, Some(1.0));
            assert!(row.visited.average > 0.0);
        }
        assert_eq!(report.best_recall().map(|r| r.beam_size), Some(2));
    }

    #[test]
    fn report_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let report = SweepReport {
            metric: "Euclidian".to_string(),
            start: 3,
            graph: GraphStats::default(),
            queries: 1,
            rows: vec![SweepRow {
                beam_size: 10,
                k: 10,
                cut: 1.35,
                recall: Some(0.5),
                qps: 100.0,
                visited: VisitedStats::default(),
                avg_distance_comps: 4.0,
            }],
        };
        report.save(&path).unwrap();
        assert_eq!(SweepReport::load(&path).unwrap(), report);
    }
}
