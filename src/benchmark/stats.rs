//! Counters collected while building and querying.
//!
//! Per-point build counters and per-query search counters are gathered
//! without sharing (each worker owns its numbers) and summarised here.

use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::search::SearchStats;

/// Quantile reported as the "tail" of a visited-count distribution.
pub const TAIL_QUANTILE: f64 = 0.99;

/// Average and tail of a visited-count distribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitedStats {
    pub average: f64,
    /// Value at [`TAIL_QUANTILE`].
    pub tail: usize,
}

impl VisitedStats {
    pub fn from_counts(counts: &[usize]) -> Self {
        if counts.is_empty() {
            return Self::default();
        }
        let mut sorted = counts.to_vec();
        sorted.sort_unstable();
        let average = sorted.iter().sum::<usize>() as f64 / sorted.len() as f64;
        let at = ((sorted.len() as f64 * TAIL_QUANTILE) as usize).min(sorted.len() - 1);
        Self {
            average,
            tail: sorted[at],
        }
    }
}

/// Per-point counters accumulated over every pass of a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    visited: Vec<usize>,
    distance_comps: Vec<usize>,
}

impl BuildStats {
    pub fn new(len: usize) -> Self {
        Self {
            visited: vec![0; len],
            distance_comps: vec![0; len],
        }
    }

    /// Add one insertion's counters to `node`.
    pub fn record(&mut self, node: u32, visited: usize, distance_comps: usize) {
        let i = node as usize;
        self.visited[i] += visited;
        self.distance_comps[i] += distance_comps;
    }

    /// Charge reverse-edge pruning work to the node whose list was repaired.
    pub fn add_distance_comps(&mut self, node: u32, distance_comps: usize) {
        self.distance_comps[node as usize] += distance_comps;
    }

    pub fn visited(&self) -> &[usize] {
        &self.visited
    }

    pub fn distance_comps(&self) -> &[usize] {
        &self.distance_comps
    }

    pub fn visited_stats(&self) -> VisitedStats {
        VisitedStats::from_counts(&self.visited)
    }

    pub fn total_distance_comps(&self) -> usize {
        self.distance_comps.iter().sum()
    }
}

/// Summary of a query batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryStats {
    pub queries: usize,
    pub visited: VisitedStats,
    pub total_distance_comps: usize,
    pub avg_distance_comps: f64,
}

impl QueryStats {
    /// Merge per-query counters once the batch is done.
    pub fn from_stats<'a, I>(stats: I) -> Self
    where
        I: IntoIterator<Item = &'a SearchStats>,
    {
        let mut visited = Vec::new();
        let mut total = SearchStats::default();
        for s in stats {
            visited.push(s.visited);
            total += *s;
        }
        let queries = visited.len();
        Self {
            queries,
            visited: VisitedStats::from_counts(&visited),
            total_distance_comps: total.distance_comps,
            avg_distance_comps: if queries == 0 {
                0.0
            } else {
                total.distance_comps as f64 / queries as f64
            },
        }
    }
}

/// Shape of a graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub points: usize,
    pub edges: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
}

impl GraphStats {
    pub fn of(graph: &Graph) -> Self {
        let mut edges = 0;
        let mut max_degree = 0;
        for row in graph.iter() {
            edges += row.len();
            max_degree = max_degree.max(row.len());
        }
        Self {
            points: graph.len(),
            edges,
            avg_degree: if graph.is_empty() {
                0.0
            } else {
                edges as f64 / graph.len() as f64
            },
            max_degree,
        }
    }
}
