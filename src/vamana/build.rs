//! Vamana graph construction.
//!
//! Each pass visits every point once in a seeded random order, in batches.
//! Within a batch:
//!
//! 1. every point runs a beam search (pool bound `L`) from the start point
//!    against the current graph and robust-prunes the expanded set plus its
//!    current neighbors down to at most `R`; this step only reads the graph;
//! 2. the new lists are written, one writer per row;
//! 3. reverse edges are grouped by target and each target row is repaired by
//!    one task: appended to while it has room, otherwise re-pruned over its
//!    existing neighbors plus the incoming ones.
//!
//! Steps are separated by barriers, so concurrent writers never share a row
//! and no row is ever observed above `R`.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info};

use super::params::BuildParams;
use super::prune::{robust_prune, Neighbors};
use crate::benchmark::stats::{BuildStats, GraphStats};
use crate::error::{IndexError, Result};
use crate::graph::Graph;
use crate::points::PointSet;
use crate::search::traverse;

/// Upper bound on the batch size of incremental passes.
const MAX_BATCH: usize = 300_000;
/// Incremental batches stop doubling at this fraction of the point count.
const MAX_BATCH_FRACTION: f64 = 0.02;
/// Rows per partial sum when computing the centroid.
const CENTROID_BLOCK: usize = 4096;

/// What a build produced besides the graph itself.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// Entry point for every traversal.
    pub start: u32,
    pub stats: BuildStats,
    pub graph_stats: GraphStats,
    pub elapsed_secs: f64,
}

/// Builds a Vamana graph over a borrowed point set.
pub struct VamanaBuilder<'a, P: PointSet + ?Sized> {
    points: &'a P,
    params: BuildParams,
}

struct Proposal {
    node: u32,
    neighbors: Neighbors,
    visited: usize,
    distance_comps: usize,
}

impl<'a, P: PointSet + ?Sized> VamanaBuilder<'a, P> {
    /// Validates `params` up front; nothing is computed yet.
    pub fn new(points: &'a P, params: BuildParams) -> Result<Self> {
        params.validate()?;
        if points.is_empty() {
            return Err(IndexError::EmptyIndex);
        }
        if points.len() > u32::MAX as usize {
            return Err(IndexError::InvalidParameter(format!(
                "{} points exceed the 32-bit id space",
                points.len()
            )));
        }
        Ok(Self { points, params })
    }

    pub fn params(&self) -> &BuildParams {
        &self.params
    }

    /// Allocate a fresh graph and build into it.
    pub fn build(&self) -> Result<(Graph, BuildOutcome)> {
        let mut graph = Graph::new(self.params.max_degree, self.points.len())?;
        let outcome = self.build_into(&mut graph)?;
        Ok((graph, outcome))
    }

    /// Run all passes over `graph`, refining whatever edges it already holds.
    pub fn build_into(&self, graph: &mut Graph) -> Result<BuildOutcome> {
        let n = self.points.len();
        if graph.len() != n {
            return Err(IndexError::InvalidParameter(format!(
                "graph has {} nodes but point set has {n} points",
                graph.len()
            )));
        }
        if graph.max_degree() != self.params.max_degree {
            return Err(IndexError::InvalidParameter(format!(
                "graph max degree {} differs from R = {}",
                graph.max_degree(),
                self.params.max_degree
            )));
        }

        let timer = Instant::now();
        let start = find_medoid(self.points);
        info!(
            start,
            points = n,
            r = self.params.max_degree,
            l = self.params.search_list,
            alpha = self.params.alpha,
            passes = self.params.num_passes,
            "building Vamana graph"
        );

        let mut stats = BuildStats::new(n);
        for pass in 0..self.params.num_passes {
            let alpha = self.params.alpha_for_pass(pass);
            let order = shuffled_order(n, self.params.seed.wrapping_add(pass as u64));
            let batches = batch_bounds(n, self.params.single_batch);
            for &(lo, hi) in &batches {
                self.insert_batch(graph, &order[lo..hi], start, alpha, &mut stats)?;
            }
            debug!(
                pass,
                alpha,
                batches = batches.len(),
                edges = graph.num_edges(),
                "pass complete"
            );
        }

        let graph_stats = GraphStats::of(graph);
        let elapsed_secs = timer.elapsed().as_secs_f64();
        let visited = stats.visited_stats();
        info!(
            start,
            avg_degree = graph_stats.avg_degree,
            max_degree = graph_stats.max_degree,
            avg_visited = visited.average,
            tail_visited = visited.tail,
            distance_comps = stats.total_distance_comps(),
            elapsed_secs,
            "build complete"
        );

        Ok(BuildOutcome {
            start,
            stats,
            graph_stats,
            elapsed_secs,
        })
    }

    fn insert_batch(
        &self,
        graph: &mut Graph,
        batch: &[u32],
        start: u32,
        alpha: f32,
        stats: &mut BuildStats,
    ) -> Result<()> {
        let r = self.params.max_degree;
        let l = self.params.search_list;

        // candidate generation and pruning against a read-only graph
        let mut proposals: Vec<Proposal> = {
            let graph: &Graph = graph;
            batch
                .par_iter()
                .map(|&node| {
                    let beam = traverse(
                        graph,
                        self.points,
                        self.points.vector(node),
                        start,
                        l,
                        f32::INFINITY,
                        usize::MAX,
                        r,
                    );
                    let current = graph.neighbors(node);
                    let (neighbors, prune_comps) = robust_prune(
                        self.points,
                        node,
                        beam.visited.iter().copied().chain(current.iter()),
                        alpha,
                        r,
                    );
                    Proposal {
                        node,
                        neighbors,
                        visited: beam.stats.visited,
                        distance_comps: beam.stats.distance_comps + prune_comps,
                    }
                })
                .collect()
        };

        // one writer per row
        proposals.sort_unstable_by_key(|p| p.node);
        let ids: Vec<u32> = proposals.iter().map(|p| p.node).collect();
        graph
            .rows_mut(&ids)?
            .into_par_iter()
            .zip(proposals.par_iter())
            .try_for_each(|(mut row, proposal)| row.replace(&proposal.neighbors))?;
        for p in &proposals {
            stats.record(p.node, p.visited, p.distance_comps);
        }

        // reverse edges, grouped by target
        let mut edges: Vec<(u32, u32)> = proposals
            .iter()
            .flat_map(|p| p.neighbors.iter().map(move |&target| (target, p.node)))
            .collect();
        edges.par_sort_unstable();
        edges.dedup();

        let mut targets: Vec<u32> = Vec::new();
        let mut bounds: Vec<usize> = Vec::new();
        for (i, &(target, _)) in edges.iter().enumerate() {
            if targets.last() != Some(&target) {
                targets.push(target);
                bounds.push(i);
            }
        }
        bounds.push(edges.len());
        let sources: Vec<u32> = edges.iter().map(|&(_, source)| source).collect();

        let points = self.points;
        let repairs: Vec<(u32, usize)> = graph
            .rows_mut(&targets)?
            .into_par_iter()
            .enumerate()
            .map(|(g, mut row)| -> Result<(u32, usize)> {
                let target = row.id();
                let incoming: Neighbors = sources[bounds[g]..bounds[g + 1]]
                    .iter()
                    .copied()
                    .filter(|&s| s != target && !row.contains(s))
                    .collect();
                if incoming.is_empty() {
                    return Ok((target, 0));
                }
                if row.len() + incoming.len() <= r {
                    for s in incoming {
                        row.append(s)?;
                    }
                    return Ok((target, 0));
                }
                let (pruned, comps) = robust_prune(
                    points,
                    target,
                    row.as_slice().iter().copied().chain(incoming),
                    alpha,
                    r,
                );
                row.replace(&pruned)?;
                Ok((target, comps))
            })
            .collect::<Result<Vec<_>>>()?;
        for (target, comps) in repairs {
            stats.add_distance_comps(target, comps);
        }

        Ok(())
    }
}

/// Approximate medoid: the point closest (under the point set's metric) to the
/// coordinate centroid. Ties go to the smaller id.
pub fn find_medoid<P: PointSet + ?Sized>(points: &P) -> u32 {
    let n = points.len();
    let dim = points.dimension();
    if n == 0 {
        return 0;
    }

    // rows are summed in fixed blocks and the partials added in block order,
    // so the centroid does not depend on thread scheduling
    let blocks = n.div_ceil(CENTROID_BLOCK);
    let partials: Vec<Vec<f64>> = (0..blocks)
        .into_par_iter()
        .map(|b| {
            let mut acc = vec![0.0f64; dim];
            let hi = ((b + 1) * CENTROID_BLOCK).min(n);
            for i in b * CENTROID_BLOCK..hi {
                for (a, &x) in acc.iter_mut().zip(points.vector(i as u32)) {
                    *a += f64::from(x);
                }
            }
            acc
        })
        .collect();
    let mut sum = vec![0.0f64; dim];
    for partial in &partials {
        for (s, p) in sum.iter_mut().zip(partial) {
            *s += p;
        }
    }
    let centroid: Vec<f32> = sum.iter().map(|&s| (s / n as f64) as f32).collect();

    (0..n as u32)
        .into_par_iter()
        .map(|i| (points.distance_to(&centroid, i), i))
        .min_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map_or(0, |(_, id)| id)
}

/// Seeded random permutation of `0..n`.
fn shuffled_order(n: usize, seed: u64) -> Vec<u32> {
    let mut order: Vec<u32> = (0..n as u32).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));
    order
}

/// Half-open ranges of the insertion order processed as one parallel round.
///
/// With `single_batch > 0` the whole order is one round. Otherwise sizes
/// double from 1 up to 2% of `n` (at least 1, at most [`MAX_BATCH`]).
fn batch_bounds(n: usize, single_batch: usize) -> Vec<(usize, usize)> {
    if n == 0 {
        return Vec::new();
    }
    if single_batch > 0 {
        return vec![(0, n)];
    }
    let cap = ((n as f64 * MAX_BATCH_FRACTION) as usize).clamp(1, MAX_BATCH);
    let mut bounds = Vec::new();
    let mut lo = 0;
    let mut size = 1;
    while lo < n {
        let hi = (lo + size).min(n);
        bounds.push((lo, hi));
        lo = hi;
        size = (size * 2).min(cap);
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Euclidean;
    use crate::points::PointRange;

    #[test]
    fn batches_cover_everything_once() {
        for n in [1usize, 2, 7, 100, 1000, 12345] {
            let b = batch_bounds(n, 0);
            assert_eq!(b.first().map(|x| x.0), Some(0));
            assert_eq!(b.last().map(|x| x.1), Some(n));
            assert!(b.windows(2).all(|w| w[0].1 == w[1].0));
            let cap = ((n as f64 * MAX_BATCH_FRACTION) as usize).max(1);
            assert!(b.iter().all(|&(lo, hi)| hi > lo && hi - lo <= cap));
        }
        assert_eq!(batch_bounds(1000, 1), vec![(0, 1000)]);
        assert!(batch_bounds(0, 0).is_empty());
    }

    #[test]
    fn batches_double() {
        let b = batch_bounds(1000, 0);
        let sizes: Vec<usize> = b.iter().map(|&(lo, hi)| hi - lo).collect();
        assert_eq!(&sizes[..6], &[1, 2, 4, 8, 16, 20]);
    }

    #[test]
    fn shuffled_order_is_a_seeded_permutation() {
        let a = shuffled_order(50, 7);
        let b = shuffled_order(50, 7);
        assert_eq!(a, b);
        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<u32>>());
    }

    #[test]
    fn medoid_of_a_line_is_the_middle() {
        let data: Vec<f32> = (0..9).map(|i| i as f32).collect();
        let points = PointRange::new(&data, 1, Euclidean).unwrap();
        assert_eq!(find_medoid(&points), 4);

        let even: Vec<f32> = (0..4).map(|i| i as f32).collect();
        let points = PointRange::new(&even, 1, Euclidean).unwrap();
        assert_eq!(find_medoid(&points), 1);
    }

    #[test]
    fn medoid_is_stable_across_blocks() {
        // more rows than one partial-sum block; centroid sits at 2.5
        let n = CENTROID_BLOCK * 2 + 3;
        let data: Vec<f32> = (0..n).map(|i| if i == 17 { 2.5 } else { (i % 6) as f32 }).collect();
        let points = PointRange::new(&data, 1, Euclidean).unwrap();
        let first = find_medoid(&points);
        assert_eq!(first, find_medoid(&points));
        assert_eq!(points.vector(first), &[2.5]);
    }

    #[test]
    fn builder_rejects_mismatched_graph() {
        let data: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let points = PointRange::new(&data, 1, Euclidean).unwrap();
        let builder = VamanaBuilder::new(&points, BuildParams::new(4, 8, 1.2, 1)).unwrap();
        let mut wrong_len = Graph::new(4, 9).unwrap();
        assert!(builder.build_into(&mut wrong_len).is_err());
        let mut wrong_degree = Graph::new(5, 10).unwrap();
        assert!(builder.build_into(&mut wrong_degree).is_err());
    }

    #[test]
    fn builder_rejects_empty_points_and_bad_params() {
        let data: Vec<f32> = Vec::new();
        let points = PointRange::new(&data, 3, Euclidean).unwrap();
        assert!(matches!(
            VamanaBuilder::new(&points, BuildParams::default()),
            Err(IndexError::EmptyIndex)
        ));

        let data = [0.0_f32; 6];
        let points = PointRange::new(&data, 3, Euclidean).unwrap();
        let bad = BuildParams { max_degree: 0, ..BuildParams::default() };
        assert!(matches!(
            VamanaBuilder::new(&points, bad),
            Err(IndexError::InvalidParameter(_))
        ));
    }

    #[test]
    fn single_point_gets_no_edges() {
        let data = [1.0_f32, 2.0];
        let points = PointRange::new(&data, 2, Euclidean).unwrap();
        let (graph, outcome) = VamanaBuilder::new(&points, BuildParams::new(4, 8, 1.2, 2))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(outcome.start, 0);
        assert!(graph.neighbors(0).is_empty());
    }

    #[test]
    fn duplicate_coordinates_build_without_error() {
        let data = [0.5_f32; 2 * 16];
        let points = PointRange::new(&data, 2, Euclidean).unwrap();
        let (graph, _) = VamanaBuilder::new(&points, BuildParams::new(4, 8, 1.0, 2))
            .unwrap()
            .build()
            .unwrap();
        graph.check_invariants().unwrap();
    }
}
