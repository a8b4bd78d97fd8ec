//! Beam search over a built graph.
//!
//! The frontier is a sorted vector bounded by `beam_size`. Each step expands
//! the closest member not yet expanded, scores its unseen neighbors and offers
//! them to the frontier. Search stops when every frontier member has been
//! expanded or `limit` nodes have been expanded, whichever comes first.
//!
//! Queries never write to the graph or the point set; any number of them can
//! run at once. Counters are returned with each result and summed by the
//! caller, so there is no shared counter on the hot path.

use std::cmp::Ordering;
use std::collections::HashSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::graph::Graph;
use crate::points::PointSet;

/// Parameters of a single query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    /// Number of results wanted.
    pub k: usize,
    /// Frontier bound (must be at least `k`).
    pub beam_size: usize,
    /// Candidates farther than `cut` times the best distance found so far are
    /// discarded. `f32::INFINITY` disables the check.
    pub cut: f32,
    /// Maximum number of nodes expanded.
    pub limit: usize,
    /// Maximum neighbors considered per expanded node.
    pub degree_limit: usize,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            k: 10,
            beam_size: 10,
            cut: 1.35,
            limit: usize::MAX,
            degree_limit: usize::MAX,
        }
    }
}

impl QueryParams {
    /// Parameters for `k` results with a beam of `beam_size`.
    pub fn new(k: usize, beam_size: usize) -> Self {
        Self {
            k,
            beam_size,
            ..Self::default()
        }
    }

    /// `k` results with the tightest legal beam.
    pub fn for_k(k: usize) -> Self {
        Self::new(k, k)
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(IndexError::InvalidParameter("k must be > 0".into()));
        }
        if self.beam_size < self.k {
            return Err(IndexError::InvalidParameter(format!(
                "beam size {} must be >= k {}",
                self.beam_size, self.k
            )));
        }
        if self.cut.is_nan() || self.cut < 1.0 {
            return Err(IndexError::InvalidParameter(format!(
                "cut must be >= 1.0, got {}",
                self.cut
            )));
        }
        if self.limit == 0 {
            return Err(IndexError::InvalidParameter("limit must be > 0".into()));
        }
        if self.degree_limit == 0 {
            return Err(IndexError::InvalidParameter(
                "degree limit must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Traversal counters of one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Nodes expanded.
    pub visited: usize,
    /// Distance evaluations.
    pub distance_comps: usize,
}

impl std::ops::AddAssign for SearchStats {
    fn add_assign(&mut self, rhs: Self) {
        self.visited += rhs.visited;
        self.distance_comps += rhs.distance_comps;
    }
}

/// Ranked neighbors of one query plus its counters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// `(id, distance)` ascending by distance, ties by smaller id.
    pub neighbors: Vec<(u32, f32)>,
    pub stats: SearchStats,
}

impl SearchResult {
    pub fn ids(&self) -> Vec<u32> {
        self.neighbors.iter().map(|&(id, _)| id).collect()
    }
}

/// Candidate in the frontier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    pub id: u32,
    pub dist: f32,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // total_cmp keeps NaN ordered; ids make ties deterministic
        self.dist
            .total_cmp(&other.dist)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Clone, Copy)]
struct Slot {
    cand: Candidate,
    expanded: bool,
}

/// Everything a traversal produced: the final frontier, the nodes it expanded
/// (in expansion order) and its counters.
pub(crate) struct Beam {
    pub frontier: Vec<Candidate>,
    pub visited: Vec<u32>,
    pub stats: SearchStats,
}

/// Upper bound on admissible distances given the best one so far. Written so
/// that negative (inner product) distances loosen rather than tighten.
#[inline]
fn cut_bound(best: f32, cut: f32) -> f32 {
    if cut.is_finite() {
        best + (cut - 1.0) * best.abs()
    } else {
        f32::INFINITY
    }
}

/// Core traversal. Callers validate `start`, dimensions and parameters.
#[allow(clippy::too_many_arguments)]
pub(crate) fn traverse<P: PointSet + ?Sized>(
    graph: &Graph,
    points: &P,
    query: &[f32],
    start: u32,
    beam_size: usize,
    cut: f32,
    limit: usize,
    degree_limit: usize,
) -> Beam {
    let beam_size = beam_size.max(1);
    let mut seen: HashSet<u32> = HashSet::with_capacity(beam_size * 4);
    let mut frontier: Vec<Slot> = Vec::with_capacity(beam_size + 1);
    let mut visited: Vec<u32> = Vec::new();

    let start_dist = points.distance_to(query, start);
    let mut stats = SearchStats {
        visited: 0,
        distance_comps: 1,
    };
    seen.insert(start);
    frontier.push(Slot {
        cand: Candidate {
            id: start,
            dist: start_dist,
        },
        expanded: false,
    });
    let mut best = start_dist;

    while visited.len() < limit {
        let Some(pos) = frontier.iter().position(|s| !s.expanded) else {
            break;
        };
        frontier[pos].expanded = true;
        let current = frontier[pos].cand;
        visited.push(current.id);

        let bound = cut_bound(best, cut);
        for nb in graph.neighbors(current.id).iter().take(degree_limit) {
            if !seen.insert(nb) {
                continue;
            }
            let dist = points.distance_to(query, nb);
            stats.distance_comps += 1;
            if dist > bound {
                continue;
            }

            let cand = Candidate { id: nb, dist };
            if frontier.len() >= beam_size {
                match frontier.last() {
                    Some(worst) if cand < worst.cand => {}
                    _ => continue,
                }
            }
            let at = frontier.partition_point(|s| s.cand < cand);
            frontier.insert(
                at,
                Slot {
                    cand,
                    expanded: false,
                },
            );
            if frontier.len() > beam_size {
                frontier.pop();
            }
            if dist < best {
                best = dist;
            }
        }
    }

    stats.visited = visited.len();
    Beam {
        frontier: frontier.into_iter().map(|s| s.cand).collect(),
        visited,
        stats,
    }
}

fn check_inputs<P: PointSet + ?Sized>(graph: &Graph, points: &P, start: u32) -> Result<()> {
    if graph.is_empty() || points.is_empty() {
        return Err(IndexError::EmptyIndex);
    }
    if graph.len() != points.len() {
        return Err(IndexError::InvalidParameter(format!(
            "graph has {} nodes but point set has {} points",
            graph.len(),
            points.len()
        )));
    }
    if start as usize >= graph.len() {
        return Err(IndexError::OutOfBounds {
            index: start as usize,
            len: graph.len(),
        });
    }
    Ok(())
}

/// Search for the `k` approximate nearest neighbors of `query`.
pub fn beam_search<P: PointSet + ?Sized>(
    graph: &Graph,
    points: &P,
    query: &[f32],
    start: u32,
    params: &QueryParams,
) -> Result<SearchResult> {
    params.validate()?;
    check_inputs(graph, points, start)?;
    if query.len() != points.dimension() {
        return Err(IndexError::DimensionMismatch {
            expected: points.dimension(),
            actual: query.len(),
        });
    }
    Ok(run_query(graph, points, query, start, params))
}

fn run_query<P: PointSet + ?Sized>(
    graph: &Graph,
    points: &P,
    query: &[f32],
    start: u32,
    params: &QueryParams,
) -> SearchResult {
    let beam = traverse(
        graph,
        points,
        query,
        start,
        params.beam_size,
        params.cut,
        params.limit,
        params.degree_limit,
    );
    SearchResult {
        neighbors: beam
            .frontier
            .iter()
            .take(params.k)
            .map(|c| (c.id, c.dist))
            .collect(),
        stats: beam.stats,
    }
}

/// Run every query of `queries` in parallel.
///
/// Results come back in query order.
pub fn search_batch<P, Q>(
    graph: &Graph,
    points: &P,
    queries: &Q,
    start: u32,
    params: &QueryParams,
) -> Result<Vec<SearchResult>>
where
    P: PointSet + ?Sized,
    Q: PointSet + ?Sized,
{
    params.validate()?;
    check_inputs(graph, points, start)?;
    if queries.dimension() != points.dimension() {
        return Err(IndexError::DimensionMismatch {
            expected: points.dimension(),
            actual: queries.dimension(),
        });
    }
    Ok((0..queries.len() as u32)
        .into_par_iter()
        .map(|q| run_query(graph, points, queries.vector(q), start, params))
        .collect())
}
