//! Vamana graph construction.
//!
//! Vamana builds a bounded-degree proximity graph that greedy beam search can
//! navigate from a single entry point (the medoid).
//!
//! # Algorithm
//!
//! 1. Start from an empty graph with maximum out-degree `R`.
//! 2. For each pass, visit the points in a seeded random order. Each point
//!    searches the current graph (pool bound `L`), then keeps a diverse
//!    subset of what it saw via [`robust_prune`].
//! 3. Every kept edge `p -> q` also offers `q -> p`; a target whose list would
//!    exceed `R` is re-pruned instead.
//! 4. Passes before the last use `alpha = 1.0`; the last uses the configured
//!    `alpha`, which keeps some longer edges and shortens search paths.
//!
//! Insertions run in parallel batches. Batch sizes double from 1 up to a small
//! fraction of `n`, so early points see a connected graph.
//!
//! # Usage
//!
//! ```
//! use vamana::distance::Euclidean;
//! use vamana::points::PointRange;
//! use vamana::search::{beam_search, QueryParams};
//! use vamana::vamana::{BuildParams, VamanaBuilder};
//!
//! let data: Vec<f32> = (0..64).map(|i| i as f32).collect();
//! let points = PointRange::new(&data, 2, Euclidean)?;
//! let (graph, outcome) = VamanaBuilder::new(&points, BuildParams::new(8, 16, 1.2, 2))?.build()?;
//!
//! let result = beam_search(&graph, &points, &[10.0, 11.0], outcome.start, &QueryParams::new(1, 8))?;
//! assert_eq!(result.ids(), vec![5]);
//! # Ok::<(), vamana::IndexError>(())
//! ```
//!
//! # References
//!
//! - Subramanya et al. (2019): "DiskANN: Fast accurate billion-point nearest neighbor search"

mod build;
mod params;
mod prune;

pub use build::{find_medoid, BuildOutcome, VamanaBuilder};
pub use params::BuildParams;
pub use prune::{robust_prune, Neighbors};

use crate::error::Result;
use crate::graph::Graph;
use crate::points::PointSet;

/// Build a graph over `points` in one call.
pub fn build_index<P: PointSet + ?Sized>(
    points: &P,
    params: BuildParams,
) -> Result<(Graph, BuildOutcome)> {
    VamanaBuilder::new(points, params)?.build()
}
