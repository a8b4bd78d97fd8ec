//! vamana: a Vamana proximity-graph index for approximate nearest neighbor
//! search.
//!
//! The crate is organized around a borrowed point set and a fixed-degree
//! graph arena:
//!
//! - `points/`: the [`PointSet`] capability and [`PointRange`], a borrowed
//!   row-major buffer paired with a metric
//! - `graph/`: [`Graph`], the `n * (R + 1)` adjacency arena, plus its binary
//!   load/save
//! - `vamana/`: graph construction (robust pruning, multi-pass batched builds)
//! - `search/`: beam search over a built graph
//! - `benchmark/`: recall, ground truth, vector files, build and query stats
//!
//! # Critical Nuances
//!
//! ## Distances are not metric distances
//!
//! Euclidean distances are **squared** L2 (monotone in the true distance, so
//! rankings are unaffected, but reported values are squares). Inner product
//! "distances" are negated dot products and can be negative. Normalize vectors
//! first if inner product should behave like cosine similarity.
//!
//! ## Alpha
//!
//! `alpha = 1.0` prunes hardest and gives the sparsest graph. Larger values
//! keep longer "shortcut" edges, trading memory and build time for shorter
//! search paths. Builds use `alpha = 1.0` for every pass but the last.
//!
//! # Example
//!
//! ```
//! use vamana::benchmark::create_benchmark_dataset;
//! use vamana::distance::Euclidean;
//! use vamana::search::{search_batch, QueryParams};
//! use vamana::vamana::{build_index, BuildParams};
//!
//! let data = create_benchmark_dataset(500, 4, 8, 42)?;
//! let points = data.base.as_points(Euclidean)?;
//! let queries = data.queries.as_points(Euclidean)?;
//!
//! let (graph, outcome) = build_index(&points, BuildParams::new(16, 32, 1.2, 2))?;
//! let params = QueryParams { cut: f32::INFINITY, ..QueryParams::new(5, 20) };
//! let results = search_batch(&graph, &points, &queries, outcome.start, &params)?;
//! assert_eq!(results.len(), 4);
//! assert!(results.iter().all(|r| r.neighbors.len() == 5));
//! # Ok::<(), vamana::IndexError>(())
//! ```

pub mod benchmark;
pub mod distance;
pub mod error;
pub mod graph;
pub mod points;
pub mod search;
pub mod simd;
pub mod vamana;

pub use distance::{DistanceMetric, Euclidean, InnerProduct, Metric};
pub use error::{IndexError, Result};
pub use graph::{EdgeRange, EdgeRangeMut, Graph};
pub use points::{PointRange, PointSet};
pub use search::{beam_search, search_batch, QueryParams, SearchResult, SearchStats};
pub use vamana::{build_index, BuildOutcome, BuildParams, VamanaBuilder};
