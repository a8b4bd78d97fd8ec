//! Small hand-checked builds and queries.

use vamana::distance::Euclidean;
use vamana::points::PointRange;
use vamana::search::{beam_search, QueryParams};
use vamana::vamana::{build_index, BuildParams};
use vamana::Graph;

fn sorted(graph: &Graph, node: u32) -> Vec<u32> {
    let mut ids: Vec<u32> = graph.neighbors(node).iter().collect();
    ids.sort_unstable();
    ids
}

fn collinear() -> Vec<f32> {
    vec![0.0, 1.0, 2.0, 3.0]
}

#[test]
fn collinear_build_links_inner_points_to_both_sides() {
    let data = collinear();
    let points = PointRange::new(&data, 1, Euclidean).unwrap();

    // every seed gives the same adjacency for the inner points
    for seed in 0..16 {
        let params = BuildParams {
            seed,
            ..BuildParams::new(2, 4, 1.0, 1)
        };
        let (graph, outcome) = build_index(&points, params).unwrap();
        graph.check_invariants().unwrap();

        assert_eq!(outcome.start, 1, "medoid of 0..3 is the smaller middle point");
        assert_eq!(sorted(&graph, 1), vec![0, 2], "seed {seed}");
        assert_eq!(sorted(&graph, 2), vec![1, 3], "seed {seed}");
        assert!(graph.degree(0) <= 2 && graph.degree(0) >= 1);
        assert!(graph.degree(3) <= 2 && graph.degree(3) >= 1);
        assert!(graph.neighbors(0).contains(1));
        assert!(graph.neighbors(3).contains(2));
    }
}

#[test]
fn collinear_query_walks_to_the_far_end() {
    let data = collinear();
    let points = PointRange::new(&data, 1, Euclidean).unwrap();
    let (graph, _) = build_index(&points, BuildParams::new(2, 4, 1.0, 1)).unwrap();

    let params = QueryParams::new(1, 4);
    let result = beam_search(&graph, &points, &[2.9], 0, &params).unwrap();
    assert_eq!(result.ids(), vec![3]);
    // squared Euclidean: 0.1^2
    assert!((result.neighbors[0].1 - 0.01).abs() < 1e-5);
    assert!(result.stats.visited <= 4);
}

#[test]
fn visit_budget_can_stop_short() {
    let data = collinear();
    let points = PointRange::new(&data, 1, Euclidean).unwrap();
    let (graph, _) = build_index(&points, BuildParams::new(2, 4, 1.0, 1)).unwrap();

    let params = QueryParams {
        limit: 1,
        ..QueryParams::new(1, 4)
    };
    let result = beam_search(&graph, &points, &[2.9], 0, &params).unwrap();
    assert_eq!(result.stats.visited, 1);
    // only point 0 and its neighbors were scored
    assert_ne!(result.ids(), vec![3]);
}

#[test]
fn extra_passes_keep_the_inner_adjacency() {
    let data = collinear();
    let points = PointRange::new(&data, 1, Euclidean).unwrap();
    let (graph, _) = build_index(&points, BuildParams::new(2, 4, 1.0, 3)).unwrap();
    assert_eq!(sorted(&graph, 1), vec![0, 2]);
    assert_eq!(sorted(&graph, 2), vec![1, 3]);
}
