//! Robust pruning (alpha-pruning).
//!
//! Selects neighbors that are close to `node` but not redundant with each
//! other: once `c` is kept, any remaining `q` with
//! `alpha * d(c, q) <= d(node, q)` is considered reachable through `c` and
//! dropped.
//!
//! Inner product distances can be negative, where plain multiplication would
//! make a larger `alpha` prune harder. The slack is applied as
//! `d + (alpha - 1) * |d|` instead, which equals `alpha * d` for non-negative
//! distances and loosens the test for either sign.

use smallvec::SmallVec;

use crate::points::PointSet;
use crate::search::Candidate;

/// Pruned neighbor list. Sized for typical degrees; spills to the heap above.
pub type Neighbors = SmallVec<[u32; 64]>;

/// Run robust pruning for `node` over `candidates`.
///
/// Duplicates and `node` itself are ignored. Returns the kept ids (at most
/// `max_degree`, closest first) and the number of distance evaluations spent.
pub fn robust_prune<P, I>(
    points: &P,
    node: u32,
    candidates: I,
    alpha: f32,
    max_degree: usize,
) -> (Neighbors, usize)
where
    P: PointSet + ?Sized,
    I: IntoIterator<Item = u32>,
{
    let anchor = points.vector(node);

    let mut ids: Vec<u32> = candidates.into_iter().filter(|&c| c != node).collect();
    ids.sort_unstable();
    ids.dedup();

    let mut pool: Vec<Candidate> = ids
        .into_iter()
        .map(|id| Candidate {
            id,
            dist: points.distance_to(anchor, id),
        })
        .collect();
    let mut comps = pool.len();
    pool.sort_unstable();

    let mut kept = Neighbors::new();
    let mut pruned = vec![false; pool.len()];

    for i in 0..pool.len() {
        if kept.len() >= max_degree {
            break;
        }
        if pruned[i] {
            continue;
        }
        let chosen = pool[i];
        kept.push(chosen.id);

        let chosen_vec = points.vector(chosen.id);
        for j in (i + 1)..pool.len() {
            if pruned[j] {
                continue;
            }
            let covered = points.distance_to(chosen_vec, pool[j].id);
            comps += 1;
            if relaxed(covered, alpha) <= pool[j].dist {
                pruned[j] = true;
            }
        }
    }

    (kept, comps)
}

#[inline]
fn relaxed(dist: f32, alpha: f32) -> f32 {
    dist + (alpha - 1.0) * dist.abs()
}
