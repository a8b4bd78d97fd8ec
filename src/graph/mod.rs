//! Fixed-degree adjacency store.
//!
//! All neighbor lists live in one preallocated arena of `n * (R + 1)` slots.
//! Row `i` starts at `i * (R + 1)`; its first slot holds the current degree and
//! the next `R` slots hold neighbor ids. Nothing is ever reallocated after
//! [`Graph::new`], and no row can grow past `R`: every mutator checks the bound
//! before it writes.
//!
//! Views ([`EdgeRange`], [`EdgeRangeMut`]) are plain borrows of one row. During
//! a parallel build the builder asks for a set of disjoint mutable rows with
//! [`Graph::rows_mut`], which hands out non-overlapping `&mut` slices of the
//! arena so that each row has exactly one writer.

pub(crate) mod io;

use crate::error::{IndexError, Result};

/// Compact adjacency graph with a fixed max degree.
///
/// Equality compares `(len, max_degree)` and each row's live neighbors; slots
/// past a row's degree are not part of the graph.
#[derive(Debug, Clone)]
pub struct Graph {
    len: usize,
    max_degree: usize,
    slots: Vec<u32>,
}

impl Graph {
    /// Allocate a zeroed graph of `len` nodes, each with room for `max_degree`
    /// neighbors.
    pub fn new(max_degree: usize, len: usize) -> Result<Self> {
        if len > u32::MAX as usize || max_degree > u32::MAX as usize {
            return Err(IndexError::InvalidParameter(format!(
                "graph of {len} nodes with max degree {max_degree} exceeds 32-bit ids"
            )));
        }
        let count = len.checked_mul(max_degree + 1).ok_or_else(|| {
            IndexError::Allocation(format!("{len} x {} slots overflow usize", max_degree + 1))
        })?;

        let mut slots = Vec::new();
        slots.try_reserve_exact(count).map_err(|e| {
            IndexError::Allocation(format!(
                "cannot allocate {count} slots for {len} nodes: {e}"
            ))
        })?;
        slots.resize(count, 0);

        Ok(Self {
            len,
            max_degree,
            slots,
        })
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of neighbors per node (R).
    #[inline]
    pub fn max_degree(&self) -> usize {
        self.max_degree
    }

    #[inline]
    fn stride(&self) -> usize {
        self.max_degree + 1
    }

    #[inline]
    fn row(&self, node: usize) -> &[u32] {
        let start = node * self.stride();
        &self.slots[start..start + self.stride()]
    }

    /// Neighbor view of `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node >= len()`. Use [`Graph::get`] for a checked lookup.
    #[inline]
    pub fn neighbors(&self, node: u32) -> EdgeRange<'_> {
        assert!(
            (node as usize) < self.len,
            "graph index out of range: {node} (len {})",
            self.len
        );
        EdgeRange {
            id: node,
            row: self.row(node as usize),
        }
    }

    /// Checked neighbor view.
    pub fn get(&self, node: u32) -> Option<EdgeRange<'_>> {
        ((node as usize) < self.len).then(|| EdgeRange {
            id: node,
            row: self.row(node as usize),
        })
    }

    /// Current degree of `node`.
    #[inline]
    pub fn degree(&self, node: u32) -> usize {
        self.neighbors(node).len()
    }

    /// Mutable neighbor view of a single node.
    pub fn neighbors_mut(&mut self, node: u32) -> Result<EdgeRangeMut<'_>> {
        let idx = node as usize;
        if idx >= self.len {
            return Err(IndexError::OutOfBounds {
                index: idx,
                len: self.len,
            });
        }
        let stride = self.stride();
        let start = idx * stride;
        Ok(EdgeRangeMut {
            id: node,
            row: &mut self.slots[start..start + stride],
        })
    }

    /// Disjoint mutable views of several rows at once.
    ///
    /// `nodes` must be strictly increasing; the returned views are in the same
    /// order and can be moved to different threads.
    pub fn rows_mut(&mut self, nodes: &[u32]) -> Result<Vec<EdgeRangeMut<'_>>> {
        if let Some(w) = nodes.windows(2).find(|w| w[0] >= w[1]) {
            return Err(IndexError::InvalidParameter(format!(
                "row ids must be strictly increasing, got {} then {}",
                w[0], w[1]
            )));
        }
        if let Some(&last) = nodes.last() {
            if last as usize >= self.len {
                return Err(IndexError::OutOfBounds {
                    index: last as usize,
                    len: self.len,
                });
            }
        }

        let stride = self.stride();
        let mut rest: &mut [u32] = &mut self.slots;
        let mut consumed = 0usize;
        let mut rows = Vec::with_capacity(nodes.len());
        for &node in nodes {
            let start = node as usize * stride;
            let (_, tail) = std::mem::take(&mut rest).split_at_mut(start - consumed);
            let (row, tail) = tail.split_at_mut(stride);
            rows.push(EdgeRangeMut { id: node, row });
            rest = tail;
            consumed = start + stride;
        }
        Ok(rows)
    }

    /// Iterate over every node's neighbor view in id order.
    pub fn iter(&self) -> impl Iterator<Item = EdgeRange<'_>> + '_ {
        self.slots
            .chunks_exact(self.stride())
            .enumerate()
            .map(|(i, row)| EdgeRange { id: i as u32, row })
    }

    /// Total number of directed edges.
    pub fn num_edges(&self) -> usize {
        self.iter().map(|r| r.len()).sum()
    }

    /// Verify the structural invariants of a completed graph: every degree is
    /// within `R`, every id is a valid node and no list holds duplicates.
    pub fn check_invariants(&self) -> Result<()> {
        let mut seen = Vec::with_capacity(self.max_degree);
        for range in self.iter() {
            let degree = range.row[0] as usize;
            if degree > self.max_degree {
                return Err(IndexError::DegreeOverflow {
                    node: range.id,
                    degree,
                    max_degree: self.max_degree,
                });
            }
            seen.clear();
            seen.extend_from_slice(range.as_slice());
            if let Some(&bad) = seen.iter().find(|&&v| v as usize >= self.len) {
                return Err(IndexError::OutOfBounds {
                    index: bad as usize,
                    len: self.len,
                });
            }
            seen.sort_unstable();
            if seen.windows(2).any(|w| w[0] == w[1]) {
                return Err(IndexError::Format(format!(
                    "node {} has duplicate neighbors",
                    range.id
                )));
            }
        }
        Ok(())
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len
            && self.max_degree == other.max_degree
            && self
                .iter()
                .zip(other.iter())
                .all(|(a, b)| a.as_slice() == b.as_slice())
    }
}

impl Eq for Graph {}

/// Read-only view of one node's neighbor list.
#[derive(Debug, Clone, Copy)]
pub struct EdgeRange<'a> {
    id: u32,
    row: &'a [u32],
}

impl<'a> EdgeRange<'a> {
    /// The node this list belongs to.
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Current degree.
    #[inline]
    pub fn len(&self) -> usize {
        self.row[0] as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.row[0] == 0
    }

    /// Neighbor at position `j`, if `j < len()`.
    #[inline]
    pub fn get(&self, j: usize) -> Option<u32> {
        self.as_slice().get(j).copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &'a [u32] {
        &self.row[1..1 + self.len()]
    }

    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'a, u32>> {
        self.as_slice().iter().copied()
    }

    pub fn contains(&self, node: u32) -> bool {
        self.as_slice().contains(&node)
    }
}

impl<'a> IntoIterator for EdgeRange<'a> {
    type Item = u32;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, u32>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Mutable view of one node's neighbor list.
#[derive(Debug)]
pub struct EdgeRangeMut<'a> {
    id: u32,
    row: &'a mut [u32],
}

impl EdgeRangeMut<'_> {
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.row[0] as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.row[0] == 0
    }

    #[inline]
    pub fn max_degree(&self) -> usize {
        self.row.len() - 1
    }

    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.row[1..1 + self.len()]
    }

    pub fn contains(&self, node: u32) -> bool {
        self.as_slice().contains(&node)
    }

    /// Append one neighbor; fails without writing if the row is full.
    pub fn append(&mut self, neighbor: u32) -> Result<()> {
        let degree = self.len();
        if degree == self.max_degree() {
            return Err(IndexError::DegreeOverflow {
                node: self.id,
                degree: degree + 1,
                max_degree: self.max_degree(),
            });
        }
        self.row[degree + 1] = neighbor;
        self.row[0] += 1;
        Ok(())
    }

    /// Replace the whole list; fails without writing if `neighbors` is longer
    /// than the max degree.
    pub fn replace(&mut self, neighbors: &[u32]) -> Result<()> {
        if neighbors.len() > self.max_degree() {
            return Err(IndexError::DegreeOverflow {
                node: self.id,
                degree: neighbors.len(),
                max_degree: self.max_degree(),
            });
        }
        self.row[1..1 + neighbors.len()].copy_from_slice(neighbors);
        self.row[0] = neighbors.len() as u32;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.row[0] = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_graph_is_empty_rows() {
        let g = Graph::new(4, 10).unwrap();
        assert_eq!(g.len(), 10);
        assert_eq!(g.max_degree(), 4);
        assert!(g.iter().all(|r| r.is_empty()));
        assert_eq!(g.num_edges(), 0);
    }

    #[test]
    fn append_respects_max_degree() {
        let mut g = Graph::new(2, 3).unwrap();
        let mut row = g.neighbors_mut(0).unwrap();
        row.append(1).unwrap();
        row.append(2).unwrap();
        let err = row.append(1).unwrap_err();
        assert!(matches!(
            err,
            IndexError::DegreeOverflow { node: 0, degree: 3, max_degree: 2 }
        ));
        assert_eq!(g.neighbors(0).as_slice(), &[1, 2]);
    }

    #[test]
    fn replace_and_clear() {
        let mut g = Graph::new(3, 4).unwrap();
        {
            let mut row = g.neighbors_mut(2).unwrap();
            row.replace(&[0, 1, 3]).unwrap();
            assert!(row.replace(&[0, 1, 3, 3]).is_err());
            assert_eq!(row.as_slice(), &[0, 1, 3]);
        }
        assert_eq!(g.degree(2), 3);
        assert_eq!(g.neighbors(2).get(1), Some(1));
        assert_eq!(g.neighbors(2).get(3), None);
        g.neighbors_mut(2).unwrap().clear();
        assert!(g.neighbors(2).is_empty());
    }

    #[test]
    fn out_of_range_access_is_reported() {
        let mut g = Graph::new(2, 3).unwrap();
        assert!(g.get(3).is_none());
        assert!(matches!(
            g.neighbors_mut(3),
            Err(IndexError::OutOfBounds { index: 3, len: 3 })
        ));
    }

    #[test]
    fn rows_mut_hands_out_disjoint_rows() {
        let mut g = Graph::new(2, 6).unwrap();
        {
            let mut rows = g.rows_mut(&[1, 2, 5]).unwrap();
            for row in rows.iter_mut() {
                let id = row.id();
                row.append(id).unwrap();
            }
        }
        assert_eq!(g.neighbors(1).as_slice(), &[1]);
        assert_eq!(g.neighbors(2).as_slice(), &[2]);
        assert_eq!(g.neighbors(5).as_slice(), &[5]);
        assert!(g.neighbors(0).is_empty());

        assert!(g.rows_mut(&[2, 2]).is_err());
        assert!(g.rows_mut(&[3, 1]).is_err());
        assert!(g.rows_mut(&[6]).is_err());
    }

    #[test]
    fn check_invariants_flags_duplicates() {
        let mut g = Graph::new(3, 3).unwrap();
        g.neighbors_mut(0).unwrap().replace(&[1, 2]).unwrap();
        assert!(g.check_invariants().is_ok());
        g.neighbors_mut(1).unwrap().replace(&[0, 0]).unwrap();
        assert!(g.check_invariants().is_err());
    }

    #[test]
    fn equality_ignores_slots_past_the_degree() {
        let mut shrunk = Graph::new(3, 2).unwrap();
        shrunk.neighbors_mut(0).unwrap().replace(&[1, 0, 1]).unwrap();
        shrunk.neighbors_mut(0).unwrap().replace(&[1]).unwrap();
        let mut fresh = Graph::new(3, 2).unwrap();
        fresh.neighbors_mut(0).unwrap().replace(&[1]).unwrap();
        assert_eq!(shrunk, fresh);

        let mut bytes = Vec::new();
        shrunk.write_to(&mut bytes).unwrap();
        assert_eq!(Graph::read_from(&mut bytes.as_slice()).unwrap(), shrunk);

        fresh.neighbors_mut(1).unwrap().append(0).unwrap();
        assert_ne!(shrunk, fresh);
        assert_ne!(Graph::new(3, 2).unwrap(), Graph::new(2, 2).unwrap());
    }
}
