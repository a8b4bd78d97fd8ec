//! Point sets: the vectors a graph is built over and queried against.
//!
//! The core never owns coordinate memory. A [`PointRange`] borrows a flat
//! `n * dimension` buffer owned by whatever loaded it (a file reader, a test,
//! a memory map) and pairs it with a [`Metric`].

use crate::distance::{DistanceMetric, Metric};
use crate::error::{IndexError, Result};

/// Capability consumed by the builder and the search engine.
///
/// Ids are dense `0..len()`. Implementations must be shareable across
/// threads; they are only ever read.
pub trait PointSet: Sync {
    /// Number of points.
    fn len(&self) -> usize;

    /// Shared dimensionality of every point.
    fn dimension(&self) -> usize;

    /// Coordinates of point `id`.
    fn vector(&self, id: u32) -> &[f32];

    /// Distance from an arbitrary query vector to point `id`.
    fn distance_to(&self, query: &[f32], id: u32) -> f32;

    /// Which metric the distances follow.
    fn metric(&self) -> DistanceMetric;

    /// Distance between two points of the set.
    #[inline]
    fn distance(&self, a: u32, b: u32) -> f32 {
        self.distance_to(self.vector(a), b)
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Borrowed, row-major point set.
#[derive(Debug, Clone, Copy)]
pub struct PointRange<'a, M> {
    data: &'a [f32],
    dimension: usize,
    len: usize,
    metric: M,
}

impl<'a, M: Metric> PointRange<'a, M> {
    /// Wrap a flat buffer of `len * dimension` coordinates.
    pub fn new(data: &'a [f32], dimension: usize, metric: M) -> Result<Self> {
        if dimension == 0 {
            return Err(IndexError::InvalidParameter(
                "dimension must be > 0".to_string(),
            ));
        }
        if data.len() % dimension != 0 {
            return Err(IndexError::Format(format!(
                "buffer of {} floats is not a multiple of dimension {}",
                data.len(),
                dimension
            )));
        }
        let len = data.len() / dimension;
        if len > u32::MAX as usize {
            return Err(IndexError::InvalidParameter(format!(
                "{len} points exceed the 32-bit id space"
            )));
        }
        Ok(Self {
            data,
            dimension,
            len,
            metric,
        })
    }

    /// Checked access to a point's coordinates.
    pub fn get(&self, id: u32) -> Option<&'a [f32]> {
        let start = (id as usize).checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// Iterate over all points in id order.
    pub fn iter(&self) -> impl Iterator<Item = &'a [f32]> + '_ {
        self.data.chunks_exact(self.dimension)
    }

    pub fn as_flat(&self) -> &'a [f32] {
        self.data
    }

    pub fn metric_impl(&self) -> M {
        self.metric
    }
}

impl<M: Metric> PointSet for PointRange<'_, M> {
    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn vector(&self, id: u32) -> &[f32] {
        let start = id as usize * self.dimension;
        &self.data[start..start + self.dimension]
    }

    #[inline]
    fn distance_to(&self, query: &[f32], id: u32) -> f32 {
        self.metric.distance(query, self.vector(id))
    }

    fn metric(&self) -> DistanceMetric {
        self.metric.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Euclidean;

    #[test]
    fn rejects_ragged_buffer() {
        let data = [0.0_f32; 7];
        assert!(matches!(
            PointRange::new(&data, 2, Euclidean),
            Err(IndexError::Format(_))
        ));
        assert!(PointRange::new(&data, 0, Euclidean).is_err());
    }

    #[test]
    fn distances_between_points() {
        let data = [0.0_f32, 0.0, 3.0, 4.0];
        let points = PointRange::new(&data, 2, Euclidean).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points.distance(0, 1), 25.0);
        assert_eq!(points.get(1), Some(&data[2..4]));
        assert_eq!(points.get(2), None);
    }
}
