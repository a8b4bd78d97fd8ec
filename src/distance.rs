//! Distance metrics for dense vectors.
//!
//! Every metric is exposed as a *distance*: smaller means closer. Inner
//! product search (MIPS) is expressed by negating the dot product, so the
//! graph code never needs to know which direction "better" points in.
//!
//! ## Important nuance
//!
//! Euclidean distance is computed **squared**. Pruning compares
//! `alpha * d(c, q)` against `d(p, q)` on these squared values, so an
//! `alpha` here acts like `sqrt(alpha)` would on true distances.

use std::fmt;
use std::str::FromStr;

use crate::error::IndexError;
use crate::simd;

/// A distance function over two equal-length vectors.
pub trait Metric: Copy + Send + Sync + 'static {
    /// Distance between `a` and `b`; smaller is closer.
    fn distance(&self, a: &[f32], b: &[f32]) -> f32;

    /// The selector this metric corresponds to.
    fn kind(&self) -> DistanceMetric;
}

/// Squared Euclidean distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Euclidean;

impl Metric for Euclidean {
    #[inline]
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        simd::l2_distance_squared(a, b)
    }

    fn kind(&self) -> DistanceMetric {
        DistanceMetric::Euclidean
    }
}

/// Negative inner product, for maximum inner product search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InnerProduct;

impl Metric for InnerProduct {
    #[inline]
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        -simd::dot(a, b)
    }

    fn kind(&self) -> DistanceMetric {
        DistanceMetric::InnerProduct
    }
}

/// Runtime selector for a metric, as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    /// Squared Euclidean (L2) distance.
    Euclidean,
    /// Inner product distance $-\langle a,b\rangle$.
    InnerProduct,
}

impl DistanceMetric {
    /// Compute the distance between two vectors with this metric.
    #[inline]
    #[must_use]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Euclidean => Euclidean.distance(a, b),
            DistanceMetric::InnerProduct => InnerProduct.distance(a, b),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "euclidian" | "euclidean" | "l2" => Ok(DistanceMetric::Euclidean),
            "mips" | "inner-product" | "inner_product" | "ip" => Ok(DistanceMetric::InnerProduct),
            _ => Err(IndexError::UnknownMetric(s.to_string())),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMetric::Euclidean => write!(f, "Euclidian"),
            DistanceMetric::InnerProduct => write!(f, "mips"),
        }
    }
}

/// Normalize a vector to unit L2 norm in place.
///
/// Zero vectors are left untouched and reported as `false`.
#[inline]
pub fn normalize_in_place(v: &mut [f32]) -> bool {
    let n = simd::norm(v);
    if n == 0.0 || !n.is_finite() {
        return false;
    }
    for x in v.iter_mut() {
        *x /= n;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_line_names() {
        assert_eq!("Euclidian".parse::<DistanceMetric>().unwrap(), DistanceMetric::Euclidean);
        assert_eq!("mips".parse::<DistanceMetric>().unwrap(), DistanceMetric::InnerProduct);
        assert_eq!(
            "inner-product".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::InnerProduct
        );
        assert!(matches!(
            "hamming".parse::<DistanceMetric>(),
            Err(IndexError::UnknownMetric(name)) if name == "hamming"
        ));
    }

    #[test]
    fn inner_product_is_smaller_for_more_similar() {
        let q = [1.0_f32, 0.0];
        let close = [0.9_f32, 0.1];
        let far = [0.1_f32, 0.9];
        assert!(InnerProduct.distance(&q, &close) < InnerProduct.distance(&q, &far));
    }

    #[test]
    fn normalize_unit_and_zero() {
        let mut v = [3.0_f32, 4.0];
        assert!(normalize_in_place(&mut v));
        assert!((simd::norm(&v) - 1.0).abs() < 1e-6);

        let mut z = [0.0_f32; 4];
        assert!(!normalize_in_place(&mut z));
        assert_eq!(z, [0.0; 4]);
    }
}
