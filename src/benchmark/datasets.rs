//! Vector files, synthetic datasets and exact ground truth.
//!
//! Vector files use the `.fbin` layout (little-endian):
//!
//! ```text
//! [n: u32][dimension: u32][n * dimension f32, row-major]
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{info, warn};

use super::ground_truth::GroundTruth;
use crate::distance::{normalize_in_place, Metric};
use crate::error::{IndexError, Result};
use crate::graph::io::{read_f32s, read_u32s, write_f32s, write_u32s};
use crate::points::{PointRange, PointSet};

/// Owned row-major vectors, the loader side of a [`PointRange`].
#[derive(Debug, Clone, PartialEq)]
pub struct Vectors {
    data: Vec<f32>,
    dimension: usize,
}

impl Vectors {
    pub fn new(data: Vec<f32>, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(IndexError::InvalidParameter(
                "dimension must be > 0".to_string(),
            ));
        }
        if data.len() % dimension != 0 {
            return Err(IndexError::Format(format!(
                "{} floats do not divide into rows of {dimension}",
                data.len()
            )));
        }
        Ok(Self { data, dimension })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let vectors = Self::read_from(&mut BufReader::new(file))?;
        info!(
            path = %path.display(),
            points = vectors.len(),
            dimension = vectors.dimension(),
            "loaded vectors"
        );
        Ok(vectors)
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let header = read_u32s(reader, 2, "vector header")?;
        let (n, dimension) = (header[0] as usize, header[1] as usize);
        let total = n.checked_mul(dimension).ok_or_else(|| {
            IndexError::Format(format!("{n} x {dimension} vectors overflow"))
        })?;
        let data = read_f32s(reader, total, "vector data")?;
        Self::new(data, dimension)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let n = u32::try_from(self.len())
            .map_err(|_| IndexError::InvalidParameter("too many vectors".to_string()))?;
        let d = u32::try_from(self.dimension)
            .map_err(|_| IndexError::InvalidParameter("dimension too large".to_string()))?;
        write_u32s(writer, &[n, d])?;
        write_f32s(writer, &self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn get(&self, i: usize) -> &[f32] {
        &self.data[i * self.dimension..(i + 1) * self.dimension]
    }

    pub fn iter(&self) -> std::slice::ChunksExact<'_, f32> {
        self.data.chunks_exact(self.dimension)
    }

    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    /// Scale every row to unit length. Zero rows are left alone; their count
    /// is returned (and logged).
    pub fn normalize(&mut self) -> usize {
        let zero = self
            .data
            .par_chunks_mut(self.dimension)
            .map(|row| usize::from(!normalize_in_place(row)))
            .sum::<usize>();
        if zero > 0 {
            warn!(zero, "vectors with zero norm left unnormalized");
        }
        zero
    }

    /// Borrow as a point set under `metric`.
    pub fn as_points<M: Metric>(&self, metric: M) -> Result<PointRange<'_, M>> {
        PointRange::new(&self.data, self.dimension, metric)
    }
}

/// Base vectors plus queries drawn from the same distribution.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub base: Vectors,
    pub queries: Vectors,
}

/// Vectors uniformly distributed in [0, 1]^d.
pub fn random_vectors(n: usize, dimension: usize, seed: u64) -> Result<Vectors> {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..n * dimension).map(|_| rng.random::<f32>()).collect();
    Vectors::new(data, dimension)
}

/// A uniform dataset: `n_base` points to index and `n_queries` to ask.
pub fn create_benchmark_dataset(
    n_base: usize,
    n_queries: usize,
    dimension: usize,
    seed: u64,
) -> Result<Dataset> {
    Ok(Dataset {
        base: random_vectors(n_base, dimension, seed)?,
        queries: random_vectors(n_queries, dimension, seed.wrapping_add(1))?,
    })
}

/// Gaussian clusters around `n_clusters` uniform centers (Box-Muller noise).
pub fn create_clustered_dataset(
    n_base: usize,
    n_queries: usize,
    dimension: usize,
    n_clusters: usize,
    cluster_std: f32,
    seed: u64,
) -> Result<Dataset> {
    if n_clusters == 0 {
        return Err(IndexError::InvalidParameter(
            "need at least one cluster".to_string(),
        ));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let centers: Vec<Vec<f32>> = (0..n_clusters)
        .map(|_| (0..dimension).map(|_| rng.random::<f32>()).collect())
        .collect();

    let mut sample = |count: usize| -> Vec<f32> {
        let mut out = Vec::with_capacity(count * dimension);
        for _ in 0..count {
            let center = &centers[rng.random_range(0..n_clusters)];
            for &c in center {
                let u1: f32 = rng.random::<f32>().max(f32::MIN_POSITIVE);
                let u2: f32 = rng.random();
                let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
                out.push(c + z * cluster_std);
            }
        }
        out
    };
    let base = sample(n_base);
    let queries = sample(n_queries);
    Ok(Dataset {
        base: Vectors::new(base, dimension)?,
        queries: Vectors::new(queries, dimension)?,
    })
}

/// Exact `k` nearest base points of every query, by brute force.
///
/// Ties are broken by smaller id, matching the search engine's ordering.
pub fn compute_ground_truth<P: PointSet + ?Sized>(
    base: &P,
    queries: &Vectors,
    k: usize,
) -> Result<GroundTruth> {
    if queries.dimension() != base.dimension() {
        return Err(IndexError::DimensionMismatch {
            expected: base.dimension(),
            actual: queries.dimension(),
        });
    }
    if k == 0 || k > base.len() {
        return Err(IndexError::InvalidParameter(format!(
            "k = {k} must be in 1..={}",
            base.len()
        )));
    }

    let rows: Vec<Vec<(u32, f32)>> = (0..queries.len())
        .into_par_iter()
        .map(|q| {
            let query = queries.get(q);
            let mut all: Vec<(u32, f32)> = (0..base.len() as u32)
                .map(|id| (id, base.distance_to(query, id)))
                .collect();
            let by_dist = |a: &(u32, f32), b: &(u32, f32)| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0));
            if k < all.len() {
                all.select_nth_unstable_by(k - 1, by_dist);
                all.truncate(k);
            }
            all.sort_unstable_by(by_dist);
            all
        })
        .collect();

    let ids = rows.iter().flatten().map(|&(id, _)| id).collect();
    let distances = rows.iter().flatten().map(|&(_, d)| d).collect();
    GroundTruth::new(ids, distances, queries.len(), k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{Euclidean, InnerProduct};

    #[test]
    fn fbin_layout() {
        let v = Vectors::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3).unwrap();
        let mut buf = Vec::new();
        v.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 8 + 6 * 4);
        assert_eq!(&buf[0..4], &2u32.to_le_bytes());
        assert_eq!(&buf[4..8], &3u32.to_le_bytes());
        assert_eq!(&buf[8..12], &1.0f32.to_le_bytes());
        assert_eq!(Vectors::read_from(&mut buf.as_slice()).unwrap(), v);

        buf.truncate(20);
        assert!(matches!(
            Vectors::read_from(&mut buf.as_slice()),
            Err(IndexError::Format(_))
        ));
    }

    #[test]
    fn oversized_header_is_a_format_error() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        buf.extend_from_slice(&1.0f32.to_le_bytes());
        assert!(matches!(
            Vectors::read_from(&mut buf.as_slice()),
            Err(IndexError::Format(_))
        ));
    }

    #[test]
    fn normalize_skips_zero_rows() {
        let mut v = Vectors::new(vec![3.0, 4.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(v.normalize(), 1);
        assert!((v.get(0)[0] - 0.6).abs() < 1e-6);
        assert!((v.get(0)[1] - 0.8).abs() < 1e-6);
        assert_eq!(v.get(1), &[0.0, 0.0]);
    }

    #[test]
    fn synthetic_data_is_seeded() {
        let a = create_benchmark_dataset(20, 5, 4, 3).unwrap();
        let b = create_benchmark_dataset(20, 5, 4, 3).unwrap();
        assert_eq!(a.base, b.base);
        assert_eq!(a.base.len(), 20);
        assert_eq!(a.queries.len(), 5);
        assert_ne!(a.base.get(0), a.queries.get(0));

        let c = create_clustered_dataset(30, 3, 8, 4, 0.05, 9).unwrap();
        assert_eq!(c.base.len(), 30);
        assert!(c.base.as_flat().iter().all(|x| x.is_finite()));
    }

    #[test]
    fn brute_force_truth_on_a_line() {
        let base = Vectors::new((0..10).map(|i| i as f32).collect(), 1).unwrap();
        let queries = Vectors::new(vec![2.9, 7.5], 1).unwrap();
        let gt = compute_ground_truth(&base.as_points(Euclidean).unwrap(), &queries, 3).unwrap();
        assert_eq!(gt.neighbors(0), &[3, 2, 4]);
        // 7 and 8 tie at 0.25; smaller id first
        assert_eq!(gt.neighbors(1), &[7, 8, 6]);
        assert!((gt.distances(0)[0] - 0.01).abs() < 1e-5);
    }

    #[test]
    fn brute_force_truth_inner_product() {
        let base = Vectors::new(vec![1.0, 0.0, 0.0, 1.0, 0.7, 0.7], 2).unwrap();
        let queries = Vectors::new(vec![0.0, 1.0], 2).unwrap();
        let gt = compute_ground_truth(&base.as_points(InnerProduct).unwrap(), &queries, 2).unwrap();
        assert_eq!(gt.neighbors(0), &[1, 2]);
    }

    #[test]
    fn brute_force_truth_checks_inputs() {
        let base = Vectors::new(vec![0.0; 6], 2).unwrap();
        let points = base.as_points(Euclidean).unwrap();
        let bad_dim = Vectors::new(vec![0.0; 3], 3).unwrap();
        assert!(matches!(
            compute_ground_truth(&points, &bad_dim, 1),
            Err(IndexError::DimensionMismatch { .. })
        ));
        let q = Vectors::new(vec![0.0; 2], 2).unwrap();
        assert!(compute_ground_truth(&points, &q, 4).is_err());
        assert!(compute_ground_truth(&points, &q, 0).is_err());
    }
}
