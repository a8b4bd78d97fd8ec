//! Exact nearest neighbors of a query batch, as stored on disk.
//!
//! Layout (little-endian):
//!
//! ```text
//! [count: u32][per_query: u32]
//! [count * per_query neighbor ids: u32]
//! [count * per_query distances: f32]
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::info;

use crate::error::{IndexError, Result};
use crate::graph::io::{read_f32s, read_u32s, write_f32s, write_u32s};

/// True neighbors (and their distances) for every query of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruth {
    ids: Vec<u32>,
    distances: Vec<f32>,
    count: usize,
    per_query: usize,
}

impl GroundTruth {
    /// Wrap row-major `count x per_query` ids and distances.
    pub fn new(ids: Vec<u32>, distances: Vec<f32>, count: usize, per_query: usize) -> Result<Self> {
        let expected = count.checked_mul(per_query).ok_or_else(|| {
            IndexError::InvalidParameter(format!("{count} x {per_query} ground truth overflows"))
        })?;
        if ids.len() != expected || distances.len() != expected {
            return Err(IndexError::Format(format!(
                "ground truth expects {expected} entries, got {} ids and {} distances",
                ids.len(),
                distances.len()
            )));
        }
        Ok(Self {
            ids,
            distances,
            count,
            per_query,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let gt = Self::read_from(&mut BufReader::new(file))?;
        info!(
            path = %path.display(),
            queries = gt.len(),
            per_query = gt.results_per_query(),
            "loaded ground truth"
        );
        Ok(gt)
    }

    /// Read a complete ground-truth table. Truncated input or trailing bytes
    /// are format errors; nothing partial is returned.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let header = read_u32s(reader, 2, "ground truth header")?;
        let (count, per_query) = (header[0] as usize, header[1] as usize);
        let total = count.checked_mul(per_query).ok_or_else(|| {
            IndexError::Format(format!("{count} x {per_query} ground truth overflows"))
        })?;
        let ids = read_u32s(reader, total, "ground truth ids")?;
        let distances = read_f32s(reader, total, "ground truth distances")?;

        let mut probe = [0u8; 1];
        if reader.read(&mut probe)? != 0 {
            return Err(IndexError::Format(
                "ground truth: unexpected trailing bytes".to_string(),
            ));
        }
        Self::new(ids, distances, count, per_query)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let header = [to_u32(self.count)?, to_u32(self.per_query)?];
        write_u32s(writer, &header)?;
        write_u32s(writer, &self.ids)?;
        write_f32s(writer, &self.distances)
    }

    /// Number of queries.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn results_per_query(&self) -> usize {
        self.per_query
    }

    /// True neighbor ids of query `i`, nearest first.
    pub fn neighbors(&self, i: usize) -> &[u32] {
        &self.ids[i * self.per_query..(i + 1) * self.per_query]
    }

    pub fn distances(&self, i: usize) -> &[f32] {
        &self.distances[i * self.per_query..(i + 1) * self.per_query]
    }
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        IndexError::InvalidParameter(format!("{value} does not fit the 32-bit file header"))
    })
}
