//! Binary persistence for [`Graph`].
//!
//! Format (all integers little-endian `u32`):
//!
//! ```text
//! [n][max_degree]
//! [degree_0] ... [degree_{n-1}]
//! [neighbors of node 0 (degree_0 ids)] ... [neighbors of node n-1]
//! ```
//!
//! Neighbor data is streamed in blocks of nodes so that the staging buffer
//! stays proportional to the block, not to the whole graph. Offsets into the
//! flattened stream come from a prefix sum over the degree array.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use rayon::prelude::*;
use tracing::info;

use super::Graph;
use crate::error::{IndexError, Result};

/// Nodes per streamed block.
pub(crate) const BLOCK_NODES: usize = 1_000_000;

/// Words read per chunk. Output grows only as data actually arrives, so a
/// header that overstates the payload fails at EOF instead of allocating.
const READ_CHUNK_WORDS: usize = 1 << 16;

pub(crate) fn read_u32s<R: Read>(reader: &mut R, count: usize, what: &str) -> Result<Vec<u32>> {
    if count.checked_mul(4).is_none() {
        return Err(IndexError::Format(format!(
            "{what}: {count} words overflow the addressable size"
        )));
    }
    let mut values = Vec::with_capacity(count.min(READ_CHUNK_WORDS));
    let mut bytes = vec![0u8; 4 * count.min(READ_CHUNK_WORDS)];
    let mut remaining = count;
    while remaining > 0 {
        let words = remaining.min(READ_CHUNK_WORDS);
        let chunk = &mut bytes[..4 * words];
        reader
            .read_exact(chunk)
            .map_err(|e| IndexError::from_read(e, what))?;
        values.extend(
            chunk
                .chunks_exact(4)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        );
        remaining -= words;
    }
    Ok(values)
}

pub(crate) fn write_u32s<W: Write>(writer: &mut W, values: &[u32]) -> Result<()> {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    writer.write_all(&bytes)?;
    Ok(())
}

pub(crate) fn read_f32s<R: Read>(reader: &mut R, count: usize, what: &str) -> Result<Vec<f32>> {
    Ok(read_u32s(reader, count, what)?
        .into_iter()
        .map(f32::from_bits)
        .collect())
}

pub(crate) fn write_f32s<W: Write>(writer: &mut W, values: &[f32]) -> Result<()> {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    writer.write_all(&bytes)?;
    Ok(())
}

impl Graph {
    /// Load a graph previously written by [`Graph::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let graph = Self::read_blocks(&mut BufReader::new(file), BLOCK_NODES)?;
        info!(
            path = %path.display(),
            points = graph.len(),
            max_degree = graph.max_degree(),
            "loaded graph"
        );
        Ok(graph)
    }

    /// Read a graph from any byte stream.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        Self::read_blocks(reader, BLOCK_NODES)
    }

    pub(crate) fn read_blocks<R: Read>(reader: &mut R, block_nodes: usize) -> Result<Self> {
        let header = read_u32s(reader, 2, "graph header")?;
        let (n, max_degree) = (header[0] as usize, header[1] as usize);

        let degrees = read_u32s(reader, n, "graph degrees")?;
        if let Some((node, &d)) = degrees
            .iter()
            .enumerate()
            .find(|(_, d)| **d as usize > max_degree)
        {
            return Err(IndexError::Format(format!(
                "node {node} has degree {d} above max degree {max_degree}"
            )));
        }

        let mut offsets = Vec::with_capacity(n + 1);
        let mut total = 0usize;
        offsets.push(0);
        for &d in &degrees {
            total += d as usize;
            offsets.push(total);
        }
        info!(points = n, max_degree, edges = total, "reading graph");

        let mut graph = Graph::new(max_degree, n)?;
        let stride = graph.stride();
        let block_nodes = block_nodes.max(1);

        let mut floor = 0usize;
        while floor < n {
            let ceiling = (floor + block_nodes).min(n);
            let edges = read_u32s(reader, offsets[ceiling] - offsets[floor], "graph edges")?;
            let base = offsets[floor];

            graph.slots[floor * stride..ceiling * stride]
                .par_chunks_mut(stride)
                .enumerate()
                .try_for_each(|(i, row)| {
                    let node = floor + i;
                    let degree = degrees[node] as usize;
                    let start = offsets[node] - base;
                    let src = &edges[start..start + degree];
                    if let Some(&bad) = src.iter().find(|&&v| v as usize >= n) {
                        return Err(IndexError::Format(format!(
                            "node {node} lists neighbor {bad}, graph has {n} nodes"
                        )));
                    }
                    row[0] = degree as u32;
                    row[1..1 + degree].copy_from_slice(src);
                    Ok(())
                })?;

            floor = ceiling;
        }

        Ok(graph)
    }

    /// Write the graph in the binary layout described in the module docs.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        info!(
            path = %path.display(),
            points = self.len(),
            max_degree = self.max_degree(),
            "writing graph"
        );
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_blocks(&mut writer, BLOCK_NODES)?;
        writer.flush()?;
        Ok(())
    }

    /// Write the graph to any byte sink.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.write_blocks(writer, BLOCK_NODES)
    }

    pub(crate) fn write_blocks<W: Write>(&self, writer: &mut W, block_nodes: usize) -> Result<()> {
        write_u32s(writer, &[self.len() as u32, self.max_degree() as u32])?;

        let degrees: Vec<u32> = self.iter().map(|r| r.len() as u32).collect();
        write_u32s(writer, &degrees)?;

        let block_nodes = block_nodes.max(1);
        let mut floor = 0usize;
        let mut flat = Vec::new();
        while floor < self.len() {
            let ceiling = (floor + block_nodes).min(self.len());
            flat.clear();
            for node in floor..ceiling {
                flat.extend_from_slice(self.neighbors(node as u32).as_slice());
            }
            write_u32s(writer, &flat)?;
            floor = ceiling;
        }
        Ok(())
    }
}
