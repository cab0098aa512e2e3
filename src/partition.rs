//! Partition lists and their padded, weighted form.
//!
//! A partition is a non-empty list of node indices. Pooling gathers all partitions
//! in one batched op, so they are first padded to a common length by repeating
//! each partition's last node. Count weights undo the padding: the repeated tail
//! of a row shares weight 1 between its copies, so weighted sums see every
//! original node exactly as often as it was listed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{PoolingError, Result};

/// Validated list of partitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<usize>>", into = "Vec<Vec<usize>>")]
pub struct Partitions(Vec<Vec<usize>>);

impl Partitions {
    pub fn new(parts: Vec<Vec<usize>>) -> Result<Self> {
        if parts.is_empty() {
            return Err(PoolingError::EmptyPartitions);
        }
        if let Some(index) = parts.iter().position(Vec::is_empty) {
            return Err(PoolingError::EmptyPartition { index });
        }
        Ok(Self(parts))
    }

    /// Groups nodes by cluster label.
    ///
    /// `assignment[node]` is the cluster of `node`. Labels need not be dense;
    /// partitions are numbered in order of first appearance and list their nodes
    /// in ascending order.
    pub fn from_assignment(assignment: &[usize]) -> Result<Self> {
        let mut slot: HashMap<usize, usize> = HashMap::new();
        let mut parts: Vec<Vec<usize>> = Vec::new();
        for (node, &label) in assignment.iter().enumerate() {
            let i = *slot.entry(label).or_insert_with(|| {
                parts.push(Vec::new());
                parts.len() - 1
            });
            parts[i].push(node);
        }
        Self::new(parts)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Vec<usize>] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Vec<usize>> {
        self.0
    }

    /// Largest node index referenced by any partition.
    pub fn max_node(&self) -> usize {
        self.0.iter().flatten().copied().max().unwrap_or(0)
    }

    /// Checks every index against a node axis of length `num_nodes`.
    pub fn check_nodes(&self, num_nodes: usize) -> Result<()> {
        for (partition, part) in self.0.iter().enumerate() {
            if let Some(&node) = part.iter().find(|&&n| n >= num_nodes) {
                return Err(PoolingError::NodeOutOfRange {
                    partition,
                    node,
                    num_nodes,
                });
            }
        }
        Ok(())
    }

    /// Pads every partition to the longest length and builds the count weights.
    pub fn adjust(&self) -> AdjustedPartitions {
        let num_partitions = self.0.len();
        let max_len = self.0.iter().map(Vec::len).max().unwrap_or(0);

        let mut indices = Vec::with_capacity(num_partitions * max_len);
        let mut count_weights = Vec::with_capacity(num_partitions * max_len);
        let mut sizes = Vec::with_capacity(num_partitions);
        let lens = self.0.iter().map(Vec::len).collect();

        for part in &self.0 {
            // Non-empty by construction.
            let last = part[part.len() - 1];
            let pad = max_len - part.len();
            let tail_weight = 1.0 / (pad + 1) as f32;

            indices.extend_from_slice(part);
            indices.extend(std::iter::repeat(last).take(pad));

            let row_start = count_weights.len();
            count_weights.extend(std::iter::repeat(1.0f32).take(part.len() - 1));
            count_weights.extend(std::iter::repeat(tail_weight).take(pad + 1));
            sizes.push(count_weights[row_start..].iter().sum());
        }

        AdjustedPartitions {
            num_partitions,
            max_len,
            indices,
            count_weights,
            sizes,
            lens,
        }
    }
}

impl TryFrom<Vec<Vec<usize>>> for Partitions {
    type Error = PoolingError;

    fn try_from(parts: Vec<Vec<usize>>) -> Result<Self> {
        Self::new(parts)
    }
}

impl From<Partitions> for Vec<Vec<usize>> {
    fn from(parts: Partitions) -> Self {
        parts.0
    }
}

/// Partitions padded to a rectangle of `num_partitions x max_len`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustedPartitions {
    pub num_partitions: usize,
    pub max_len: usize,
    pub indices: Vec<usize>,
    pub count_weights: Vec<f32>,
    /// Row sums of `count_weights`: the original partition lengths.
    pub sizes: Vec<f32>,
    /// Original partition lengths; slots at or past `lens[i]` in row `i` are padding.
    pub lens: Vec<usize>,
}

impl AdjustedPartitions {
    pub fn row(&self, i: usize) -> &[usize] {
        &self.indices[i * self.max_len..(i + 1) * self.max_len]
    }

    pub fn weights(&self, i: usize) -> &[f32] {
        &self.count_weights[i * self.max_len..(i + 1) * self.max_len]
    }

    /// Number of slots filled by padding rather than listed nodes.
    pub fn padded_slots(&self) -> usize {
        self.num_partitions * self.max_len - self.lens.iter().sum::<usize>()
    }

    /// Additive mask, 0 on listed slots and `-inf` on padding.
    ///
    /// Max pooling adds it before reducing so padded copies never tie with the
    /// node they repeat.
    pub fn padding_mask(&self) -> Vec<f32> {
        self.lens
            .iter()
            .flat_map(|&len| {
                (0..self.max_len).map(move |j| if j < len { 0.0 } else { f32::NEG_INFINITY })
            })
            .collect()
    }

    /// Indices narrowed to `u32`, the index type the tensor backends gather with.
    pub fn indices_u32(&self) -> Result<Vec<u32>> {
        self.indices
            .iter()
            .map(|&node| u32::try_from(node).map_err(|_| PoolingError::IndexOverflow { node }))
            .collect()
    }
}
