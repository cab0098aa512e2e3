//! MLX-backed partition pooling (opt-in).
//!
//! Notes:
//! - MLX evaluation is lazy; `as_slice()` forces evaluation.
//! - We avoid the operator-overload API since it `unwrap()`s internally.

use mlx_rs::{ops, Array};

use crate::error::{PoolingError, Result};
use crate::layer::PoolingMode;
use crate::partition::{AdjustedPartitions, Partitions};

/// Partition pooling over MLX arrays of shape `[batch, nodes, features]`.
#[derive(Debug, Clone)]
pub struct MlxPartitionPooling {
    mode: PoolingMode,
    partitions: Partitions,
    adjusted: AdjustedPartitions,
}

fn shape_dim(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| PoolingError::ShapeOverflow { len })
}

fn node_index(node: usize) -> Result<i32> {
    i32::try_from(node).map_err(|_| PoolingError::IndexOverflow { node })
}

impl MlxPartitionPooling {
    #[must_use]
    pub fn new(partitions: Partitions, mode: PoolingMode) -> Self {
        Self {
            mode,
            adjusted: partitions.adjust(),
            partitions,
        }
    }

    pub fn mode(&self) -> PoolingMode {
        self.mode
    }

    pub fn forward(&self, x: &Array) -> Result<Array> {
        let shape = x.shape();
        if shape.len() != 3 {
            return Err(PoolingError::InputRank { rank: shape.len() });
        }
        let (b, n, f) = (shape[0], shape[1], shape[2]);
        self.partitions.check_nodes(n as usize)?;

        let p = shape_dim(self.adjusted.num_partitions)?;
        let l = shape_dim(self.adjusted.max_len)?;
        let slots = shape_dim(self.adjusted.indices.len())?;

        let indices = self
            .adjusted
            .indices
            .iter()
            .map(|&node| node_index(node))
            .collect::<Result<Vec<i32>>>()?;
        let indices = Array::from_slice(&indices, &[slots]);
        let gathered = x.take_axis(&indices, 1)?.reshape(&[b, p, l, f])?;

        let pooled = match self.mode {
            PoolingMode::Max => gathered.max_axis(2, Some(false))?,
            PoolingMode::Sum => self.weighted_sum(&gathered, p, l)?,
            PoolingMode::Average => {
                let sizes = Array::from_slice(&self.adjusted.sizes, &[1, p, 1])
                    .as_dtype(gathered.dtype())?;
                ops::divide(&self.weighted_sum(&gathered, p, l)?, &sizes)?
            }
        };
        Ok(pooled)
    }

    fn weighted_sum(&self, gathered: &Array, p: i32, l: i32) -> Result<Array> {
        // Weights follow the input dtype so half-precision input stays half.
        let w = Array::from_slice(&self.adjusted.count_weights, &[1, p, l, 1])
            .as_dtype(gathered.dtype())?;
        Ok(ops::multiply(gathered, &w)?.sum_axis(2, Some(false))?)
    }
}
