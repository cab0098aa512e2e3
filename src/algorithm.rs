//! Partition pooling kernels on candle tensors.
//!
//! Inputs are `batch_shape + (nodes, features)`. Partitions arrive already
//! padded (see [`Partitions::adjust`](crate::partition::Partitions::adjust)):
//! `indices` is a `(p, L)` u32 tensor, `node_weights` a `(p, L)` float tensor and
//! `partition_sizes` a `(p,)` float tensor. Output is `batch_shape + (p, features)`.
//!
//! Everything is built from `index_select`, reductions and broadcast arithmetic,
//! so candle's autograd handles the backward pass.

use candle_core::{Tensor, D};

use crate::error::{PoolingError, Result};

/// Gathers `x` along the node axis into `(batch, p, L, features)`.
///
/// Leading batch axes are flattened into one; the returned shape is the original
/// batch shape so callers can restore it.
fn gather(x: &Tensor, indices: &Tensor) -> Result<(Tensor, Vec<usize>)> {
    let dims = x.dims();
    if dims.len() < 3 {
        return Err(PoolingError::InputRank { rank: dims.len() });
    }
    let (p, l) = indices.dims2()?;
    let nodes = dims[dims.len() - 2];
    let features = dims[dims.len() - 1];
    let batch_shape = dims[..dims.len() - 2].to_vec();
    let batch: usize = batch_shape.iter().product();
    check_indices(indices, nodes)?;

    let flat = x.reshape((batch, nodes, features))?;
    let gathered = flat
        .index_select(&indices.flatten_all()?, 1)?
        .reshape((batch, p, l, features))?;
    Ok((gathered, batch_shape))
}

/// Rejects indices past the node axis before they reach `index_select`.
fn check_indices(indices: &Tensor, nodes: usize) -> Result<()> {
    if indices.elem_count() == 0 {
        return Ok(());
    }
    let max = indices.max_all()?.to_scalar::<u32>()? as usize;
    if max < nodes {
        return Ok(());
    }
    for (partition, row) in indices.to_vec2::<u32>()?.into_iter().enumerate() {
        if let Some(&node) = row.iter().find(|&&n| n as usize >= nodes) {
            return Err(PoolingError::NodeOutOfRange {
                partition,
                node: node as usize,
                num_nodes: nodes,
            });
        }
    }
    Ok(())
}

fn restore(pooled: Tensor, batch_shape: &[usize]) -> Result<Tensor> {
    let (_, p, f) = pooled.dims3()?;
    let mut shape = batch_shape.to_vec();
    shape.extend([p, f]);
    Ok(pooled.reshape(shape)?)
}

/// Weighted sum over the padded partition axis, shape `(batch, p, features)`.
fn weighted_sum(gathered: &Tensor, node_weights: &Tensor) -> Result<Tensor> {
    let (p, l) = node_weights.dims2()?;
    let w = node_weights
        .to_dtype(gathered.dtype())?
        .reshape((1, p, l, 1))?;
    Ok(gathered.broadcast_mul(&w)?.sum(2)?)
}

/// Each output entry is the max of its partition.
///
/// `padding_mask`, when given, is the `(p, L)` additive mask from
/// [`AdjustedPartitions::padding_mask`](crate::partition::AdjustedPartitions::padding_mask).
/// The forward value is the same either way. Candle hands the full gradient to
/// every slot that ties with the max, so without the mask a padded tail node
/// collects it once per copy.
pub fn max_partition_pooling(
    x: &Tensor,
    indices: &Tensor,
    padding_mask: Option<&Tensor>,
) -> Result<Tensor> {
    let (gathered, batch_shape) = gather(x, indices)?;
    let gathered = match padding_mask {
        Some(mask) => {
            let (p, l) = mask.dims2()?;
            let mask = mask.to_dtype(gathered.dtype())?.reshape((1, p, l, 1))?;
            gathered.broadcast_add(&mask)?
        }
        None => gathered,
    };
    restore(gathered.max(2)?, &batch_shape)
}

/// Each output entry is the count-weighted sum of its partition.
pub fn sum_partition_pooling(
    x: &Tensor,
    node_weights: &Tensor,
    indices: &Tensor,
) -> Result<Tensor> {
    let (gathered, batch_shape) = gather(x, indices)?;
    restore(weighted_sum(&gathered, node_weights)?, &batch_shape)
}

/// Each output entry is the count-weighted mean of its partition.
pub fn average_partition_pooling(
    x: &Tensor,
    node_weights: &Tensor,
    partition_sizes: &Tensor,
    indices: &Tensor,
) -> Result<Tensor> {
    let (gathered, batch_shape) = gather(x, indices)?;
    let summed = weighted_sum(&gathered, node_weights)?;
    let p = partition_sizes.dim(D::Minus1)?;
    let sizes = partition_sizes
        .to_dtype(summed.dtype())?
        .reshape((1, p, 1))?;
    restore(summed.broadcast_div(&sizes)?, &batch_shape)
}
