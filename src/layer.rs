//! Partition pooling as candle layers.
//!
//! Each layer owns its padded partitions as device tensors and implements
//! [`candle_nn::Module`], so it slots into any candle model. Input is
//! `batch_shape + (nodes, features)`; output is
//! `batch_shape + (partitions.len(), features)`. Node data is treated as 1-D:
//! flatten 2-D or 3-D node layouts before pooling.

use candle_core::{Device, Tensor};
use candle_nn::Module;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::algorithm::{average_partition_pooling, max_partition_pooling, sum_partition_pooling};
use crate::error::{PoolingError, Result};
use crate::partition::Partitions;

/// Reduction applied within each partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolingMode {
    Max,
    Sum,
    Average,
}

/// Everything needed to rebuild a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolingConfig {
    pub partitions: Partitions,
    pub mode: PoolingMode,
}

impl PoolingConfig {
    pub fn new(partitions: Partitions, mode: PoolingMode) -> Self {
        Self { partitions, mode }
    }

    /// Builds the layer this config describes on `device`.
    pub fn build(&self, device: &Device) -> Result<Box<dyn PartitionPoolingLayer>> {
        let parts = self.partitions.clone();
        let layer: Box<dyn PartitionPoolingLayer> = match self.mode {
            PoolingMode::Max => Box::new(MaxPartitionPooling::new(parts, device)?),
            PoolingMode::Sum => Box::new(SumPartitionPooling::new(parts, device)?),
            PoolingMode::Average => Box::new(AveragePartitionPooling::new(parts, device)?),
        };
        Ok(layer)
    }
}

/// Common surface of the three pooling layers.
pub trait PartitionPoolingLayer: Module {
    fn mode(&self) -> PoolingMode;

    fn base(&self) -> &PartitionPooling;

    fn partitions(&self) -> &Partitions {
        &self.base().partitions
    }

    fn config(&self) -> PoolingConfig {
        PoolingConfig::new(self.partitions().clone(), self.mode())
    }

    /// Shape produced for an input of shape `input`.
    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        self.base().output_shape(input)
    }
}

/// Padded partitions on a device, shared by the concrete layers.
#[derive(Debug, Clone)]
pub struct PartitionPooling {
    partitions: Partitions,
    max_node: usize,
    indices: Tensor,
    count_weights: Tensor,
    sizes: Tensor,
    padding_mask: Tensor,
}

impl PartitionPooling {
    pub fn new(partitions: Partitions, device: &Device) -> Result<Self> {
        let adjusted = partitions.adjust();
        let (p, l) = (adjusted.num_partitions, adjusted.max_len);
        debug!(
            partitions = p,
            max_len = l,
            padded = adjusted.padded_slots(),
            "adjusted partition lengths"
        );

        let indices = Tensor::from_vec(adjusted.indices_u32()?, (p, l), device)?;
        let padding_mask = Tensor::from_vec(adjusted.padding_mask(), (p, l), device)?;
        let count_weights = Tensor::from_vec(adjusted.count_weights, (p, l), device)?;
        let sizes = Tensor::from_vec(adjusted.sizes, p, device)?;
        Ok(Self {
            max_node: partitions.max_node(),
            partitions,
            indices,
            count_weights,
            sizes,
            padding_mask,
        })
    }

    pub fn partitions(&self) -> &Partitions {
        &self.partitions
    }

    /// `(p, L)` node indices, padded with each row's last node.
    pub fn indices(&self) -> &Tensor {
        &self.indices
    }

    /// `(p, L)` weights correcting for the padding.
    pub fn count_weights(&self) -> &Tensor {
        &self.count_weights
    }

    /// `(p,)` original partition lengths.
    pub fn sizes(&self) -> &Tensor {
        &self.sizes
    }

    pub fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        let rank = input.len();
        if rank < 3 {
            return Err(PoolingError::InputRank { rank });
        }
        let mut out = input[..rank - 2].to_vec();
        out.extend([self.partitions.len(), input[rank - 1]]);
        Ok(out)
    }

    fn check_input(&self, xs: &Tensor) -> Result<()> {
        let dims = xs.dims();
        if dims.len() < 3 {
            return Err(PoolingError::InputRank { rank: dims.len() });
        }
        let num_nodes = dims[dims.len() - 2];
        if self.max_node >= num_nodes {
            return self.partitions.check_nodes(num_nodes);
        }
        trace!(shape = ?dims, "partition pooling forward");
        Ok(())
    }
}

/// Each output node is the max of its partition.
#[derive(Debug, Clone)]
pub struct MaxPartitionPooling {
    base: PartitionPooling,
}

impl MaxPartitionPooling {
    pub fn new(partitions: Partitions, device: &Device) -> Result<Self> {
        Ok(Self {
            base: PartitionPooling::new(partitions, device)?,
        })
    }
}

impl Module for MaxPartitionPooling {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        self.base.check_input(xs)?;
        Ok(max_partition_pooling(
            xs,
            &self.base.indices,
            Some(&self.base.padding_mask),
        )?)
    }
}

impl PartitionPoolingLayer for MaxPartitionPooling {
    fn mode(&self) -> PoolingMode {
        PoolingMode::Max
    }

    fn base(&self) -> &PartitionPooling {
        &self.base
    }
}

/// Each output node is the sum of its partition.
#[derive(Debug, Clone)]
pub struct SumPartitionPooling {
    base: PartitionPooling,
}

impl SumPartitionPooling {
    pub fn new(partitions: Partitions, device: &Device) -> Result<Self> {
        Ok(Self {
            base: PartitionPooling::new(partitions, device)?,
        })
    }
}

impl Module for SumPartitionPooling {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        self.base.check_input(xs)?;
        Ok(sum_partition_pooling(
            xs,
            &self.base.count_weights,
            &self.base.indices,
        )?)
    }
}

impl PartitionPoolingLayer for SumPartitionPooling {
    fn mode(&self) -> PoolingMode {
        PoolingMode::Sum
    }

    fn base(&self) -> &PartitionPooling {
        &self.base
    }
}

/// Each output node is the mean of its partition.
#[derive(Debug, Clone)]
pub struct AveragePartitionPooling {
    base: PartitionPooling,
}

impl AveragePartitionPooling {
    pub fn new(partitions: Partitions, device: &Device) -> Result<Self> {
        Ok(Self {
            base: PartitionPooling::new(partitions, device)?,
        })
    }
}

impl Module for AveragePartitionPooling {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        self.base.check_input(xs)?;
        Ok(average_partition_pooling(
            xs,
            &self.base.count_weights,
            &self.base.sizes,
            &self.base.indices,
        )?)
    }
}

impl PartitionPoolingLayer for AveragePartitionPooling {
    fn mode(&self) -> PoolingMode {
        PoolingMode::Average
    }

    fn base(&self) -> &PartitionPooling {
        &self.base
    }
}
