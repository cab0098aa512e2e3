//! partition-pool: partition pooling for graph-structured data.
//!
//! Pools node features `batch_shape + (nodes, features)` onto a fixed set of
//! partitions (lists of node indices), producing `batch_shape + (partitions,
//! features)`. Three reductions are provided: max, sum and average. Partitions
//! of unequal length are padded with their last node and corrected with count
//! weights, so every partition is gathered in one batched op.
//!
//! The candle layers in [`layer`] implement `candle_nn::Module`. Burn and MLX
//! adapters sit behind the `backend-burn` and `backend-mlx` features.
//! [`reference`] holds the loop-based implementation all of them are tested
//! against.

pub mod algorithm;
pub mod error;
pub mod layer;
pub mod partition;
pub mod reference;

#[cfg(feature = "backend-burn")]
pub mod burn_pooling;

#[cfg(feature = "backend-mlx")]
pub mod mlx_pooling;

pub use error::{PoolingError, Result};
pub use layer::{
    AveragePartitionPooling, MaxPartitionPooling, PartitionPooling, PartitionPoolingLayer,
    PoolingConfig, PoolingMode, SumPartitionPooling,
};
pub use partition::{AdjustedPartitions, Partitions};
