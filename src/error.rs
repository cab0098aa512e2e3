//! Error type shared by partition handling and every backend.

use thiserror::Error;

/// Errors raised while building or applying partition pooling.
#[derive(Debug, Error)]
pub enum PoolingError {
    /// The partition list has no partitions at all.
    #[error("partition list is empty")]
    EmptyPartitions,

    /// A partition lists no nodes.
    #[error("partition {index} is empty")]
    EmptyPartition { index: usize },

    /// A partition references a node past the end of the node axis.
    #[error("partition {partition} references node {node}, but the input has {num_nodes} nodes")]
    NodeOutOfRange {
        partition: usize,
        node: usize,
        num_nodes: usize,
    },

    /// Input must be `batch_shape + (nodes, features)`.
    #[error("expected input of rank >= 3 (batch.., nodes, features), got rank {rank}")]
    InputRank { rank: usize },

    /// Node index does not fit the backend's index type.
    #[error("node index {node} does not fit the backend index type")]
    IndexOverflow { node: usize },

    /// A partition count or padded length does not fit the backend's shape type.
    #[error("length {len} does not fit the backend shape type")]
    ShapeOverflow { len: usize },

    #[error(transparent)]
    Candle(#[from] candle_core::Error),

    #[cfg(feature = "backend-mlx")]
    #[error(transparent)]
    Mlx(#[from] mlx_rs::error::Exception),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, PoolingError>;

impl From<PoolingError> for candle_core::Error {
    fn from(err: PoolingError) -> Self {
        match err {
            PoolingError::Candle(inner) => inner,
            other => candle_core::Error::wrap(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = PoolingError::NodeOutOfRange {
            partition: 2,
            node: 9,
            num_nodes: 4,
        };
        assert_eq!(
            err.to_string(),
            "partition 2 references node 9, but the input has 4 nodes"
        );
        assert_eq!(
            PoolingError::EmptyPartition { index: 1 }.to_string(),
            "partition 1 is empty"
        );
    }

    #[test]
    fn candle_errors_pass_through_unwrapped() {
        let inner = candle_core::Error::Msg("boom".into());
        let err: candle_core::Error = PoolingError::Candle(inner).into();
        assert!(matches!(err, candle_core::Error::Msg(ref m) if m == "boom"));
    }

    #[test]
    fn pooling_errors_wrap_into_candle() {
        let err: candle_core::Error = PoolingError::InputRank { rank: 2 }.into();
        assert!(err.to_string().contains("rank 2"));
    }
}
