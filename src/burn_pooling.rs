//! Burn-backed partition pooling (opt-in).
//!
//! Same semantics as the candle kernels, on `[batch, nodes, features]` Burn
//! tensors, so it runs on any Burn backend (ndarray / wgpu / tch). Checked
//! against [`crate::reference`] in the tests below.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};

use crate::error::{PoolingError, Result};
use crate::layer::PoolingMode;
use crate::partition::{AdjustedPartitions, Partitions};

/// Partition pooling over Burn tensors.
#[derive(Debug, Clone)]
pub struct BurnPartitionPooling {
    mode: PoolingMode,
    partitions: Partitions,
    adjusted: AdjustedPartitions,
}

impl BurnPartitionPooling {
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

    /// `[batch, nodes, features]` -> `[batch, partitions, features]`.
    pub fn forward<B: Backend>(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        let [batch, nodes, features] = x.dims();
        self.partitions.check_nodes(nodes)?;

        let (p, l) = (self.adjusted.num_partitions, self.adjusted.max_len);
        let device = x.device();

        let indices = self
            .adjusted
            .indices
            .iter()
            .map(|&n| i64::try_from(n).map_err(|_| PoolingError::IndexOverflow { node: n }))
            .collect::<Result<Vec<i64>>>()?;
        let indices = Tensor::<B, 1, Int>::from_data(TensorData::new(indices, [p * l]), &device);
        let gathered: Tensor<B, 4> = x.select(1, indices).reshape([batch, p, l, features]);

        let pooled = match self.mode {
            PoolingMode::Max => gathered.max_dim(2),
            PoolingMode::Sum => self.weighted_sum(gathered, &device),
            PoolingMode::Average => {
                let sizes = Tensor::<B, 4>::from_data(
                    TensorData::new(self.adjusted.sizes.clone(), [1, p, 1, 1]),
                    &device,
                );
                self.weighted_sum(gathered, &device) / sizes
            }
        };
        Ok(pooled.reshape([batch, p, features]))
    }

    /// Count-weighted sum over the padded axis, keeping it as size 1.
    fn weighted_sum<B: Backend>(&self, gathered: Tensor<B, 4>, device: &B::Device) -> Tensor<B, 4> {
        let (p, l) = (self.adjusted.num_partitions, self.adjusted.max_len);
        let w = Tensor::<B, 4>::from_data(
            TensorData::new(self.adjusted.count_weights.clone(), [1, p, l, 1]),
            device,
        );
        (gathered * w).sum_dim(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference;
    use burn_ndarray::NdArray;
    use ndarray::Array3;
    use proptest::prelude::*;

    type B = NdArray<f32>;

    fn to_burn_3(v: &[f32], shape: [usize; 3]) -> Tensor<B, 3> {
        let device = <B as Backend>::Device::default();
        Tensor::from_data(TensorData::new(v.to_vec(), shape), &device)
    }

    fn to_reference(v: &[f32], shape: [usize; 3]) -> Array3<f64> {
        let v = v.iter().map(|&t| t as f64).collect();
        Array3::from_shape_vec((shape[0], shape[1], shape[2]), v).unwrap()
    }

    fn l_inf(got: &Tensor<B, 3>, want: &Array3<f64>) -> f64 {
        assert_eq!(got.dims(), [want.dim().0, want.dim().1, want.dim().2]);
        let got = got.to_data().to_vec::<f32>().unwrap();
        got.iter()
            .zip(want.iter())
            .map(|(a, b)| (*a as f64 - b).abs())
            .fold(0.0, f64::max)
    }

    fn run(mode: PoolingMode, parts: &Partitions, v: &[f32], shape: [usize; 3]) -> f64 {
        let pool = BurnPartitionPooling::new(parts.clone(), mode);
        let got = pool.forward(to_burn_3(v, shape)).unwrap();
        let xr = to_reference(v, shape);
        let want = match mode {
            PoolingMode::Max => reference::max_pool(xr.view(), parts),
            PoolingMode::Sum => reference::sum_pool(xr.view(), parts),
            PoolingMode::Average => reference::average_pool(xr.view(), parts),
        }
        .unwrap();
        l_inf(&got, &want)
    }

    #[test]
    fn burn_modes_match_reference_smoke() {
        let parts = Partitions::new(vec![vec![0, 2], vec![1], vec![3, 3, 0]]).unwrap();
        let v = [1.0f32, -1.0, 2.0, 5.0, 4.0, 0.5, -3.0, 2.0];
        for mode in [PoolingMode::Max, PoolingMode::Sum, PoolingMode::Average] {
            let err = run(mode, &parts, &v, [1, 4, 2]);
            assert!(err < 1e-5, "{mode:?} err={err}");
        }
    }

    #[test]
    fn burn_rejects_out_of_range_nodes() {
        let parts = Partitions::new(vec![vec![0, 4]]).unwrap();
        let pool = BurnPartitionPooling::new(parts, PoolingMode::Sum);
        let err = pool.forward(to_burn_3(&[0.0; 6], [1, 3, 2])).unwrap_err();
        assert!(matches!(err, PoolingError::NodeOutOfRange { node: 4, .. }));
    }

    fn arb_case() -> impl Strategy<Value = (Vec<Vec<usize>>, [usize; 3], Vec<f32>)> {
        (1usize..3, 1usize..6, 1usize..4).prop_flat_map(|(b, n, f)| {
            (
                prop::collection::vec(prop::collection::vec(0..n, 1..5), 1..4),
                Just([b, n, f]),
                prop::collection::vec(-2.0f32..2.0, b * n * f),
            )
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 32,
            max_shrink_iters: 0,
            .. ProptestConfig::default()
        })]

        #[test]
        fn prop_burn_matches_reference((parts, shape, v) in arb_case()) {
            let parts = Partitions::new(parts).unwrap();
            for mode in [PoolingMode::Max, PoolingMode::Sum, PoolingMode::Average] {
                let err = run(mode, &parts, &v, shape);
                prop_assert!(err < 1e-4, "{:?} err={}", mode, err);
            }
        }
    }
}
