//! Minimal Burn partition pooling smoke example.
//!
//! Run:
//!   cargo run --example burn_pool_smoke --features backend-burn

#[cfg(not(feature = "backend-burn"))]
fn main() {
    eprintln!("This example requires `--features backend-burn`.");
}

#[cfg(feature = "backend-burn")]
fn main() -> partition_pool::Result<()> {
    use burn::tensor::backend::Backend;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;
    use partition_pool::burn_pooling::BurnPartitionPooling;
    use partition_pool::{Partitions, PoolingMode};

    type B = NdArray<f32>;

    let device = <B as Backend>::Device::default();
    let parts = Partitions::new(vec![vec![0, 1], vec![2]])?;
    let pool = BurnPartitionPooling::new(parts, PoolingMode::Average);

    let x = burn::tensor::Tensor::<B, 3>::from_data(
        TensorData::new(vec![0.10f32, -0.05, 0.02, 0.03, 0.04, -0.01], [1, 3, 2]),
        &device,
    );
    let y = pool.forward(x)?;
    println!("y dims: {:?}", y.dims());
    Ok(())
}
