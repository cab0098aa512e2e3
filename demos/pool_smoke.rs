//! Minimal partition pooling smoke example (Candle backend).
//!
//! Run:
//!   RUST_LOG=debug cargo run --example pool_smoke

use candle_core::{DType, Device, Result, Tensor};
use candle_nn::{Module, VarBuilder, VarMap};
use partition_pool::{Partitions, PoolingConfig, PoolingMode};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dev = &Device::Cpu;
    let dtype = DType::F32;

    let (batch, n, d) = (2usize, 6usize, 4usize);
    let x = Tensor::randn(0f32, 1f32, (batch, n, d), dev)?.to_dtype(dtype)?;

    // Two clusters of a 6-node graph, e.g. from label propagation.
    let parts = Partitions::from_assignment(&[0, 0, 1, 1, 1, 0])?;

    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, dtype, dev);
    let lin = candle_nn::linear(d, d, vb)?;

    for mode in [PoolingMode::Max, PoolingMode::Sum, PoolingMode::Average] {
        let config = PoolingConfig::new(parts.clone(), mode);
        let layer = config.build(dev)?;
        let y = layer.forward(&lin.forward(&x)?)?;
        let (yb, yp, yd) = y.dims3()?;
        println!("{mode:?}: y shape [{yb}, {yp}, {yd}]");
    }

    let json = serde_json::to_string(&PoolingConfig::new(parts, PoolingMode::Average))
        .map_err(candle_core::Error::wrap)?;
    println!("config: {json}");
    Ok(())
}
