//! Minimal MLX partition pooling smoke example.
//!
//! Run:
//!   cargo run --example mlx_pool_smoke --features backend-mlx

fn main() {
    #[cfg(not(feature = "backend-mlx"))]
    {
        eprintln!("This example requires `--features backend-mlx`.");
    }

    #[cfg(feature = "backend-mlx")]
    {
        use mlx_rs::{Array, Device};
        use partition_pool::mlx_pooling::MlxPartitionPooling;
        use partition_pool::{Partitions, PoolingMode};

        // For a simple, deterministic smoke example, force CPU.
        Device::set_default(&Device::cpu());

        let parts = match Partitions::new(vec![vec![0, 1], vec![2]]) {
            Ok(parts) => parts,
            Err(err) => {
                eprintln!("bad partitions: {err}");
                return;
            }
        };
        let pool = MlxPartitionPooling::new(parts, PoolingMode::Max);
        let x = Array::from_slice(&[0.10f32, -0.05, 0.02, 0.03, 0.04, -0.01], &[1, 3, 2]);

        match pool.forward(&x) {
            Ok(y) => {
                let yv: &[f32] = y.as_slice();
                println!("y: {yv:?}");
            }
            Err(err) => eprintln!("pooling failed: {err}"),
        }
    }
}
