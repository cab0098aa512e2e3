//! Loop-based reference pooling on `ndarray`.
//!
//! This is the single source of truth for pooling semantics. It works from the
//! unpadded partitions, so it never sees count weights; every tensor backend is
//! tested against it.

use ndarray::{Array3, ArrayView3};

use crate::error::Result;
use crate::partition::Partitions;

/// Max over each partition. Input and output are `[batch, nodes, features]`.
pub fn max_pool(x: ArrayView3<'_, f64>, parts: &Partitions) -> Result<Array3<f64>> {
    pool(x, parts, |vals| vals.fold(f64::NEG_INFINITY, f64::max))
}

/// Sum over each partition, counting repeated nodes as often as they are listed.
pub fn sum_pool(x: ArrayView3<'_, f64>, parts: &Partitions) -> Result<Array3<f64>> {
    pool(x, parts, |vals| vals.sum())
}

/// Mean over each partition.
pub fn average_pool(x: ArrayView3<'_, f64>, parts: &Partitions) -> Result<Array3<f64>> {
    pool(x, parts, |vals| {
        let (n, s) = vals.fold((0usize, 0.0), |(n, s), v| (n + 1, s + v));
        s / n as f64
    })
}

fn pool<F>(x: ArrayView3<'_, f64>, parts: &Partitions, reduce: F) -> Result<Array3<f64>>
where
    F: Fn(&mut dyn Iterator<Item = f64>) -> f64,
{
    let (batch, nodes, features) = x.dim();
    parts.check_nodes(nodes)?;

    let mut out = Array3::zeros((batch, parts.len(), features));
    for b in 0..batch {
        for (i, part) in parts.as_slice().iter().enumerate() {
            for f in 0..features {
                let mut vals = part.iter().map(|&n| x[[b, n, f]]);
                out[[b, i, f]] = reduce(&mut vals);
            }
        }
    }
    Ok(out)
}
