//! Synthetic classification data.
//!
//! Gaussian blobs with one center per class, for demos, benches and tests
//! that need a small labeled table without shipping a dataset file.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::DataFrame;
use crate::error::{Result, SearchError};

/// Name of the label column produced by [`make_blobs`].
pub const TARGET_COLUMN: &str = "target";

/// Generates a frame of isotropic Gaussian blobs.
///
/// Class `c` gets `class_sizes[c]` rows centered at a point on a ring of
/// radius `4.0` in the first two feature dimensions (further dimensions
/// are pure noise). `spread` is the per-feature standard deviation.
/// Rows are interleaved by class so that no class sits in one block.
///
/// # Errors
///
/// Returns an error if `n_features` is zero.
///
/// # Examples
///
/// ```
/// use hypergrid::data::synthetic::{make_blobs, TARGET_COLUMN};
///
/// let df = make_blobs(&[10, 10, 5], 4, 0.5, 42).expect("valid blob layout");
/// assert_eq!(df.shape(), (25, 5));
/// assert!(df.column(TARGET_COLUMN).is_ok());
/// ```
pub fn make_blobs(
    class_sizes: &[usize],
    n_features: usize,
    spread: f32,
    seed: u64,
) -> Result<DataFrame> {
    if n_features == 0 {
        return Err(SearchError::InvalidDataset {
            message: "make_blobs needs at least one feature".to_string(),
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let n_classes = class_sizes.len().max(1);
    let mut columns: Vec<Vec<f32>> = vec![Vec::new(); n_features];
    let mut target = Vec::new();

    let mut remaining: Vec<usize> = class_sizes.to_vec();
    while remaining.iter().any(|&r| r > 0) {
        for (class, left) in remaining.iter_mut().enumerate() {
            if *left == 0 {
                continue;
            }
            *left -= 1;

            let angle = std::f32::consts::TAU * class as f32 / n_classes as f32;
            for (j, column) in columns.iter_mut().enumerate() {
                let center = match j {
                    0 => 4.0 * angle.cos(),
                    1 => 4.0 * angle.sin(),
                    _ => 0.0,
                };
                column.push(center + spread * standard_normal(&mut rng));
            }
            target.push(class as f32);
        }
    }

    let mut named: Vec<(String, Vec<f32>)> = columns
        .into_iter()
        .enumerate()
        .map(|(j, col)| (format!("feature_{j}"), col))
        .collect();
    named.push((TARGET_COLUMN.to_string(), target));
    DataFrame::new(named)
}

/// Box-Muller transform.
fn standard_normal(rng: &mut impl Rng) -> f32 {
    let u1: f32 = rng.gen_range(0.0001_f32..1.0_f32);
    let u2: f32 = rng.gen_range(0.0_f32..1.0_f32);
    (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
}
