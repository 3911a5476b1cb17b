//! Weighted Lloyd k-means refinement of palette centers.

use kiddo::{ImmutableKdTree, SquaredEuclidean};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

/// Hard minimum on the number of samples used for refinement.
const MIN_SAMPLES: usize = 256 * 256;

/// Seed for the deterministic subsampling of large inputs.
const SEED: u64 = 1234;

/// Refines a set of centers with weighted Lloyd iterations.
///
/// At most `max(max_samples, MIN_SAMPLES)` samples take part, allotted
/// proportionally per center; larger inputs are subsampled with a fixed
/// seed so refinement stays deterministic. Centers that end up with no
/// samples keep their previous position.
pub fn refine_centers(
  samples: &[Vector3<f64>],
  weights: Option<&[f64]>,
  mut centers: Vec<Vector3<f64>>,
  niter: u32,
  max_samples: usize,
) -> Vec<Vector3<f64>> {
  let center_count = centers.len();
  if center_count == 0 || samples.is_empty() || niter == 0 {
    return centers;
  }

  let max_points_per_centroid = max_samples.max(MIN_SAMPLES) / center_count;
  let limit = max_points_per_centroid.saturating_mul(center_count);

  let selected: Vec<usize> = if limit > 0 && samples.len() > limit {
    let mut rng = StdRng::seed_from_u64(SEED);
    rand::seq::index::sample(&mut rng, samples.len(), limit).into_vec()
  } else {
    (0..samples.len()).collect()
  };

  for _ in 0..niter {
    let entries: Vec<[f64; 3]> = centers.iter().map(|c| [c.x, c.y, c.z]).collect();
    let tree: ImmutableKdTree<f64, 3> = ImmutableKdTree::new_from_slice(&entries);

    let assignments: Vec<usize> = selected
      .par_iter()
      .map(|&i| {
        let c = samples[i];
        tree.nearest_one::<SquaredEuclidean>(&[c.x, c.y, c.z]).item as usize
      })
      .collect();

    let mut sums = vec![Vector3::zeros(); center_count];
    let mut totals = vec![0.0; center_count];

    for (&i, &k) in selected.iter().zip(assignments.iter()) {
      let w = weights.map_or(1.0, |w| w[i]);
      sums[k] += samples[i] * w;
      totals[k] += w;
    }

    for k in 0..center_count {
      if totals[k] > 0.0 {
        centers[k] = sums[k] / totals[k];
      }
    }
  }

  centers
}

#[cfg(test)]
mod tests {
  use super::*;

  fn blobs() -> Vec<Vector3<f64>> {
    let mut samples = Vec::new();
    for i in 0..20 {
      let jitter = (i % 5) as f64 * 0.01;
      samples.push(Vector3::new(0.1 + jitter, 0.1, 0.1));
      samples.push(Vector3::new(0.9 - jitter, 0.9, 0.9));
    }
    samples
  }

  #[test]
  fn test_zero_iterations_return_seeds_unchanged() {
    let samples = blobs();
    let seeds = vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0)];

    let refined = refine_centers(&samples, None, seeds.clone(), 0, MIN_SAMPLES);
    assert_eq!(refined, seeds);
  }

  #[test]
  fn test_centers_converge_to_blob_means() {
    let samples = blobs();
    let seeds = vec![Vector3::new(0.3, 0.3, 0.3), Vector3::new(0.7, 0.7, 0.7)];

    let refined = refine_centers(&samples, None, seeds, 8, MIN_SAMPLES);

    let low = refined.iter().find(|c| c.x < 0.5).expect("low blob center");
    let high = refined.iter().find(|c| c.x > 0.5).expect("high blob center");

    assert!((low.x - 0.12).abs() < 1e-9);
    assert!((low.y - 0.1).abs() < 1e-9);
    assert!((high.x - 0.88).abs() < 1e-9);
    assert!((high.y - 0.9).abs() < 1e-9);
  }

  #[test]
  fn test_weights_pull_the_center() {
    let samples = vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0)];
    let weights = vec![1.0, 3.0];
    let seeds = vec![Vector3::new(0.5, 0.0, 0.0)];

    let refined = refine_centers(&samples, Some(&weights), seeds, 1, MIN_SAMPLES);
    assert!((refined[0].x - 0.75).abs() < 1e-9);
  }

  #[test]
  fn test_refinement_is_deterministic() {
    let samples: Vec<Vector3<f64>> = (0..500)
      .map(|i| {
        let t = i as f64 / 499.0;
        Vector3::new(t, (t * 3.0).sin() * 0.5 + 0.5, 1.0 - t)
      })
      .collect();
    let seeds = vec![Vector3::new(0.2, 0.5, 0.8), Vector3::new(0.8, 0.5, 0.2)];

    let a = refine_centers(&samples, None, seeds.clone(), 4, MIN_SAMPLES);
    let b = refine_centers(&samples, None, seeds, 4, MIN_SAMPLES);
    assert_eq!(a, b);
  }

  #[test]
  fn test_empty_center_keeps_position() {
    let samples = vec![Vector3::new(0.1, 0.1, 0.1); 4];
    let seeds = vec![Vector3::new(0.1, 0.1, 0.1), Vector3::new(0.9, 0.9, 0.9)];

    let refined = refine_centers(&samples, None, seeds, 2, MIN_SAMPLES);

    // The far center never receives a sample and must not move
    assert_eq!(refined[1], Vector3::new(0.9, 0.9, 0.9));
  }
}
