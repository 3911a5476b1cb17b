//! Bucketed axis-sorting of colors.

use nalgebra::Vector3;

use crate::DELTA;

/// Bucket sorts a list of colors based on their projection onto a supplied
/// axis. Returns, for each color, the index of its bucket in `[0,
/// bucket_count)`. Buckets are not internally sorted.
///
/// When the projections have no spread, buckets are assigned round-robin
/// instead.
pub fn axis_sort(colors: &[Vector3<f64>], axis: &Vector3<f64>, bucket_count: usize) -> Vec<usize> {
  let dots: Vec<f64> = colors.iter().map(|c| c.dot(axis)).collect();

  let min_dot = dots.iter().cloned().fold(f64::INFINITY, f64::min);
  let max_dot = dots.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

  if max_dot - min_dot < DELTA {
    return (0..colors.len()).map(|i| i % bucket_count).collect();
  }

  let scale = 1.0 / (max_dot - min_dot);
  dots
    .iter()
    .map(|dot| {
      let ratio = (dot - min_dot) * scale;
      let bucket = (bucket_count as f64 * ratio) as usize;
      bucket.min(bucket_count - 1)
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_axis_sort_orders_by_projection() {
    let colors = vec![
      Vector3::new(0.0, 0.0, 0.0),
      Vector3::new(0.5, 0.0, 0.0),
      Vector3::new(1.0, 0.0, 0.0),
    ];

    let map = axis_sort(&colors, &Vector3::new(1.0, 0.0, 0.0), 4);

    assert_eq!(map[0], 0);
    assert_eq!(map[1], 2);
    assert_eq!(map[2], 3);
  }

  #[test]
  fn test_axis_sort_round_robin_fallback() {
    let colors = vec![Vector3::new(0.5, 0.5, 0.5); 10];
    let map = axis_sort(&colors, &Vector3::new(1.0, 0.0, 0.0), 4);

    let expected: Vec<usize> = (0..10).map(|i| i % 4).collect();
    assert_eq!(map, expected);
  }

  #[test]
  fn test_axis_sort_extremes_land_in_first_and_last_bucket() {
    let colors: Vec<Vector3<f64>> = (0..100).map(|i| Vector3::new(i as f64 / 99.0, 0.0, 0.0)).collect();
    let map = axis_sort(&colors, &Vector3::new(1.0, 0.0, 0.0), 512);

    assert_eq!(map[0], 0);
    assert_eq!(map[99], 511);
    assert!(map.iter().all(|&b| b < 512));
  }

  #[test]
  fn test_axis_sort_invariant_under_orthogonal_translation() {
    let colors: Vec<Vector3<f64>> = (0..50).map(|i| {
      let t = i as f64 / 49.0;
      Vector3::new(t, t * 0.25, 1.0 - t)
    }).collect();

    let axis = Vector3::new(1.0, 0.0, 0.0);

    // Translate every color along an axis orthogonal to the sort axis
    let translated: Vec<Vector3<f64>> = colors.iter().map(|c| c + Vector3::new(0.0, 7.0, -3.0)).collect();

    assert_eq!(axis_sort(&colors, &axis, 64), axis_sort(&translated, &axis, 64));
  }
}
