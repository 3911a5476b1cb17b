//! Cumulative moments over bucket cells, enabling O(1) queries of any
//! contiguous cell's count, distortion, covariance and principal axis.
//!
//! The maths follow Wu's optimum quantization paper
//! (<https://dl.acm.org/doi/pdf/10.1145/146443.146475>).

use nalgebra::{Matrix3, Vector3};

use crate::math::{self, Pca};
use crate::DELTA;

/// Cumulative zeroth, first and second moments of a bucket-sorted color
/// set.
///
/// Slot 0 holds zeros and slot `j` corresponds to bucket `j - 1`, so a
/// query over the half-open cell `(a, b]` is a subtraction of slot `a`
/// from slot `b`.
pub struct MomentsCache {
  // Cumulative color counts
  w0: Vec<u64>,
  // Cumulative per-channel sums
  w1: Vec<Vector3<f64>>,
  // Cumulative squared norms
  w2: Vec<f64>,
  // Cumulative channel products; only the upper triangle (r <= s) is kept
  wrs: Vec<Matrix3<f64>>,
  size: usize,
}

impl MomentsCache {
  /// Builds the cache from a color set and its bucket map.
  ///
  /// The cache is always built unweighted; per-cluster weighting happens in
  /// the cluster caches, not here.
  pub fn build(colors: &[Vector3<f64>], bucket_map: &[usize], bucket_count: usize) -> Self {
    let size = bucket_count + 1;

    let mut w0 = vec![0u64; size];
    let mut w1 = vec![Vector3::zeros(); size];
    let mut w2 = vec![0.0; size];
    let mut wrs = vec![Matrix3::zeros(); size];

    for (i, color) in colors.iter().enumerate() {
      let j = bucket_map[i] + 1;

      w0[j] += 1;
      w1[j] += color;
      w2[j] += color.norm_squared();

      for s in 0..3 {
        for r in 0..=s {
          wrs[j][(r, s)] += color[r] * color[s];
        }
      }
    }

    for i in 1..size {
      w0[i] += w0[i - 1];
      w2[i] += w2[i - 1];
      let prev = w1[i - 1];
      w1[i] += prev;
      let prev = wrs[i - 1];
      wrs[i] += prev;
    }

    MomentsCache { w0, w1, w2, wrs, size }
  }

  /// Number of slots in the cache (bucket count + 1).
  pub fn size(&self) -> usize {
    self.size
  }

  /// Number of colors inside the cell `(a, b]`.
  pub fn cell_count(&self, a: usize, b: usize) -> u64 {
    self.w0[b] - self.w0[a]
  }

  /// Distortion (sum of squared deviations from the mean) of the cell
  /// `(a, b]`. Empty cells have zero distortion.
  pub fn cell_distortion(&self, a: usize, b: usize) -> f64 {
    let count = self.cell_count(a, b);
    if count == 0 {
      return 0.0;
    }

    let sum = self.w1[b] - self.w1[a];
    (self.w2[b] - self.w2[a]) - sum.norm_squared() / count as f64
  }

  /// Variance-covariance matrix of the cell `(a, b]`. Empty cells yield the
  /// zero matrix.
  fn cell_covariance(&self, a: usize, b: usize) -> Matrix3<f64> {
    let count = self.cell_count(a, b) as f64;
    let mut vcov = Matrix3::zeros();

    if count == 0.0 {
      return vcov;
    }

    let sum = self.w1[b] - self.w1[a];
    for s in 0..3 {
      for r in 0..=s {
        let prod = self.wrs[b][(r, s)] - self.wrs[a][(r, s)];
        let e = prod / count - sum[r] * sum[s] / (count * count);
        vcov[(r, s)] = e;
        vcov[(s, r)] = e;
      }
    }

    vcov
  }

  /// Performs PCA on the cell `(a, b]`.
  pub fn cell_pca(&self, a: usize, b: usize) -> Option<Pca> {
    math::pca_from_covariance(self.cell_covariance(a, b))
  }

  /// Bias of the cell `(a, b]` towards a supplied axis: the cosine
  /// similarity between the cell's principal axis and `axis`, clamped to
  /// [0, 1]. Returns `None` when the cell cannot be analyzed.
  pub fn cell_bias(&self, a: usize, b: usize, axis: &Vector3<f64>) -> Option<f64> {
    let pca = self.cell_pca(a, b)?;

    let norms = axis.norm() * pca.axis.norm();
    if norms < DELTA {
      return Some(0.0);
    }

    let cos = pca.axis.dot(axis) / norms;
    Some(cos.abs().min(1.0))
  }
}
