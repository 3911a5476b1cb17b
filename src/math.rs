//! Weighted principal component analysis over 3-D color samples.

use nalgebra::{Matrix3, SymmetricEigen, Vector3};

use crate::DELTA;

/// Result of a principal component analysis.
pub struct Pca {
  /// Eigenvector of the covariance matrix with the largest eigenvalue.
  pub axis: Vector3<f64>,
  /// Fraction of the total variance explained by the principal axis.
  pub explained_variance: f64,
}

/// Computes the weighted mean of a set of samples. Absent weights are
/// treated as all ones.
pub fn weighted_mean(samples: &[Vector3<f64>], weights: Option<&[f64]>) -> Vector3<f64> {
  let mut sum = Vector3::zeros();
  let mut total = 0.0;

  for (i, sample) in samples.iter().enumerate() {
    let w = weights.map_or(1.0, |w| w[i]);
    sum += sample * w;
    total += w;
  }

  sum / total
}

/// Computes the weighted variance-covariance matrix of a set of samples.
pub fn covariance(samples: &[Vector3<f64>], weights: Option<&[f64]>) -> Matrix3<f64> {
  let mean = weighted_mean(samples, weights);

  let mut vcov = Matrix3::zeros();
  let mut total = 0.0;

  for (i, sample) in samples.iter().enumerate() {
    let w = weights.map_or(1.0, |w| w[i]);
    let centered = sample - mean;
    vcov += centered * centered.transpose() * w;
    total += w;
  }

  vcov / total
}

/// Performs PCA directly on a variance-covariance matrix.
///
/// Returns `None` when the matrix cannot be decomposed; callers treat this
/// as "cannot analyze this sample set".
pub fn pca_from_covariance(vcov: Matrix3<f64>) -> Option<Pca> {
  if !vcov.iter().all(|v| v.is_finite()) {
    return None;
  }

  let eigen = SymmetricEigen::try_new(vcov, f64::EPSILON, 1024)?;

  // nalgebra returns eigenvalues unordered
  let mut top = 0;
  for i in 1..3 {
    if eigen.eigenvalues[i] > eigen.eigenvalues[top] {
      top = i;
    }
  }

  let sum: f64 = eigen.eigenvalues.iter().sum();
  let explained_variance = if sum > DELTA { eigen.eigenvalues[top] / sum } else { 0.0 };

  Some(Pca {
    axis: eigen.eigenvectors.column(top).into_owned(),
    explained_variance,
  })
}

/// Performs weighted PCA on a set of samples.
pub fn perform_pca(samples: &[Vector3<f64>], weights: Option<&[f64]>) -> Option<Pca> {
  pca_from_covariance(covariance(samples, weights))
}
