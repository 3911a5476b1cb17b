//! Color clusters over a shared dataset.
//!
//! A cluster borrows the dataset (and its weights) from the pipeline and
//! owns only the indices of its members. Derived properties — colors,
//! weights, center, distortion, principal axis — are computed on first
//! access and memoized.

use std::cell::OnceCell;

use nalgebra::Vector3;

use crate::math;

/// A cluster of colors, identified by indices into a shared dataset.
pub struct ColorCluster<'a> {
  dataset: &'a [Vector3<f64>],
  dataset_weights: Option<&'a [f64]>,
  indices: Vec<usize>,

  colors: OnceCell<Vec<Vector3<f64>>>,
  weights: OnceCell<Option<Vec<f64>>>,
  center: OnceCell<Vector3<f64>>,
  distortion: OnceCell<f64>,
  principal_axis: OnceCell<Option<Vector3<f64>>>,
}

impl<'a> ColorCluster<'a> {
  /// Creates a cluster from the indices of its members.
  pub fn new(dataset: &'a [Vector3<f64>], dataset_weights: Option<&'a [f64]>, indices: Vec<usize>) -> Self {
    ColorCluster {
      dataset,
      dataset_weights,
      indices,
      colors: OnceCell::new(),
      weights: OnceCell::new(),
      center: OnceCell::new(),
      distortion: OnceCell::new(),
      principal_axis: OnceCell::new(),
    }
  }

  /// Number of colors in the cluster.
  pub fn len(&self) -> usize {
    self.indices.len()
  }

  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }

  /// Indices of the cluster's colors in the dataset.
  pub fn indices(&self) -> &[usize] {
    &self.indices
  }

  /// The shared dataset this cluster belongs to.
  pub fn dataset(&self) -> &'a [Vector3<f64>] {
    self.dataset
  }

  /// The shared dataset weights, if any.
  pub fn dataset_weights(&self) -> Option<&'a [f64]> {
    self.dataset_weights
  }

  /// The cluster's colors, gathered from the dataset.
  pub fn colors(&self) -> &[Vector3<f64>] {
    self.colors.get_or_init(|| self.indices.iter().map(|&i| self.dataset[i]).collect())
  }

  /// The weight of each of the cluster's colors, gathered from the dataset
  /// weights. `None` when the dataset is unweighted.
  pub fn weights(&self) -> Option<&[f64]> {
    self
      .weights
      .get_or_init(|| {
        self
          .dataset_weights
          .map(|weights| self.indices.iter().map(|&i| weights[i]).collect())
      })
      .as_deref()
  }

  /// The cluster's center, i.e. the weighted mean of its colors.
  pub fn center(&self) -> &Vector3<f64> {
    self.center.get_or_init(|| math::weighted_mean(self.colors(), self.weights()))
  }

  /// The cluster's distortion: the weighted sum of squared deviations of
  /// its colors from the center.
  pub fn distortion(&self) -> f64 {
    *self.distortion.get_or_init(|| {
      let center = *self.center();
      let weights = self.weights();

      self
        .colors()
        .iter()
        .enumerate()
        .map(|(i, color)| {
          let w = weights.map_or(1.0, |w| w[i]);
          (color - center).norm_squared() * w
        })
        .sum()
    })
  }

  /// The cluster's variance (distortion over size).
  pub fn variance(&self) -> f64 {
    if self.is_empty() {
      return 0.0;
    }

    self.distortion() / self.len() as f64
  }

  /// The cluster's principal axis, or `None` when PCA fails.
  pub fn principal_axis(&self) -> Option<&Vector3<f64>> {
    self
      .principal_axis
      .get_or_init(|| math::perform_pca(self.colors(), self.weights()).map(|pca| pca.axis))
      .as_ref()
  }
}
