//! Palette creation and nearest-color mapping.

use kiddo::{ImmutableKdTree, SquaredEuclidean};
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::quantize::cluster::ColorCluster;

/// Creates a color palette from a list of clusters, one entry per cluster
/// center.
pub fn create_palette(clusters: &[ColorCluster]) -> Vec<Vector3<f64>> {
  clusters.iter().map(|cluster| *cluster.center()).collect()
}

/// Builds a kd-tree over a palette, scaling every stored color
/// channel-wise by `scales`. Queries against the index must be scaled the
/// same way, so that Euclidean distances in index space become
/// channel-weighted distances in color space.
pub fn build_palette_index(palette: &[Vector3<f64>], scales: Vector3<f64>) -> ImmutableKdTree<f64, 3> {
  let entries: Vec<[f64; 3]> = palette
    .iter()
    .map(|c| [c.x * scales.x, c.y * scales.y, c.z * scales.z])
    .collect();

  ImmutableKdTree::new_from_slice(&entries)
}

/// Index of the palette color closest to a query point.
pub fn find_closest(index: &ImmutableKdTree<f64, 3>, query: Vector3<f64>) -> usize {
  index.nearest_one::<SquaredEuclidean>(&[query.x, query.y, query.z]).item as usize
}

/// Maps every color to its closest palette color.
pub fn map_nearest(colors: &[Vector3<f64>], palette: &[Vector3<f64>], palette_map: &mut [usize]) {
  let index = build_palette_index(palette, Vector3::new(1.0, 1.0, 1.0));

  colors
    .par_iter()
    .zip(palette_map.par_iter_mut())
    .for_each(|(color, slot)| {
      *slot = find_closest(&index, *color);
    });
}
