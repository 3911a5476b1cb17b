//! Greedy local cluster splitting.
//!
//! Turns a set of K color clusters into a set of N > K clusters by
//! repeatedly splitting the cluster whose split yields the largest
//! distortion reduction. Each cluster is cut at the optimal bucket along
//! its own principal axis.

use crate::quantize::cluster::ColorCluster;
use crate::quantize::sort::axis_sort;
use crate::quantize::BUCKET_COUNT;
use crate::DELTA;

/// A speculative split of a cluster into two children. Exactly one pair is
/// adopted per split; moving the children out consumes the pair.
pub struct ClusterPair<'a> {
  pub left: ColorCluster<'a>,
  pub right: ColorCluster<'a>,
}

/// Picks the bucket boundary that maximizes the one-dimensional
/// between-groups sum of squares over a bucket-sorting of the cluster's
/// colors.
fn optimal_bucket_index(cluster: &ColorCluster, bucket_map: &[usize]) -> usize {
  let colors = cluster.colors();
  let weights = cluster.weights();

  // Intra-bucket weighted sums and weighted counts, made cumulative
  let mut sums = vec![nalgebra::Vector3::<f64>::zeros(); BUCKET_COUNT];
  let mut counts = vec![0.0; BUCKET_COUNT];

  for (i, &bucket) in bucket_map.iter().enumerate() {
    let w = weights.map_or(1.0, |w| w[i]);
    sums[bucket] += colors[i] * w;
    counts[bucket] += w;
  }

  for i in 1..BUCKET_COUNT {
    let prev = sums[i - 1];
    sums[i] += prev;
    counts[i] += counts[i - 1];
  }

  let total_sum = sums[BUCKET_COUNT - 1];
  let total_count = counts[BUCKET_COUNT - 1];

  let mut best_index = 0;
  let mut best = f64::NEG_INFINITY;

  for i in 0..BUCKET_COUNT {
    let left_count = counts[i];
    let right_count = total_count - left_count;

    let mut objective = 0.0;
    for j in 0..3 {
      let left_sum = sums[i][j];
      let right_sum = total_sum[j] - left_sum;

      if left_count != 0.0 {
        objective += left_sum * left_sum / left_count;
      }

      if right_count != 0.0 {
        objective += right_sum * right_sum / right_count;
      }
    }

    if objective > best {
      best = objective;
      best_index = i;
    }
  }

  best_index
}

/// Splits a cluster at the optimal bucket along its principal axis.
///
/// Returns `None` for unsplittable clusters (size <= 1, or PCA failure).
fn split_cluster<'a>(cluster: &ColorCluster<'a>) -> Option<ClusterPair<'a>> {
  if cluster.len() <= 1 {
    return None;
  }

  let axis = *cluster.principal_axis()?;
  let bucket_map = axis_sort(cluster.colors(), &axis, BUCKET_COUNT);
  let split_index = optimal_bucket_index(cluster, &bucket_map);

  let mut left_indices = Vec::new();
  let mut right_indices = Vec::new();

  for (i, &bucket) in bucket_map.iter().enumerate() {
    if bucket <= split_index {
      left_indices.push(cluster.indices()[i]);
    } else {
      right_indices.push(cluster.indices()[i]);
    }
  }

  let dataset = cluster.dataset();
  let dataset_weights = cluster.dataset_weights();

  Some(ClusterPair {
    left: ColorCluster::new(dataset, dataset_weights, left_indices),
    right: ColorCluster::new(dataset, dataset_weights, right_indices),
  })
}

/// Distortion reduction gained by replacing a cluster with its children.
fn split_benefit(cluster: &ColorCluster, children: Option<&ClusterPair>) -> f64 {
  match children {
    None => 0.0,
    Some(pair) => cluster.distortion() - (pair.left.distortion() + pair.right.distortion()),
  }
}

/// Index of the cluster with the maximum split benefit; ties break to the
/// first occurrence.
fn find_best_cluster_index(clusters: &[ColorCluster], children: &[Option<ClusterPair>]) -> usize {
  let mut best_index = 0;
  let mut best = f64::NEG_INFINITY;

  for (i, cluster) in clusters.iter().enumerate() {
    let benefit = split_benefit(cluster, children[i].as_ref());
    if benefit > best {
      best = benefit;
      best_index = i;
    }
  }

  best_index
}

/// Splits a set of clusters until `palette_size` clusters exist or no
/// split is worth making.
///
/// With `clusters.len() >= palette_size` the input is returned unchanged.
pub fn quantize<'a>(clusters: Vec<ColorCluster<'a>>, palette_size: usize) -> Vec<ColorCluster<'a>> {
  if clusters.len() >= palette_size {
    return clusters;
  }

  let mut result = clusters;
  let mut children: Vec<Option<ClusterPair>> = result.iter().map(split_cluster).collect();

  while result.len() < palette_size {
    let best_index = find_best_cluster_index(&result, &children);
    let benefit = split_benefit(&result[best_index], children[best_index].as_ref());

    if benefit < DELTA {
      break;
    }

    let ClusterPair { left, right } = children[best_index].take().expect("positive benefit implies a candidate pair");

    // The selected cluster is replaced by its right child; the left child
    // takes the next free slot. Both get their own candidate splits.
    let left_children = split_cluster(&left);
    let right_children = split_cluster(&right);

    result.push(left);
    children.push(left_children);

    result[best_index] = right;
    children[best_index] = right_children;
  }

  result
}
