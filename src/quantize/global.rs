//! Global principal quantization.
//!
//! From a set of colors, an initial list of color clusters is created by
//! optimizing a partition of the set's 1-D projection onto its principal
//! axis, following Wu's optimum quantization paper
//! (<https://dl.acm.org/doi/pdf/10.1145/146443.146475>) with a modified
//! termination criterion. The resulting clusters are usually fewer than
//! requested and are further split by the local quantizer.

use nalgebra::Vector3;

use crate::math;
use crate::quantize::cells::MomentsCache;
use crate::quantize::cluster::ColorCluster;
use crate::quantize::sort::axis_sort;
use crate::quantize::BUCKET_COUNT;
use crate::DELTA;

/// Most cells the global quantizer will ever produce.
const MAX_K: usize = 12;

/// Aggregate bias below which quantization stops.
const BIAS_THRESHOLD: f64 = 0.1;

/// Minimum bias a cell needs to contribute to the aggregate bias.
const CELL_BIAS_THRESHOLD: f64 = 0.9;

/// Rebuilds a quantizer `[0 = q0, q1, ..., qk = n]` from the DP
/// back-pointer table.
fn l_chain(l: &[Vec<usize>], k: usize, n: usize) -> Vec<usize> {
  let mut chain = vec![0; k + 1];

  let mut t = n;
  for j in (1..k).rev() {
    t = l[j + 1][t];
    chain[j] = t;
  }

  chain[k] = n;
  chain
}

/// Decides whether global quantization should stop at the current
/// quantizer.
///
/// Every cell whose principal axis is strongly aligned with the color
/// set's principal axis contributes to an aggregate bias, proportionally
/// to its share of the total distortion. Once no cell is both biased and
/// distortion-dominant, further 1-D splitting is unproductive and the
/// local quantizer takes over.
///
/// Returns `None` when a cell bias query fails.
fn should_terminate(quantizer: &[usize], axis: &Vector3<f64>, cache: &MomentsCache) -> Option<bool> {
  let mut distortion = 0.0;
  for cell in quantizer.windows(2) {
    distortion += cache.cell_distortion(cell[0], cell[1]);
  }

  if distortion < DELTA {
    return Some(true);
  }

  let mut bias = 0.0;
  for cell in quantizer.windows(2) {
    let cell_distortion = cache.cell_distortion(cell[0], cell[1]);
    let cell_bias = cache.cell_bias(cell[0], cell[1], axis)?;

    if cell_bias < CELL_BIAS_THRESHOLD {
      continue;
    }

    bias += (cell_distortion / distortion) * cell_bias;
  }

  Some(bias < BIAS_THRESHOLD)
}

/// Computes the principal quantizer over the bucket axis: the partition of
/// `(0, n]` into up to `min(MAX_K, palette_size)` cells minimizing total
/// distortion, cut short by the termination criterion.
fn principal_quantizer(palette_size: usize, cache: &MomentsCache) -> Option<Vec<usize>> {
  let n = cache.size() - 1;
  let pca = cache.cell_pca(0, n)?;

  let k_max = MAX_K.min(palette_size);

  // E holds the best k-cell distortion of (0, i]; a copy of the previous
  // layer is kept so transitions never read values the current layer
  // already overwrote.
  let mut e = vec![0.0; n + 1];
  let mut e_prev = vec![0.0; n + 1];
  let mut l = vec![vec![0usize; n + 1]; k_max + 1];

  for i in 1..=n {
    e[i] = cache.cell_distortion(0, i);
  }

  for (i, row) in l.iter_mut().enumerate().skip(1) {
    row[i] = i;
  }

  let mut result = l_chain(&l, 1, n);

  for k in 2..=k_max {
    if should_terminate(&result, &pca.axis, cache)? {
      return Some(result);
    }

    e_prev.copy_from_slice(&e);

    for m in (k + 1)..=n {
      let mut cut = m - 1;
      let mut best = e_prev[m - 1] + cache.cell_distortion(m - 1, m);

      for t in (k - 1..=m - 2).rev() {
        let c = e_prev[t] + cache.cell_distortion(t, m);
        if c < best {
          cut = t;
          best = c;
        }
      }

      l[k][m] = cut;
      e[m] = best;
    }

    result = l_chain(&l, k, n);
  }

  Some(result)
}

/// Builds color clusters from the principal quantizer and the bucket map.
fn gather_clusters<'a>(
  colors: &'a [Vector3<f64>],
  weights: Option<&'a [f64]>,
  quantizer: &[usize],
  bucket_map: &[usize],
) -> Vec<ColorCluster<'a>> {
  let count = quantizer.len() - 1;

  // The bucket -> cell relationship can be cached
  let mut cell_of_bucket = vec![usize::MAX; BUCKET_COUNT];
  for &bucket in bucket_map {
    if cell_of_bucket[bucket] == usize::MAX {
      for j in 0..count {
        // Quantizer entries use 1-based bucket indexing
        if bucket + 1 <= quantizer[j + 1] {
          cell_of_bucket[bucket] = j;
          break;
        }
      }
    }
  }

  let mut indices: Vec<Vec<usize>> = vec![Vec::new(); count];
  for (i, &bucket) in bucket_map.iter().enumerate() {
    indices[cell_of_bucket[bucket]].push(i);
  }

  indices
    .into_iter()
    .map(|cell_indices| ColorCluster::new(colors, weights, cell_indices))
    .collect()
}

/// Performs global principal quantization.
///
/// Returns `None` when the color set cannot be analyzed (PCA failure on
/// the full set or on a cell mid-quantization). The desired palette size
/// is typically not reached; the remaining clusters are supplied by the
/// local quantizer.
pub fn quantize<'a>(
  colors: &'a [Vector3<f64>],
  weights: Option<&'a [f64]>,
  palette_size: usize,
) -> Option<Vec<ColorCluster<'a>>> {
  let pca = math::perform_pca(colors, weights)?;

  let bucket_map = axis_sort(colors, &pca.axis, BUCKET_COUNT);
  let cache = MomentsCache::build(colors, &bucket_map, BUCKET_COUNT);

  let quantizer = principal_quantizer(palette_size, &cache)?;
  Some(gather_clusters(colors, weights, &quantizer, &bucket_map))
}
