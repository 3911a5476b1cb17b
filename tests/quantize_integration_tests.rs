use palettize::{quantize, ColorSpace, QuantizeOptions};

/// Builds column-major channel data from interleaved (r, g, b) pixels.
fn to_column_major(pixels: &[(f64, f64, f64)]) -> Vec<f64> {
  let n = pixels.len();
  let mut data = vec![0.0; n * 3];

  for (i, &(r, g, b)) in pixels.iter().enumerate() {
    data[i] = r;
    data[n + i] = g;
    data[2 * n + i] = b;
  }

  data
}

fn plain_options(color_space: ColorSpace) -> QuantizeOptions {
  QuantizeOptions {
    dither: false,
    palette_only: false,
    color_space,
    kmeans_niter: 0,
    kmeans_max_samples: 512 * 512,
  }
}

/// Palette rows that are not the -1 sentinel.
fn valid_entries(palette: &[f64], palette_size: usize) -> Vec<(f64, f64, f64)> {
  (0..palette_size)
    .filter(|&i| palette[i] != -1.0 || palette[palette_size + i] != -1.0 || palette[2 * palette_size + i] != -1.0)
    .map(|i| (palette[i], palette[palette_size + i], palette[2 * palette_size + i]))
    .collect()
}

fn close(a: f64, b: f64, tol: f64) -> bool {
  (a - b).abs() < tol
}

#[test]
fn test_solid_2x2_yields_one_entry_and_sentinels() {
  let pixels = vec![(0.5, 0.5, 0.5); 4];
  let data = to_column_major(&pixels);

  let palette_size = 4;
  let mut palette = vec![0.0; palette_size * 3];
  let mut map = vec![usize::MAX; 4];

  quantize(2, 2, &data, None, palette_size, &plain_options(ColorSpace::Srgb), &mut palette, &mut map).unwrap();

  let entries = valid_entries(&palette, palette_size);
  assert_eq!(entries.len(), 1);
  assert!(close(entries[0].0, 0.5, 1e-6));
  assert!(close(entries[0].1, 0.5, 1e-6));
  assert!(close(entries[0].2, 0.5, 1e-6));

  // Three sentinel entries per channel
  for channel in 0..3 {
    let base = channel * palette_size;
    assert_eq!(&palette[base + 1..base + 4], &[-1.0, -1.0, -1.0]);
  }

  assert_eq!(map, vec![0, 0, 0, 0]);
}

#[test]
fn test_bi_color_2x1_recovers_both_colors() {
  let pixels = vec![(1.0, 0.0, 0.0), (0.0, 0.0, 1.0)];
  let data = to_column_major(&pixels);

  let palette_size = 2;
  let mut palette = vec![0.0; palette_size * 3];
  let mut map = vec![usize::MAX; 2];

  quantize(2, 1, &data, None, palette_size, &plain_options(ColorSpace::Srgb), &mut palette, &mut map).unwrap();

  let entries = valid_entries(&palette, palette_size);
  assert_eq!(entries.len(), 2);

  let red = entries.iter().position(|e| close(e.0, 1.0, 1e-4) && close(e.2, 0.0, 1e-4));
  let blue = entries.iter().position(|e| close(e.0, 0.0, 1e-4) && close(e.2, 1.0, 1e-4));

  let red = red.expect("palette should contain red");
  let blue = blue.expect("palette should contain blue");

  assert_eq!(map[0], red);
  assert_eq!(map[1], blue);
}

#[test]
fn test_gradient_4x4_splits_into_contiguous_halves() {
  // Red fades to blue along the x axis
  let mut pixels = Vec::new();
  for _y in 0..4 {
    for x in 0..4 {
      let t = x as f64 / 3.0;
      pixels.push((1.0 - t, 0.0, t));
    }
  }
  let data = to_column_major(&pixels);

  let palette_size = 2;
  let mut palette = vec![0.0; palette_size * 3];
  let mut map = vec![usize::MAX; 16];

  quantize(4, 4, &data, None, palette_size, &plain_options(ColorSpace::CieLuv), &mut palette, &mut map).unwrap();

  let entries = valid_entries(&palette, palette_size);
  assert_eq!(entries.len(), 2);

  // Centers stay on the red-blue line: hardly any green
  for entry in &entries {
    assert!(entry.1 < 0.25, "green component {} too large", entry.1);
  }

  // Every column maps to one palette index, and the index switches exactly
  // once along the gradient
  let first_row: Vec<usize> = map[0..4].to_vec();
  for y in 1..4 {
    assert_eq!(&map[y * 4..y * 4 + 4], &first_row[..]);
  }

  let switches = first_row.windows(2).filter(|w| w[0] != w[1]).count();
  assert_eq!(switches, 1, "expected one boundary, got map row {:?}", first_row);
}

#[test]
fn test_single_color_palette_is_the_weighted_mean() {
  // A photograph-like spread of more than a thousand mixed colors
  let pixels: Vec<(f64, f64, f64)> = (0..1200)
    .map(|i| {
      let t = i as f64 / 1199.0;
      (
        (t * 12.9).sin() * 0.5 + 0.5,
        (t * 5.3).cos() * 0.5 + 0.5,
        (t * 37.1).sin() * 0.25 + 0.5,
      )
    })
    .collect();
  let data = to_column_major(&pixels);
  let weights: Vec<f64> = (0..1200).map(|i| 1.0 + (i % 10) as f64).collect();

  let mut palette = vec![0.0; 3];
  let mut map = vec![usize::MAX; 1200];

  quantize(40, 30, &data, Some(&weights), 1, &plain_options(ColorSpace::Srgb), &mut palette, &mut map).unwrap();

  let total: f64 = weights.iter().sum();
  let mean_r: f64 = pixels.iter().zip(&weights).map(|(p, w)| p.0 * w).sum::<f64>() / total;
  let mean_g: f64 = pixels.iter().zip(&weights).map(|(p, w)| p.1 * w).sum::<f64>() / total;
  let mean_b: f64 = pixels.iter().zip(&weights).map(|(p, w)| p.2 * w).sum::<f64>() / total;

  assert!(close(palette[0], mean_r, 1e-6));
  assert!(close(palette[1], mean_g, 1e-6));
  assert!(close(palette[2], mean_b, 1e-6));

  assert!(map.iter().all(|&p| p == 0));
}

#[test]
fn test_more_palette_slots_than_unique_colors() {
  // Three distinct colors, eight requested
  let base = [(0.9, 0.1, 0.1), (0.1, 0.9, 0.1), (0.1, 0.1, 0.9)];
  let pixels: Vec<(f64, f64, f64)> = (0..12).map(|i| base[i % 3]).collect();
  let data = to_column_major(&pixels);

  let palette_size = 8;
  let mut palette = vec![0.0; palette_size * 3];
  let mut map = vec![usize::MAX; 12];

  quantize(4, 3, &data, None, palette_size, &plain_options(ColorSpace::Srgb), &mut palette, &mut map).unwrap();

  let entries = valid_entries(&palette, palette_size);
  assert_eq!(entries.len(), 3);

  for &(r, g, b) in &base {
    assert!(
      entries.iter().any(|e| close(e.0, r, 1e-4) && close(e.1, g, 1e-4) && close(e.2, b, 1e-4)),
      "palette misses ({}, {}, {})",
      r,
      g,
      b
    );
  }

  // Five sentinels per channel
  for channel in 0..3 {
    let base = channel * palette_size;
    assert!(palette[base + 3..base + 8].iter().all(|&v| v == -1.0));
  }

  assert!(map.iter().all(|&p| p < 3));
}

#[test]
fn test_dithered_ramp_tracks_the_input() {
  // Horizontal gray ramp, two palette colors
  let width = 32;
  let pixels: Vec<(f64, f64, f64)> = (0..width)
    .map(|i| {
      let t = i as f64 / (width - 1) as f64;
      (t, t, t)
    })
    .collect();
  let data = to_column_major(&pixels);

  let options = QuantizeOptions {
    dither: true,
    palette_only: false,
    color_space: ColorSpace::Srgb,
    kmeans_niter: 0,
    kmeans_max_samples: 512 * 512,
  };

  let palette_size = 2;
  let mut palette = vec![0.0; palette_size * 3];
  let mut map = vec![usize::MAX; width];

  quantize(width, 1, &data, None, palette_size, &options, &mut palette, &mut map).unwrap();

  let entries = valid_entries(&palette, palette_size);
  assert_eq!(entries.len(), 2);
  assert!(map.iter().all(|&p| p < 2));

  // Both palette entries take part in the pattern
  assert!(map.iter().any(|&p| p == 0));
  assert!(map.iter().any(|&p| p == 1));

  // The running mean of the mapped values approximates the ramp
  let luminance: Vec<f64> = map.iter().map(|&p| (entries[p].0 + entries[p].1 + entries[p].2) / 3.0).collect();
  let window = 8;
  for start in 0..=(width - window) {
    let mapped: f64 = luminance[start..start + window].iter().sum::<f64>() / window as f64;
    let input: f64 = (start..start + window).map(|i| i as f64 / (width - 1) as f64).sum::<f64>() / window as f64;
    assert!(
      (mapped - input).abs() < 0.4,
      "window at {} diverges: mapped {} vs input {}",
      start,
      mapped,
      input
    );
  }
}

#[test]
fn test_single_row_and_single_column_images_succeed() {
  for (width, height) in [(7, 1), (1, 7)] {
    let pixels: Vec<(f64, f64, f64)> = (0..width * height)
      .map(|i| {
        let t = i as f64 / 6.0;
        (t, 0.5, 1.0 - t)
      })
      .collect();
    let data = to_column_major(&pixels);

    let mut palette = vec![0.0; 2 * 3];
    let mut map = vec![usize::MAX; 7];

    quantize(width, height, &data, None, 2, &plain_options(ColorSpace::Srgb), &mut palette, &mut map).unwrap();
    assert!(map.iter().all(|&p| p < 2));
  }
}

#[test]
fn test_1x1_image_with_dithering() {
  let data = vec![0.3, 0.6, 0.9];
  let options = QuantizeOptions {
    dither: true,
    palette_only: false,
    color_space: ColorSpace::Srgb,
    kmeans_niter: 0,
    kmeans_max_samples: 512 * 512,
  };

  let mut palette = vec![0.0; 3];
  let mut map = vec![usize::MAX; 1];

  quantize(1, 1, &data, None, 1, &options, &mut palette, &mut map).unwrap();

  assert_eq!(map, vec![0]);
  assert!(close(palette[0], 0.3, 1e-6));
  assert!(close(palette[1], 0.6, 1e-6));
  assert!(close(palette[2], 0.9, 1e-6));
}

#[test]
fn test_dithered_output_stays_in_palette_range() {
  let pixels: Vec<(f64, f64, f64)> = (0..64)
    .map(|i| {
      let t = i as f64 / 63.0;
      ((t * 3.7).sin() * 0.5 + 0.5, t, 1.0 - t)
    })
    .collect();
  let data = to_column_major(&pixels);

  let options = QuantizeOptions {
    dither: true,
    palette_only: false,
    color_space: ColorSpace::ICtCp,
    kmeans_niter: 2,
    kmeans_max_samples: 512 * 512,
  };

  let palette_size = 6;
  let mut palette = vec![0.0; palette_size * 3];
  let mut map = vec![usize::MAX; 64];

  quantize(8, 8, &data, None, palette_size, &options, &mut palette, &mut map).unwrap();

  let entries = valid_entries(&palette, palette_size);
  assert!(!entries.is_empty());
  assert!(map.iter().all(|&p| p < entries.len()));
}

#[test]
fn test_kmeans_refinement_keeps_separated_colors() {
  // Two tight blobs; refinement must not merge them
  let mut pixels = Vec::new();
  for i in 0..32 {
    let jitter = (i % 4) as f64 * 0.004;
    pixels.push((0.1 + jitter, 0.1, 0.1));
    pixels.push((0.9 - jitter, 0.9, 0.9));
  }
  let data = to_column_major(&pixels);

  let options = QuantizeOptions {
    dither: false,
    palette_only: false,
    color_space: ColorSpace::Srgb,
    kmeans_niter: 16,
    kmeans_max_samples: 512 * 512,
  };

  let palette_size = 2;
  let mut palette = vec![0.0; palette_size * 3];
  let mut map = vec![usize::MAX; 64];

  quantize(8, 8, &data, None, palette_size, &options, &mut palette, &mut map).unwrap();

  let entries = valid_entries(&palette, palette_size);
  assert_eq!(entries.len(), 2);

  let dark = entries.iter().any(|e| e.0 < 0.2);
  let bright = entries.iter().any(|e| e.0 > 0.8);
  assert!(dark && bright, "refined palette lost a blob: {:?}", entries);
}
