//! # Palettize
//!
//! A Rust library for reducing an image to a palette of representative
//! colors, with optional Riemersma dithering.
//!
//! The palette is built in two stages: a global quantizer partitions the
//! color set along its principal axis via dynamic programming on
//! cumulative moments, and a greedy local splitter cuts the resulting
//! clusters along their own principal axes until the requested palette
//! size is reached. The palette can then be polished with weighted k-means
//! and mapped onto the image, either by plain nearest-neighbour lookup or
//! by dithering along a Hilbert curve.
//!
//! ## Example
//!
//! ```no_run
//! use palettize::{quantize, QuantizeOptions};
//!
//! let (width, height) = (2, 2);
//! // Column-major sRGB channels: all R, then all G, then all B
//! let color_data = vec![0.5; width * height * 3];
//!
//! let palette_size = 4;
//! let mut palette = vec![0.0; palette_size * 3];
//! let mut palette_map = vec![0usize; width * height];
//!
//! let options = QuantizeOptions::default();
//! quantize(width, height, &color_data, None, palette_size, &options, &mut palette, &mut palette_map).unwrap();
//! ```

pub mod args;
pub mod color;
pub mod dither;
pub mod kmeans;
pub mod math;
pub mod palette;
pub mod quantize;

use log::debug;
use nalgebra::Vector3;

/// Spread threshold shared by the termination, benefit and degeneracy
/// checks across the pipeline.
pub(crate) const DELTA: f64 = 1e-5;

/// Largest accepted pixel count.
const MAX_PIXELS: usize = 40000 * 40000;

/// Color space in which the palette is generated.
///
/// Dithering always runs in Linear Rec2020 and plain nearest-neighbour
/// mapping always in ICtCp, regardless of this choice. The output palette
/// is always sRGB.
#[derive(clap::ValueEnum, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ColorSpace {
  /// Non-linear sRGB
  Srgb,
  /// CIELuv with a D65 reference white
  CieLuv,
  /// ICtCp with a halved Ct coordinate
  #[default]
  ICtCp,
}

/// Quantization options.
#[derive(Clone, Debug)]
pub struct QuantizeOptions {
  /// Enable Riemersma dithering when producing the palette map.
  pub dither: bool,
  /// Only generate the palette; leave the palette map untouched.
  pub palette_only: bool,
  /// Working color space for palette generation.
  pub color_space: ColorSpace,
  /// Number of k-means refinement iterations; anything <= 0 disables
  /// refinement.
  pub kmeans_niter: i32,
  /// Maximum number of samples used by k-means refinement. A hard minimum
  /// of 256 * 256 is enforced internally.
  pub kmeans_max_samples: usize,
}

impl Default for QuantizeOptions {
  fn default() -> Self {
    QuantizeOptions {
      dither: true,
      palette_only: false,
      color_space: ColorSpace::ICtCp,
      kmeans_niter: 32,
      kmeans_max_samples: 512 * 512,
    }
  }
}

/// Quantization failure.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum QuantizeError {
  /// The quantizer could not analyze the color set.
  #[error("internal quantization error")]
  QuantizationFailed,
  /// The image has no pixels.
  #[error("image dimensions should be greater than 0")]
  EmptyImage,
  /// The requested palette size is zero.
  #[error("palette size should be greater than 0")]
  BadPaletteSize,
  /// The image exceeds the supported pixel count.
  #[error("image dimensions are too big")]
  ImageTooLarge,
}

impl QuantizeError {
  /// Stable integer exit code for this error; success is 0.
  pub fn exit_code(&self) -> i32 {
    match self {
      QuantizeError::QuantizationFailed => -1,
      QuantizeError::EmptyImage => -2,
      QuantizeError::BadPaletteSize => -3,
      QuantizeError::ImageTooLarge => -4,
    }
  }
}

fn validate_arguments(width: usize, height: usize, palette_size: usize) -> Result<(), QuantizeError> {
  let px_count = width * height;

  if px_count == 0 {
    return Err(QuantizeError::EmptyImage);
  }

  if palette_size < 1 {
    return Err(QuantizeError::BadPaletteSize);
  }

  if px_count > MAX_PIXELS {
    return Err(QuantizeError::ImageTooLarge);
  }

  Ok(())
}

/// Quantizes an image to a palette of at most `palette_size` colors.
///
/// `color_data` holds `width * height * 3` sRGB values in `[0, 1]`,
/// column-major per channel: all red values first, then all green values,
/// then all blue values, each channel scanned left to right, top to
/// bottom. `weight_data`, when present, holds one weight >= 1 per pixel.
///
/// On success, `palette_out` (column-major, `palette_size * 3` values)
/// receives the generated sRGB palette; entries beyond the number of
/// generated colors are set to the sentinel -1 per channel. Unless
/// `options.palette_only` is set, `palette_map_out` receives the palette
/// index of every pixel. On error both outputs are left untouched.
///
/// # Panics
///
/// Panics if, after argument validation passes, `color_data`,
/// `weight_data`, `palette_out` or `palette_map_out` is shorter than the
/// sizes implied by `width`, `height` and `palette_size`.
#[allow(clippy::too_many_arguments)]
pub fn quantize(
  width: usize,
  height: usize,
  color_data: &[f64],
  weight_data: Option<&[f64]>,
  palette_size: usize,
  options: &QuantizeOptions,
  palette_out: &mut [f64],
  palette_map_out: &mut [usize],
) -> Result<(), QuantizeError> {
  validate_arguments(width, height, palette_size)?;

  let px_count = width * height;
  assert!(color_data.len() >= px_count * 3, "color data too short");
  assert!(palette_out.len() >= palette_size * 3, "palette output too short");
  if let Some(weights) = weight_data {
    assert!(weights.len() >= px_count, "weight data too short");
  }
  if !options.palette_only {
    assert!(palette_map_out.len() >= px_count, "palette map output too short");
  }

  let mut colors: Vec<Vector3<f64>> = (0..px_count)
    .map(|i| Vector3::new(color_data[i], color_data[px_count + i], color_data[2 * px_count + i]))
    .collect();

  match options.color_space {
    ColorSpace::CieLuv => color::srgb_to_cieluv(&mut colors),
    ColorSpace::ICtCp => color::srgb_to_ictcp(&mut colors),
    ColorSpace::Srgb => {}
  }

  debug!("palette generation");
  let gq_clusters =
    quantize::global::quantize(&colors, weight_data, palette_size).ok_or(QuantizeError::QuantizationFailed)?;
  debug!("base cluster count: {}", gq_clusters.len());

  let clusters = quantize::local::quantize(gq_clusters, palette_size);

  let mut palette_colors = if options.kmeans_niter > 0 {
    debug!("k-means refinement");
    kmeans::refine_centers(
      &colors,
      weight_data,
      palette::create_palette(&clusters),
      options.kmeans_niter as u32,
      options.kmeans_max_samples,
    )
  } else {
    palette::create_palette(&clusters)
  };

  // The clusters borrow the colors; mapping needs them mutable again
  drop(clusters);

  if !options.palette_only {
    if options.dither {
      debug!("dithering");

      match options.color_space {
        ColorSpace::CieLuv => {
          color::cieluv_to_linear_rec2020(&mut colors);
          color::cieluv_to_linear_rec2020(&mut palette_colors);
        }
        ColorSpace::ICtCp => {
          color::ictcp_to_linear_rec2020(&mut colors);
          color::ictcp_to_linear_rec2020(&mut palette_colors);
        }
        ColorSpace::Srgb => {
          color::srgb_to_linear_rec2020(&mut colors);
          color::srgb_to_linear_rec2020(&mut palette_colors);
        }
      }

      dither::riemersma(&colors, width, height, &palette_colors, palette_map_out);

      color::linear_rec2020_to_srgb(&mut palette_colors);
    } else {
      debug!("nearest-neighbour mapping");

      // Plain mapping always runs in ICtCp
      match options.color_space {
        ColorSpace::CieLuv => {
          color::cieluv_to_linear_rec2020(&mut colors);
          color::cieluv_to_linear_rec2020(&mut palette_colors);
          color::linear_rec2020_to_srgb(&mut colors);
          color::linear_rec2020_to_srgb(&mut palette_colors);
          color::srgb_to_ictcp(&mut colors);
          color::srgb_to_ictcp(&mut palette_colors);
        }
        ColorSpace::Srgb => {
          color::srgb_to_ictcp(&mut colors);
          color::srgb_to_ictcp(&mut palette_colors);
        }
        ColorSpace::ICtCp => {}
      }

      palette::map_nearest(&colors, &palette_colors, palette_map_out);

      color::ictcp_to_linear_rec2020(&mut palette_colors);
      color::linear_rec2020_to_srgb(&mut palette_colors);
    }
  } else {
    // The palette is always handed back in sRGB
    match options.color_space {
      ColorSpace::CieLuv => {
        color::cieluv_to_linear_rec2020(&mut palette_colors);
        color::linear_rec2020_to_srgb(&mut palette_colors);
      }
      ColorSpace::ICtCp => {
        color::ictcp_to_linear_rec2020(&mut palette_colors);
        color::linear_rec2020_to_srgb(&mut palette_colors);
      }
      ColorSpace::Srgb => {}
    }
  }

  // Sentinel for unset palette entries
  for value in palette_out[..palette_size * 3].iter_mut() {
    *value = -1.0;
  }

  for (i, color) in palette_colors.iter().enumerate() {
    palette_out[i] = color.x;
    palette_out[palette_size + i] = color.y;
    palette_out[2 * palette_size + i] = color.z;
  }

  Ok(())
}
