//! Command-line argument parsing for the palettize CLI.

use crate::ColorSpace;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the palettize CLI tool.
///
/// A command-line tool for quantizing images to a reduced color palette,
/// with optional Riemersma dithering.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Args {
  /// Input image file path
  #[clap(short, long = "in")]
  pub in_img: PathBuf,

  /// Output image file path (optional)
  #[clap(short, long = "out")]
  pub out_img: Option<PathBuf>,

  /// Number of palette colors to quantize to
  #[clap(short = 'k', long = "colors", default_value_t = 16)]
  pub palette_size: usize,

  /// Working color space for palette generation
  #[clap(short = 's', long = "space", default_value_t, value_enum)]
  pub color_space: ColorSpace,

  /// Enable Riemersma dithering
  #[clap(short, long)]
  pub dither: bool,

  /// Number of k-means refinement iterations (0 disables refinement)
  #[clap(long = "kmeans-iters", default_value_t = 32)]
  pub kmeans_niter: i32,
}
