//! CLI application for palette quantization.
//!
//! This binary provides a command-line interface to the palettize library,
//! reducing an image to a fixed-size color palette with optional
//! Riemersma dithering.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use image::{ExtendedColorType, ImageReader};
use palettize::args::Args;
use palettize::{quantize, QuantizeOptions};

/// Opens an image file and returns its RGB buffer, width, and height.
///
/// # Panics
///
/// This function will panic if:
/// - The image file cannot be opened
/// - The image cannot be decoded
fn open_image(path: &PathBuf) -> (Vec<u8>, u32, u32) {
  let image = ImageReader::open(path).unwrap().decode().unwrap().into_rgb8();

  let (width, height) = image.dimensions();
  let buffer = image.into_raw();
  (buffer, width, height)
}

/// Converts an interleaved RGB byte buffer into the column-major [0, 1]
/// channel layout the library expects.
fn to_color_data(buffer: &[u8], px_count: usize) -> Vec<f64> {
  let mut color_data = vec![0.0; px_count * 3];

  for i in 0..px_count {
    color_data[i] = f64::from(buffer[i * 3]) / 255.0;
    color_data[px_count + i] = f64::from(buffer[i * 3 + 1]) / 255.0;
    color_data[2 * px_count + i] = f64::from(buffer[i * 3 + 2]) / 255.0;
  }

  color_data
}

/// Resolves every pixel through the palette map into an interleaved RGB
/// byte buffer.
fn to_rgb_buffer(palette: &[f64], palette_map: &[usize], palette_size: usize) -> Vec<u8> {
  let mut buffer = vec![0u8; palette_map.len() * 3];

  for (i, &p) in palette_map.iter().enumerate() {
    buffer[i * 3] = (palette[p].clamp(0.0, 1.0) * 255.0).round() as u8;
    buffer[i * 3 + 1] = (palette[palette_size + p].clamp(0.0, 1.0) * 255.0).round() as u8;
    buffer[i * 3 + 2] = (palette[2 * palette_size + p].clamp(0.0, 1.0) * 255.0).round() as u8;
  }

  buffer
}

/// Main entry point for the palettize CLI application.
fn main() {
  env_logger::init();

  // get cli arguments
  let args = Args::parse();

  // open image
  let (buffer, width, height) = open_image(&args.in_img);
  let px_count = (width * height) as usize;
  let color_data = to_color_data(&buffer, px_count);

  let options = QuantizeOptions {
    dither: args.dither,
    color_space: args.color_space,
    kmeans_niter: args.kmeans_niter,
    ..QuantizeOptions::default()
  };

  // quantize image
  let mut palette = vec![0.0; args.palette_size * 3];
  let mut palette_map = vec![0usize; px_count];

  if let Err(error) = quantize(
    width as usize,
    height as usize,
    &color_data,
    None,
    args.palette_size,
    &options,
    &mut palette,
    &mut palette_map,
  ) {
    eprintln!("palettize: {error}");
    process::exit(error.exit_code());
  }

  let out_buffer = to_rgb_buffer(&palette, &palette_map, args.palette_size);

  // save file
  let out_path = match args.out_img {
    Some(out_img) => out_img,
    None => {
      // if no output image is specified, save to the same path with "_out" suffix
      let mut out_path = args.in_img.clone();
      out_path.set_file_name(format!(
        "{}_out.{}",
        out_path.file_stem().unwrap().to_str().unwrap(),
        out_path.extension().unwrap().to_str().unwrap()
      ));
      out_path
    }
  };

  println!("Saving output image to: {:?}", out_path);
  let _ = image::save_buffer(&out_path, &out_buffer, width, height, ExtendedColorType::Rgb8);
}
