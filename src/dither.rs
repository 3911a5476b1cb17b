//! Riemersma dithering along a Hilbert space-filling curve.
//!
//! Input colors are expected in Linear Rec2020; dithering in this wider
//! gamut produces more pleasant results than linear sRGB. The traversal
//! follows the scheme described at <https://www.compuphase.com/riemer.htm>.

use kiddo::ImmutableKdTree;
use nalgebra::Vector3;

use crate::palette::{build_palette_index, find_closest};

/// Error queue size.
const Q: usize = 16;

/// Ratio between the weights of the last and first error queue entries.
const QR: f64 = 16.0;

// The channel weights below are the square roots of the Rec2020 Y
// (luminance) coefficients. Palette colors are stored in the nearest
// neighbour index pre-scaled by them, and queries are scaled the same way,
// so squared Euclidean distances in index space equal luminance-weighted
// squared distances in color space.

// sqrt(0.2627)
const R_WEIGHT: f64 = 0.51254268114958;
// sqrt(0.678)
const G_WEIGHT: f64 = 0.8234075540095561;
// sqrt(0.0593)
const B_WEIGHT: f64 = 0.2435159132377184;

/// Directions for traversing the Hilbert curve. `None` visits the current
/// cell without stepping.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Direction {
  None,
  Up,
  Left,
  Right,
  Down,
}

/// State threaded through the Hilbert traversal. All buffers live for a
/// single dither call.
struct DitherContext<'a> {
  x: i64,
  y: i64,
  width: usize,
  height: usize,
  error_queue: [Vector3<f64>; Q],
  weights: [f64; Q],
  image: Vec<Vector3<f64>>,
  palette: &'a [Vector3<f64>],
  palette_map: &'a mut [usize],
  index: ImmutableKdTree<f64, 3>,
}

/// Level (order) of the Hilbert curve covering a `width` x `height` grid:
/// the smallest L with 2^L >= max(width, height).
fn hilbert_level(width: usize, height: usize) -> u32 {
  let max = width.max(height);

  let mut level = 0u32;
  let mut value = max;
  while value > 1 {
    value >>= 1;
    level += 1;
  }

  if (1usize << level) < max {
    level += 1;
  }

  level
}

/// Error queue weights: a geometric progression from 1/QR (oldest entry)
/// to 1 (most recent).
fn error_weights() -> [f64; Q] {
  let m = (QR.ln() / (Q as f64 - 1.0)).exp();

  let mut weights = [0.0; Q];
  let mut v = 1.0;
  for w in weights.iter_mut() {
    *w = v / QR;
    v *= m;
  }

  weights
}

/// Dithers the pixel at the current position.
///
/// The accumulated queue error is added to the pixel, the closest palette
/// color to the corrected value is looked up, written to the image and the
/// palette map, and the fresh residual enters the queue.
fn dither_pixel(ctx: &mut DitherContext) {
  let mut error = Vector3::zeros();
  for i in 0..Q {
    error += ctx.error_queue[i] * ctx.weights[i];
  }

  let offset = ctx.y as usize * ctx.width + ctx.x as usize;
  let current = ctx.image[offset];

  // Deliberately not clamped to [0, 1]; clamping gives slightly worse
  // results.
  let corrected = current + error;

  let index = find_closest(
    &ctx.index,
    Vector3::new(corrected.x * R_WEIGHT, corrected.y * G_WEIGHT, corrected.z * B_WEIGHT),
  );
  let chosen = ctx.palette[index];

  ctx.image[offset] = chosen;
  ctx.palette_map[offset] = index;

  ctx.error_queue.rotate_left(1);
  ctx.error_queue[Q - 1] = current - chosen;
}

/// Dithers the pixel at the current position (if it lies inside the
/// image), then steps in some direction.
fn step(ctx: &mut DitherContext, direction: Direction) {
  if ctx.x >= 0 && (ctx.x as usize) < ctx.width && ctx.y >= 0 && (ctx.y as usize) < ctx.height {
    dither_pixel(ctx);
  }

  match direction {
    Direction::Left => ctx.x -= 1,
    Direction::Right => ctx.x += 1,
    Direction::Up => ctx.y -= 1,
    Direction::Down => ctx.y += 1,
    Direction::None => {}
  }
}

/// Traverses an order-`level` Hilbert curve, dithering each encountered
/// pixel. Cells outside the image are skipped silently.
fn traverse_level(ctx: &mut DitherContext, level: u32, direction: Direction) {
  if level == 1 {
    match direction {
      Direction::Left => {
        step(ctx, Direction::Right);
        step(ctx, Direction::Down);
        step(ctx, Direction::Left);
      }
      Direction::Right => {
        step(ctx, Direction::Left);
        step(ctx, Direction::Up);
        step(ctx, Direction::Right);
      }
      Direction::Up => {
        step(ctx, Direction::Down);
        step(ctx, Direction::Right);
        step(ctx, Direction::Up);
      }
      Direction::Down => {
        step(ctx, Direction::Up);
        step(ctx, Direction::Left);
        step(ctx, Direction::Down);
      }
      Direction::None => {}
    }
  } else {
    match direction {
      Direction::Left => {
        traverse_level(ctx, level - 1, Direction::Up);
        step(ctx, Direction::Right);
        traverse_level(ctx, level - 1, Direction::Left);
        step(ctx, Direction::Down);
        traverse_level(ctx, level - 1, Direction::Left);
        step(ctx, Direction::Left);
        traverse_level(ctx, level - 1, Direction::Down);
      }
      Direction::Right => {
        traverse_level(ctx, level - 1, Direction::Down);
        step(ctx, Direction::Left);
        traverse_level(ctx, level - 1, Direction::Right);
        step(ctx, Direction::Up);
        traverse_level(ctx, level - 1, Direction::Right);
        step(ctx, Direction::Right);
        traverse_level(ctx, level - 1, Direction::Up);
      }
      Direction::Up => {
        traverse_level(ctx, level - 1, Direction::Left);
        step(ctx, Direction::Down);
        traverse_level(ctx, level - 1, Direction::Up);
        step(ctx, Direction::Right);
        traverse_level(ctx, level - 1, Direction::Up);
        step(ctx, Direction::Up);
        traverse_level(ctx, level - 1, Direction::Right);
      }
      Direction::Down => {
        traverse_level(ctx, level - 1, Direction::Right);
        step(ctx, Direction::Up);
        traverse_level(ctx, level - 1, Direction::Down);
        step(ctx, Direction::Left);
        traverse_level(ctx, level - 1, Direction::Down);
        step(ctx, Direction::Down);
        traverse_level(ctx, level - 1, Direction::Left);
      }
      Direction::None => {}
    }
  }
}

/// Riemersma-dithers an image against a palette, writing the chosen
/// palette index of every pixel into `palette_map`.
///
/// `colors` holds the image pixels in Linear Rec2020, scanned left to
/// right, top to bottom; the palette must be in the same space.
///
/// # Panics
///
/// Panics if `colors` or `palette_map` is shorter than `width * height`,
/// or if the palette is empty.
pub fn riemersma(
  colors: &[Vector3<f64>],
  width: usize,
  height: usize,
  palette: &[Vector3<f64>],
  palette_map: &mut [usize],
) {
  let scales = Vector3::new(R_WEIGHT, G_WEIGHT, B_WEIGHT);

  let mut ctx = DitherContext {
    x: 0,
    y: 0,
    width,
    height,
    error_queue: [Vector3::zeros(); Q],
    weights: error_weights(),
    image: colors[..width * height].to_vec(),
    palette,
    palette_map,
    index: build_palette_index(palette, scales),
  };

  let level = hilbert_level(width, height);
  if level > 0 {
    traverse_level(&mut ctx, level, Direction::Up);
  }

  // Final visit; also covers the level-0 case of a 1x1 image
  step(&mut ctx, Direction::None);
}
