//! Color space conversions between sRGB, CIELuv, CIE XYZ, Linear Rec2020 and ICtCp.
//!
//! All matrix-level converters operate in place on a slice of color vectors.
//! ICtCp triplets produced here are not true ICtCp: the Ct coordinate is
//! halved so that color differences can be evaluated with plain Euclidean
//! distances.

use nalgebra::Vector3;

// Reference white for the D65 illuminant
const RWX: f64 = 0.95047;
const RWY: f64 = 1.0;
const RWZ: f64 = 1.08883;

const K_E: f64 = 216.0 / 24389.0;
const K_K: f64 = 24389.0 / 27.0;
const K_KE: f64 = 8.0;

// SMPTE ST 2084 constants
const ST2084_LP: f64 = 10000.0;
const ST2084_M1: f64 = 0.1593017578125;
const ST2084_M2: f64 = 78.84375;
const ST2084_C1: f64 = 0.8359375;
const ST2084_C2: f64 = 18.8515625;
const ST2084_C3: f64 = 18.6875;

/// Decodes a gamma-encoded sRGB component, i.e. evaluates the sRGB transfer
/// function. The result is clamped to [0, 1].
pub fn srgb_gamma_decode(component: f64) -> f64 {
  let result = if component <= 0.0404500 {
    component / 12.92
  } else {
    ((component + 0.055) / 1.055).powf(2.4)
  };

  result.clamp(0.0, 1.0)
}

/// Gamma-encodes a linear sRGB component, i.e. evaluates the inverse sRGB
/// transfer function. The result is clamped to [0, 1].
pub fn srgb_gamma_encode(component: f64) -> f64 {
  let result = if component <= 0.0031308 {
    component * 12.92
  } else {
    1.055 * component.powf(1.0 / 2.4) - 0.055
  };

  result.clamp(0.0, 1.0)
}

/// SMPTE ST 2084 electro-optical transfer function.
fn st2084_eotf(component: f64) -> f64 {
  let v_p = component.powf(1.0 / ST2084_M2);
  let n = (v_p - ST2084_C1).max(0.0);
  let l = (n / (ST2084_C2 - ST2084_C3 * v_p)).powf(1.0 / ST2084_M1);
  ST2084_LP * l
}

/// Inverse of the SMPTE ST 2084 electro-optical transfer function.
fn st2084_eotf_inverse(component: f64) -> f64 {
  let y = (component / ST2084_LP).powf(ST2084_M1);
  ((ST2084_C1 + ST2084_C2 * y) / (1.0 + ST2084_C3 * y)).powf(ST2084_M2)
}

fn srgb_to_xyz(c: Vector3<f64>) -> Vector3<f64> {
  let r = srgb_gamma_decode(c.x);
  let g = srgb_gamma_decode(c.y);
  let b = srgb_gamma_decode(c.z);

  Vector3::new(
    r * 0.4124564 + g * 0.3575761 + b * 0.1804375,
    r * 0.2126729 + g * 0.7151522 + b * 0.0721750,
    r * 0.0193339 + g * 0.1191920 + b * 0.9503041,
  )
}

fn xyz_to_linear_rec2020(c: Vector3<f64>) -> Vector3<f64> {
  Vector3::new(
    c.x * 1.71666343 + c.y * -0.35567332 + c.z * -0.25336809,
    c.x * -0.66667384 + c.y * 1.61645574 + c.z * 0.0157683,
    c.x * 0.01764248 + c.y * -0.04277698 + c.z * 0.94224328,
  )
}

fn linear_rec2020_to_xyz(c: Vector3<f64>) -> Vector3<f64> {
  Vector3::new(
    c.x * 0.63695351 + c.y * 0.14461919 + c.z * 0.16885585,
    c.x * 0.26269834 + c.y * 0.67800877 + c.z * 0.0592929,
    c.y * 0.02807314 + c.z * 1.06082723,
  )
}

fn xyz_to_cieluv(c: Vector3<f64>) -> Vector3<f64> {
  let den = c.x + 15.0 * c.y + 3.0 * c.z;
  let up = if den > 0.0 { (4.0 * c.x) / den } else { 0.0 };
  let vp = if den > 0.0 { (9.0 * c.y) / den } else { 0.0 };

  let urp = (4.0 * RWX) / (RWX + 15.0 * RWY + 3.0 * RWZ);
  let vrp = (9.0 * RWY) / (RWX + 15.0 * RWY + 3.0 * RWZ);

  let yr = c.y / RWY;
  let l = if yr > K_E { 116.0 * yr.powf(1.0 / 3.0) - 16.0 } else { K_K * yr };

  Vector3::new(l, 13.0 * l * (up - urp), 13.0 * l * (vp - vrp))
}

fn cieluv_to_xyz(c: Vector3<f64>) -> Vector3<f64> {
  let (l, u, v) = (c.x, c.y, c.z);

  let y = if l > K_KE { ((l + 16.0) / 116.0).powi(3) } else { l / K_K };
  let u0 = (4.0 * RWX) / (RWX + 15.0 * RWY + 3.0 * RWZ);
  let v0 = (9.0 * RWY) / (RWX + 15.0 * RWY + 3.0 * RWZ);

  let a_den = u + 13.0 * l * u0;
  let a = if a_den == 0.0 { 0.0 } else { (((52.0 * l) / a_den) - 1.0) / 3.0 };

  let b = -5.0 * y;
  let c_ = -1.0 / 3.0;

  let d_den = v + 13.0 * l * v0;
  let d = if d_den == 0.0 { 0.0 } else { y * (((39.0 * l) / d_den) - 5.0) };

  let x_den = a - c_;
  let x = if x_den == 0.0 { 0.0 } else { (d - b) / x_den };

  Vector3::new(x, y, x * a + b)
}

fn linear_rec2020_to_ictcp(c: Vector3<f64>) -> Vector3<f64> {
  let l = (c.x * 1688.0 + c.y * 2146.0 + c.z * 262.0) / 4096.0;
  let m = (c.x * 683.0 + c.y * 2951.0 + c.z * 462.0) / 4096.0;
  let s = (c.x * 99.0 + c.y * 309.0 + c.z * 3688.0) / 4096.0;

  let l_ = st2084_eotf_inverse(l);
  let m_ = st2084_eotf_inverse(m);
  let s_ = st2084_eotf_inverse(s);

  let i = l_ * 0.5 + m_ * 0.5;
  let ct = (l_ * 6610.0 - m_ * 13613.0 + s_ * 7003.0) / 4096.0;
  let cp = (l_ * 17933.0 - m_ * 17390.0 - s_ * 543.0) / 4096.0;

  // Ct is halved so Euclidean distances approximate the ICtCp color
  // difference metric.
  Vector3::new(i, ct * 0.5, cp)
}

fn ictcp_to_linear_rec2020_color(c: Vector3<f64>) -> Vector3<f64> {
  let i = c.x;
  // Undo the halved Ct convention first
  let ct = c.y * 2.0;
  let cp = c.z;

  let l_ = i + 0.00860904 * ct + 0.11102963 * cp;
  let m_ = i - 0.00860904 * ct - 0.11102963 * cp;
  let s_ = i + 0.56003134 * ct - 0.32062717 * cp;

  let l = st2084_eotf(l_);
  let m = st2084_eotf(m_);
  let s = st2084_eotf(s_);

  Vector3::new(
    l * 3.43660669 - m * 2.50645212 + s * 0.06984542,
    -l * 0.79132956 + m * 1.98360045 - s * 0.1922709,
    -l * 0.0259499 - m * 0.09891371 + s * 1.12486361,
  )
}

fn linear_rec2020_to_srgb_color(c: Vector3<f64>) -> Vector3<f64> {
  let xyz = linear_rec2020_to_xyz(c);
  let r = xyz.x * 3.2404542 - xyz.y * 1.5371385 - xyz.z * 0.4985314;
  let g = -xyz.x * 0.9692660 + xyz.y * 1.8760108 + xyz.z * 0.0415560;
  let b = xyz.x * 0.0556434 - xyz.y * 0.2040259 + xyz.z * 1.0572252;

  Vector3::new(srgb_gamma_encode(r), srgb_gamma_encode(g), srgb_gamma_encode(b))
}

/// Converts sRGB colors to CIELuv in place.
pub fn srgb_to_cieluv(colors: &mut [Vector3<f64>]) {
  for c in colors.iter_mut() {
    *c = xyz_to_cieluv(srgb_to_xyz(*c));
  }
}

/// Converts sRGB colors to ICtCp (halved Ct) in place.
pub fn srgb_to_ictcp(colors: &mut [Vector3<f64>]) {
  for c in colors.iter_mut() {
    *c = linear_rec2020_to_ictcp(xyz_to_linear_rec2020(srgb_to_xyz(*c)));
  }
}

/// Converts sRGB colors to Linear Rec2020 in place.
pub fn srgb_to_linear_rec2020(colors: &mut [Vector3<f64>]) {
  for c in colors.iter_mut() {
    *c = xyz_to_linear_rec2020(srgb_to_xyz(*c));
  }
}

/// Converts CIELuv colors to Linear Rec2020 in place.
pub fn cieluv_to_linear_rec2020(colors: &mut [Vector3<f64>]) {
  for c in colors.iter_mut() {
    *c = xyz_to_linear_rec2020(cieluv_to_xyz(*c));
  }
}

/// Converts ICtCp (halved Ct) colors to Linear Rec2020 in place.
pub fn ictcp_to_linear_rec2020(colors: &mut [Vector3<f64>]) {
  for c in colors.iter_mut() {
    *c = ictcp_to_linear_rec2020_color(*c);
  }
}

/// Converts Linear Rec2020 colors to sRGB in place.
pub fn linear_rec2020_to_srgb(colors: &mut [Vector3<f64>]) {
  for c in colors.iter_mut() {
    *c = linear_rec2020_to_srgb_color(*c);
  }
}
