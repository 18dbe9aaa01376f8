//! Color utilities shared by the skin classifier and the preview renderer.
//!
//! Two families of conversions live here. The floating point pair
//! ([`rgb_to_hsv`] / [`hsv_to_rgb`]) works in degrees and unit ranges and is
//! used for palette generation. The 8-bit pair ([`rgb_to_hsv8`] /
//! [`rgb_to_ycrcb8`]) reproduces OpenCV's `COLOR_RGB2HSV` and
//! `COLOR_RGB2YCrCb` integer arithmetic bit for bit, so threshold ranges tuned
//! against OpenCV behave identically here.

use serde::{Deserialize, Serialize};

const HSV_SHIFT: i32 = 12;
const YUV_SHIFT: i32 = 14;
const R2Y: i32 = 4899;
const G2Y: i32 = 9617;
const B2Y: i32 = 1868;
const CR_COEFF: i32 = 11682;
const CB_COEFF: i32 = 9241;
const CHROMA_DELTA: i32 = 128 << YUV_SHIFT;

/// Simple RGBA color stored in 8-bit channels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RgbaColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl RgbaColor {
    /// Constructs an opaque RGB color.
    pub const fn opaque(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: 255,
        }
    }

    /// Builds a color from HSV values (hue in degrees, saturation/value 0.0..1.0).
    pub fn from_hsv(h: f32, s: f32, v: f32) -> Self {
        let (r, g, b) = hsv_to_rgb(h, s, v);
        Self::opaque(r, g, b)
    }

    /// Channels as an `[r, g, b]` triple.
    pub const fn rgb(self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }
}

impl Default for RgbaColor {
    fn default() -> Self {
        Self::opaque(0, 255, 0)
    }
}

/// Convert RGB channels (0-255) to HSV (hue in degrees 0-360, saturation/value 0-1).
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let rf = r as f32 / 255.0;
    let gf = g as f32 / 255.0;
    let bf = b as f32 / 255.0;

    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let hue = if delta.abs() < f32::EPSILON {
        0.0
    } else if (max - rf).abs() < f32::EPSILON {
        60.0 * (((gf - bf) / delta) % 6.0)
    } else if (max - gf).abs() < f32::EPSILON {
        60.0 * (((bf - rf) / delta) + 2.0)
    } else {
        60.0 * (((rf - gf) / delta) + 4.0)
    };

    let hue = if hue < 0.0 { hue + 360.0 } else { hue };
    let saturation = if max.abs() < f32::EPSILON {
        0.0
    } else {
        delta / max
    };
    (hue, saturation, max)
}

/// Convert HSV (hue in degrees, saturation/value 0-1) to RGB channels (0-255).
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    if s <= 0.0 {
        let val = (v * 255.0).round().clamp(0.0, 255.0) as u8;
        return (val, val, val);
    }

    let hue = if h.is_nan() { 0.0 } else { h.rem_euclid(360.0) };
    let c = v * s;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r1, g1, b1) = match hue {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let to_byte = |value: f32| -> u8 { ((value + m) * 255.0).round().clamp(0.0, 255.0) as u8 };

    (to_byte(r1), to_byte(g1), to_byte(b1))
}

/// 8-bit HSV with OpenCV's scaling: hue in `0..180` (degrees / 2), saturation
/// and value in `0..=255`.
pub fn rgb_to_hsv8(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let v = r.max(g).max(b);
    let diff = v - r.min(g).min(b);

    let s = if v == 0 {
        0
    } else {
        descale(diff * fixed_reciprocal(255, v), HSV_SHIFT)
    };

    let h = if diff == 0 {
        0
    } else {
        let raw = if v == r {
            g - b
        } else if v == g {
            b - r + 2 * diff
        } else {
            r - g + 4 * diff
        };
        let h = descale(raw * fixed_reciprocal(180, 6 * diff), HSV_SHIFT);
        if h < 0 { h + 180 } else { h }
    };

    [h as u8, saturate(s), v as u8]
}

/// 8-bit YCrCb (BT.601, chroma offset 128) with OpenCV's fixed-point rounding.
pub fn rgb_to_ycrcb8(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let y = descale(r * R2Y + g * G2Y + b * B2Y, YUV_SHIFT);
    let cr = descale((r - y) * CR_COEFF + CHROMA_DELTA, YUV_SHIFT);
    let cb = descale((b - y) * CB_COEFF + CHROMA_DELTA, YUV_SHIFT);
    [saturate(y), saturate(cr), saturate(cb)]
}

/// `round((numerator << HSV_SHIFT) / denominator)`, the lookup-table entries
/// OpenCV precomputes for its HSV path.
fn fixed_reciprocal(numerator: i32, denominator: i32) -> i32 {
    (((numerator << HSV_SHIFT) as f64) / denominator as f64).round() as i32
}

fn descale(value: i32, shift: i32) -> i32 {
    (value + (1 << (shift - 1))) >> shift
}

fn saturate(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}
