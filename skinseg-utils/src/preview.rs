//! Preview rendering for humans inspecting a generated dataset.
//!
//! Nothing here feeds back into the dataset itself. Colors are a pure function
//! of the class id, so two runs over the same vocabulary always render the
//! same palette regardless of processing order.

use image::{GrayImage, Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::color::RgbaColor;

/// Golden angle in degrees; consecutive ids land far apart on the hue wheel.
const HUE_STEP: f32 = 137.507_76;

/// Deterministic display color for a label id. Id 0 (background) is black.
pub fn class_color(class_id: u8) -> RgbaColor {
    if class_id == 0 {
        return RgbaColor::opaque(0, 0, 0);
    }
    let hue = (class_id as f32 * HUE_STEP).rem_euclid(360.0);
    RgbaColor::from_hsv(hue, 0.65, 0.95)
}

/// Map every label id in `mask` to its [`class_color`].
pub fn colorize_label_mask(mask: &GrayImage) -> RgbImage {
    let mut palette = [[0u8; 3]; 256];
    for (id, entry) in palette.iter_mut().enumerate() {
        *entry = class_color(id as u8).rgb();
    }
    RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
        Rgb(palette[mask.get_pixel(x, y)[0] as usize])
    })
}

/// Full-frame preview: the mask blended over the selected region with the
/// region's bounding box outlined.
///
/// Mirrors `addWeighted(color_layer, alpha, image, 1 - alpha)` inside the
/// region: the color layer is black off-mask, so unmasked region pixels are
/// dimmed by `1 - alpha` as well, which makes the skin stand out.
///
/// `region` is `(x, y, width, height)` in `image` coordinates and must match
/// the mask dimensions.
pub fn render_region_preview(
    image: &RgbImage,
    region: (u32, u32, u32, u32),
    mask: &GrayImage,
    color: RgbaColor,
    alpha: f32,
) -> RgbImage {
    let (x, y, width, height) = region;
    let mut out = image.clone();
    blend_into(&mut out, (x, y), mask, color, alpha);
    if width > 0 && height > 0 {
        draw_hollow_rect_mut(
            &mut out,
            Rect::at(x as i32, y as i32).of_size(width, height),
            Rgb(color.rgb()),
        );
    }
    out
}

fn blend_into(
    canvas: &mut RgbImage,
    origin: (u32, u32),
    mask: &GrayImage,
    color: RgbaColor,
    alpha: f32,
) {
    let alpha = alpha.clamp(0.0, 1.0);
    let rgb = color.rgb();
    for (mx, my, value) in mask.enumerate_pixels() {
        let (cx, cy) = (origin.0 + mx, origin.1 + my);
        if cx >= canvas.width() || cy >= canvas.height() {
            continue;
        }
        let pixel = canvas.get_pixel_mut(cx, cy);
        for (channel, tint) in pixel.0.iter_mut().zip(rgb) {
            let layer = if value[0] > 0 { tint as f32 } else { 0.0 };
            let blended = layer * alpha + *channel as f32 * (1.0 - alpha);
            *channel = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
}
