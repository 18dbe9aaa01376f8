use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, RgbImage, imageops::FilterType};
use ndarray::Array3;

/// Load an image from disk into memory.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path_ref = path.as_ref();
    image::open(path_ref).with_context(|| format!("failed to open image {}", path_ref.display()))
}

/// Decode an image file into an 8-bit, 3-channel RGB buffer.
///
/// Alpha is dropped and grayscale or 16-bit sources are expanded or narrowed,
/// so every downstream stage sees the same pixel layout.
pub fn decode_rgb_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let image = load_image(path)?;
    Ok(match image {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.to_rgb8(),
    })
}

/// Resize an RGB image to exactly `width` x `height` with the given filter.
pub fn resize_image(image: &RgbImage, width: u32, height: u32, filter: FilterType) -> RgbImage {
    image::imageops::resize(image, width, height, filter)
}

/// Convert an RGB image into a BGR CHW array with values matching OpenCV's `blobFromImage`.
///
/// The memory layout moves from HWC to CHW and the red and blue channels swap.
pub fn rgb_to_bgr_chw(image: &RgbImage) -> Array3<f32> {
    let (width, height) = image.dimensions();
    let mut array = Array3::<f32>::zeros((3, height as usize, width as usize));
    for (x, y, pixel) in image.enumerate_pixels() {
        let (xi, yi) = (x as usize, y as usize);
        array[(0, yi, xi)] = pixel[2] as f32; // Blue
        array[(1, yi, xi)] = pixel[1] as f32; // Green
        array[(2, yi, xi)] = pixel[0] as f32; // Red
    }
    array
}

/// Scale factors that map coordinates from a resized image back to the original.
pub fn compute_resize_scales(original: (u32, u32), target: (u32, u32)) -> Result<(f32, f32)> {
    let (orig_w, orig_h) = original;
    let (target_w, target_h) = target;
    anyhow::ensure!(
        target_w > 0 && target_h > 0,
        "target dimensions must be non-zero"
    );
    anyhow::ensure!(
        orig_w > 0 && orig_h > 0,
        "original dimensions must be non-zero"
    );
    Ok((
        orig_w as f32 / target_w as f32,
        orig_h as f32 / target_h as f32,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn rgb_to_bgr_chw_swaps_channels() {
        let mut image = RgbImage::new(2, 2);
        image.put_pixel(0, 0, image::Rgb([0, 128, 255]));
        image.put_pixel(1, 0, image::Rgb([255, 128, 0]));

        let array = rgb_to_bgr_chw(&image);
        assert_eq!(array.shape(), &[3, 2, 2]);
        assert_eq!(array[(0, 0, 0)], 255.0);
        assert_eq!(array[(2, 0, 0)], 0.0);
        assert_eq!(array[(1, 0, 1)], 128.0);
    }

    #[test]
    fn compute_resize_scales_rejects_zero() {
        assert_eq!(compute_resize_scales((640, 480), (320, 240)).unwrap(), (2.0, 2.0));
        assert!(compute_resize_scales((0, 480), (320, 240)).is_err());
        assert!(compute_resize_scales((640, 480), (0, 240)).is_err());
    }

    #[test]
    fn decode_normalizes_to_rgb() {
        let dir = tempdir().expect("tempdir");
        let rgba_path = dir.path().join("rgba.png");
        RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 40]))
            .save(&rgba_path)
            .expect("save rgba");
        let gray_path = dir.path().join("gray.png");
        GrayImage::from_pixel(2, 2, Luma([77]))
            .save(&gray_path)
            .expect("save gray");

        let rgb = decode_rgb_image(&rgba_path).expect("decode rgba");
        assert_eq!(rgb.dimensions(), (3, 2));
        assert_eq!(rgb.get_pixel(0, 0).0, [10, 20, 30]);

        let rgb = decode_rgb_image(&gray_path).expect("decode gray");
        assert_eq!(rgb.get_pixel(1, 1).0, [77, 77, 77]);
    }

    #[test]
    fn decode_reports_unreadable_files() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").expect("write");
        let err = decode_rgb_image(&path).expect_err("garbage should not decode");
        assert!(format!("{err}").contains("failed to open image"));
    }
}
