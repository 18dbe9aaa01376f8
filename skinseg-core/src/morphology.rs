//! Elliptical structuring element for mask cleanup.
//!
//! The operations themselves come from [`imageproc::morphology`]: erosion
//! takes the minimum and dilation the maximum over the mask, and neighbours
//! that fall outside the image are ignored, so objects touching the border
//! are not eroded from outside.

use image::{GrayImage, Luma};
use imageproc::morphology::Mask;

/// Largest kernel side that keeps the anchor within `Mask::from_image` limits.
const MAX_SIZE: u32 = 255;

/// Filled ellipse inscribed in a square, anchored at its centre.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    size: u32,
    image: GrayImage,
}

impl StructuringElement {
    /// Ellipse inscribed in a `size` x `size` square.
    ///
    /// Row `i` spans `centre ± round(c * sqrt((r² - dy²) / r²))` with
    /// `r = c = size / 2` and `dy = i - r`. For `size = 5` this leaves only the
    /// centre pixel in the first and last rows.
    pub fn ellipse(size: u32) -> Self {
        let size = size.clamp(1, MAX_SIZE);
        let radius = (size / 2) as i32;
        let inv_r2 = if radius > 0 {
            1.0 / (radius * radius) as f64
        } else {
            0.0
        };

        let mut image = GrayImage::new(size, size);
        for row in 0..size as i32 {
            let dy = row - radius;
            let dx = (radius as f64 * (((radius * radius - dy * dy) as f64) * inv_r2).sqrt())
                .round() as i32;
            let start = (radius - dx).max(0);
            let end = (radius + dx + 1).min(size as i32);
            for col in start..end {
                image.put_pixel(col as u32, row as u32, Luma([255]));
            }
        }

        Self { size, image }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// The element as a `size` x `size` image, 255 inside.
    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    /// Render as rows of 0/1, for inspection.
    pub fn to_grid(&self) -> Vec<Vec<u8>> {
        self.image
            .rows()
            .map(|row| row.map(|p| u8::from(p[0] > 0)).collect())
            .collect()
    }

    /// The element as an `imageproc` mask anchored at its centre.
    pub fn to_mask(&self) -> Mask {
        let anchor = (self.size / 2) as u8;
        Mask::from_image(&self.image, anchor, anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::morphology::{grayscale_close, grayscale_dilate, grayscale_erode, grayscale_open};

    fn count_foreground(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p[0] > 0).count()
    }

    #[test]
    fn ellipse_5x5_matches_reference_shape() {
        let grid = StructuringElement::ellipse(5).to_grid();
        assert_eq!(
            grid,
            vec![
                vec![0, 0, 1, 0, 0],
                vec![1, 1, 1, 1, 1],
                vec![1, 1, 1, 1, 1],
                vec![1, 1, 1, 1, 1],
                vec![0, 0, 1, 0, 0],
            ]
        );
    }

    #[test]
    fn dilating_a_lone_pixel_stamps_the_element() {
        let element = StructuringElement::ellipse(5);
        let mut point = GrayImage::new(5, 5);
        point.put_pixel(2, 2, Luma([255]));
        assert_eq!(&grayscale_dilate(&point, &element.to_mask()), element.as_image());
    }

    #[test]
    fn ellipse_of_one_is_identity() {
        let mask = StructuringElement::ellipse(1).to_mask();
        let image = GrayImage::from_fn(4, 3, |x, y| Luma([if (x + y) % 2 == 0 { 255 } else { 0 }]));
        assert_eq!(grayscale_erode(&image, &mask), image);
        assert_eq!(grayscale_dilate(&image, &mask), image);
    }

    #[test]
    fn oversized_kernels_are_clamped() {
        assert_eq!(StructuringElement::ellipse(1000).size(), MAX_SIZE);
        assert_eq!(StructuringElement::ellipse(0).size(), 1);
    }

    #[test]
    fn opening_removes_isolated_specks() {
        let mut mask = GrayImage::new(20, 20);
        mask.put_pixel(10, 10, Luma([255]));
        let opened = grayscale_open(&mask, &StructuringElement::ellipse(5).to_mask());
        assert_eq!(count_foreground(&opened), 0);
    }

    #[test]
    fn closing_fills_pinholes() {
        let mut mask = GrayImage::from_pixel(20, 20, Luma([255]));
        mask.put_pixel(10, 10, Luma([0]));
        let closed = grayscale_close(&mask, &StructuringElement::ellipse(5).to_mask());
        assert_eq!(count_foreground(&closed), 400);
    }

    #[test]
    fn opening_rounds_square_corners() {
        let mut mask = GrayImage::new(40, 40);
        for y in 10..30 {
            for x in 10..30 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let opened = grayscale_open(&mask, &StructuringElement::ellipse(5).to_mask());
        assert_eq!(count_foreground(&opened), 392);
        assert_eq!(opened.get_pixel(10, 10)[0], 0);
        assert_eq!(opened.get_pixel(11, 11)[0], 255);
    }

    #[test]
    fn border_pixels_are_not_eroded_from_outside() {
        let mask = GrayImage::from_pixel(6, 6, Luma([255]));
        let eroded = grayscale_erode(&mask, &StructuringElement::ellipse(5).to_mask());
        assert_eq!(count_foreground(&eroded), 36);
    }
}
