//! Skin mask extraction.
//!
//! A pixel is skin only when it falls inside both the HSV and the YCrCb
//! ranges. The raw mask is cleaned with an opening followed by a closing, and
//! regions whose cleaned mask covers too little of the area are rejected.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::morphology::{Mask, grayscale_close, grayscale_open};
use log::trace;
use skinseg_utils::{
    config::{ChannelRange, SkinSettings},
    rgb_to_hsv8, rgb_to_ycrcb8, timing_guard,
};
use thiserror::Error;

use crate::morphology::StructuringElement;

/// Mask value for skin pixels.
pub const FOREGROUND: u8 = 255;

/// Why a region produced no usable skin mask.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ExtractionFailure {
    #[error("skin ratio {ratio:.4} is below the minimum {minimum:.4}")]
    InsufficientSkin { ratio: f64, minimum: f64 },
    #[error("region is empty")]
    EmptyRegion,
}

/// An accepted extraction.
#[derive(Debug, Clone)]
pub struct SkinExtraction {
    /// Region pixels where the mask is set, black elsewhere.
    pub skin_image: RgbImage,
    /// Cleaned binary mask, 0 or [`FOREGROUND`], same size as the region.
    pub mask: GrayImage,
    /// Fraction of mask pixels that are foreground.
    pub skin_ratio: f64,
}

/// Thresholds, cleanup kernel and coverage gate for skin extraction.
#[derive(Debug, Clone)]
pub struct SkinClassifier {
    hsv: ChannelRange,
    ycrcb: ChannelRange,
    kernel: Mask,
    min_skin_ratio: f64,
}

impl Default for SkinClassifier {
    fn default() -> Self {
        Self::new(&SkinSettings::default())
    }
}

impl SkinClassifier {
    pub fn new(settings: &SkinSettings) -> Self {
        Self {
            hsv: settings.hsv,
            ycrcb: settings.ycrcb,
            kernel: StructuringElement::ellipse(settings.kernel_size).to_mask(),
            min_skin_ratio: settings.min_skin_ratio,
        }
    }

    pub fn min_skin_ratio(&self) -> f64 {
        self.min_skin_ratio
    }

    /// Both colorspace tests pass for this pixel.
    pub fn is_skin(&self, pixel: Rgb<u8>) -> bool {
        let [r, g, b] = pixel.0;
        self.hsv.contains(rgb_to_hsv8(r, g, b)) && self.ycrcb.contains(rgb_to_ycrcb8(r, g, b))
    }

    /// Raw per-pixel classification, before cleanup.
    pub fn threshold(&self, region: &RgbImage) -> GrayImage {
        GrayImage::from_fn(region.width(), region.height(), |x, y| {
            Luma([if self.is_skin(*region.get_pixel(x, y)) {
                FOREGROUND
            } else {
                0
            }])
        })
    }

    /// Opening then closing with the elliptical kernel.
    pub fn clean(&self, mask: &GrayImage) -> GrayImage {
        grayscale_close(&grayscale_open(mask, &self.kernel), &self.kernel)
    }

    /// Threshold, clean and gate `region`.
    pub fn extract(&self, region: &RgbImage) -> Result<SkinExtraction, ExtractionFailure> {
        let _guard = timing_guard("skinseg_core::extract_skin_mask", log::Level::Trace);
        if region.width() == 0 || region.height() == 0 {
            return Err(ExtractionFailure::EmptyRegion);
        }

        let mask = self.clean(&self.threshold(region));
        let skin_ratio = skin_ratio(&mask);
        trace!(
            "Skin ratio {:.4} for {}x{} region",
            skin_ratio,
            region.width(),
            region.height()
        );
        if skin_ratio < self.min_skin_ratio {
            return Err(ExtractionFailure::InsufficientSkin {
                ratio: skin_ratio,
                minimum: self.min_skin_ratio,
            });
        }

        Ok(SkinExtraction {
            skin_image: apply_mask(region, &mask),
            mask,
            skin_ratio,
        })
    }
}

/// [`SkinClassifier::extract`] with the default thresholds and gate.
pub fn extract_skin_mask(region: &RgbImage) -> Result<SkinExtraction, ExtractionFailure> {
    SkinClassifier::default().extract(region)
}

/// Foreground pixels divided by total pixels; 0 for an empty mask.
pub fn skin_ratio(mask: &GrayImage) -> f64 {
    let total = mask.as_raw().len();
    if total == 0 {
        return 0.0;
    }
    let foreground = mask.as_raw().iter().filter(|&&v| v > 0).count();
    foreground as f64 / total as f64
}

/// Keep `image` pixels where `mask` is set, zero the rest.
pub fn apply_mask(image: &RgbImage, mask: &GrayImage) -> RgbImage {
    let mut out = image.clone();
    for (pixel, value) in out.pixels_mut().zip(mask.pixels()) {
        if value[0] == 0 {
            *pixel = Rgb([0, 0, 0]);
        }
    }
    out
}
