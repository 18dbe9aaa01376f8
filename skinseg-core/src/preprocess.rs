//! Preparing decoded images for the face detector.
//!
//! Images are resized to the detector's input resolution, laid out as a BGR
//! `[1, 3, H, W]` tensor, and paired with the scale factors that map detector
//! coordinates back onto the source image.

use std::borrow::Cow;

use anyhow::Result;
use image::{RgbImage, imageops::FilterType};
use skinseg_utils::{
    compute_resize_scales,
    config::{InputDimensions, ResizeQuality},
    resize_image, rgb_to_bgr_chw,
    telemetry::timing_guard,
};
use tract_onnx::prelude::Tensor;

/// Detector input resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSize {
    pub width: u32,
    pub height: u32,
}

impl InputSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for InputSize {
    fn default() -> Self {
        Self::new(640, 640)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PreprocessConfig {
    pub input_size: InputSize,
    /// Resize filter preference controlling the quality vs speed trade-off.
    pub resize_quality: ResizeQuality,
}

impl PreprocessConfig {
    fn resize_filter(&self) -> FilterType {
        match self.resize_quality {
            ResizeQuality::Quality => FilterType::Triangle,
            ResizeQuality::Speed => FilterType::Nearest,
        }
    }
}

/// Tensor plus the metadata needed to rescale detections.
#[derive(Debug)]
pub struct PreprocessOutput {
    pub tensor: Tensor,
    /// Source width divided by input width.
    pub scale_x: f32,
    /// Source height divided by input height.
    pub scale_y: f32,
    pub original_size: (u32, u32),
}

/// Convert an RGB image into a detector-ready tensor.
pub fn preprocess_image(image: &RgbImage, config: &PreprocessConfig) -> Result<PreprocessOutput> {
    let _guard = timing_guard("skinseg_core::preprocess_image", log::Level::Trace);
    let InputSize {
        width: input_w,
        height: input_h,
    } = config.input_size;
    anyhow::ensure!(
        input_w > 0 && input_h > 0,
        "input dimensions must be greater than zero"
    );
    let (orig_w, orig_h) = image.dimensions();
    anyhow::ensure!(
        orig_w > 0 && orig_h > 0,
        "source image dimensions must be greater than zero"
    );

    let resized: Cow<'_, RgbImage> = if (orig_w, orig_h) == (input_w, input_h) {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(resize_image(image, input_w, input_h, config.resize_filter()))
    };
    let chw = rgb_to_bgr_chw(&resized);

    let shape = [1usize, 3, input_h as usize, input_w as usize];
    let (data, offset) = chw.into_raw_vec_and_offset();
    debug_assert_eq!(offset, Some(0), "expected contiguous array");
    let tensor = Tensor::from_shape(&shape, &data)
        .map_err(|e| anyhow::anyhow!("failed to build tensor: {e}"))?;

    let (scale_x, scale_y) = compute_resize_scales((orig_w, orig_h), (input_w, input_h))?;

    Ok(PreprocessOutput {
        tensor,
        scale_x,
        scale_y,
        original_size: (orig_w, orig_h),
    })
}

impl From<InputDimensions> for InputSize {
    fn from(dimensions: InputDimensions) -> Self {
        InputSize::new(dimensions.width, dimensions.height)
    }
}

impl From<&InputDimensions> for PreprocessConfig {
    fn from(dimensions: &InputDimensions) -> Self {
        PreprocessConfig {
            input_size: (*dimensions).into(),
            resize_quality: dimensions.resize_quality,
        }
    }
}
