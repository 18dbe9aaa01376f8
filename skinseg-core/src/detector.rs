use std::path::Path;

use anyhow::Result;
use image::RgbImage;
use skinseg_utils::timing_guard;

use crate::model::YuNetModel;
use crate::postprocess::{Detection, PostprocessConfig, apply_postprocess};
use crate::preprocess::{PreprocessConfig, preprocess_image};

/// Face bounding box as fractions of the image width and height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// The primary face found in an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceDetection {
    pub bbox: RelativeBox,
    pub score: f32,
}

/// Anything that can point at the main face in an image.
///
/// Implementations are shared across worker threads and must not need `&mut`
/// access to run inference.
pub trait FaceDetector: Send + Sync {
    /// Return the primary face, or `None` when there is no face.
    fn detect(&self, image: &RgbImage) -> Result<Option<FaceDetection>>;
}

/// All detections for one image, in source pixel coordinates.
#[derive(Debug)]
pub struct DetectionOutput {
    /// Best score first.
    pub detections: Vec<Detection>,
    pub original_size: (u32, u32),
}

impl DetectionOutput {
    /// The highest-scoring detection expressed relative to the image size.
    pub fn primary(&self) -> Option<FaceDetection> {
        let (width, height) = self.original_size;
        if width == 0 || height == 0 {
            return None;
        }
        let (width, height) = (width as f32, height as f32);
        self.detections.first().map(|det| FaceDetection {
            bbox: RelativeBox {
                x: det.bbox.x / width,
                y: det.bbox.y / height,
                width: det.bbox.width / width,
                height: det.bbox.height / height,
            },
            score: det.score,
        })
    }
}

/// YuNet model coupled with its preprocessing and postprocessing settings.
#[derive(Debug)]
pub struct YuNetDetector {
    model: YuNetModel,
    preprocess: PreprocessConfig,
    postprocess: PostprocessConfig,
}

impl YuNetDetector {
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        preprocess: PreprocessConfig,
        postprocess: PostprocessConfig,
    ) -> Result<Self> {
        let model = YuNetModel::load(model_path, preprocess.input_size)?;
        Ok(Self {
            model,
            preprocess,
            postprocess,
        })
    }

    /// Run the full detect pipeline on a decoded image.
    pub fn detect_image(&self, image: &RgbImage) -> Result<DetectionOutput> {
        let _guard = timing_guard("skinseg_core::detect_image", log::Level::Debug);
        let prep = preprocess_image(image, &self.preprocess)?;

        let raw = {
            let _guard = timing_guard("skinseg_core::onnx_inference", log::Level::Trace);
            self.model.run(prep.tensor)?
        };
        let detections = apply_postprocess(&raw, prep.scale_x, prep.scale_y, &self.postprocess)?;

        Ok(DetectionOutput {
            detections,
            original_size: prep.original_size,
        })
    }

    pub fn postprocess_config(&self) -> &PostprocessConfig {
        &self.postprocess
    }
}

impl FaceDetector for YuNetDetector {
    fn detect(&self, image: &RgbImage) -> Result<Option<FaceDetection>> {
        Ok(self.detect_image(image)?.primary())
    }
}
