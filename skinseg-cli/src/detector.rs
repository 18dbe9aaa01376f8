//! Face detector construction.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use skinseg_core::{FaceDetector, PostprocessConfig, PreprocessConfig, YuNetDetector};
use skinseg_utils::config::AppSettings;

/// Load the face detector when the region settings call for one.
pub fn build_face_detector(settings: &AppSettings) -> Result<Option<Arc<dyn FaceDetector>>> {
    if !settings.region.use_detection {
        info!("Face detection disabled; every image is processed whole");
        return Ok(None);
    }

    let model_path = settings.model_path();
    if !model_path.exists() {
        anyhow::bail!(
            "face detection model not found at {} (pass --model, or --no-face-detection to use whole images)",
            model_path.display()
        );
    }

    let preprocess = PreprocessConfig::from(&settings.input);
    let postprocess = PostprocessConfig::from(&settings.detection);
    info!(
        "Loading face model from {} at {}x{} (score >= {:.2})",
        model_path.display(),
        preprocess.input_size.width,
        preprocess.input_size.height,
        postprocess.score_threshold
    );
    let detector = YuNetDetector::new(&model_path, preprocess, postprocess)
        .with_context(|| format!("failed to load face model {}", model_path.display()))?;
    Ok(Some(Arc::new(detector)))
}
