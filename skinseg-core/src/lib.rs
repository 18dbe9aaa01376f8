//! Core of the skin segmentation dataset builder.
//!
//! An image goes through [`select_region`] (face crop or whole frame), then
//! [`SkinClassifier::extract`] (dual-colorspace threshold, morphological
//! cleanup, coverage gate), and finally [`encode_label`] turns the accepted
//! binary mask into a class-labeled mask.

/// Face detector seam and the YuNet implementation.
pub mod detector;
/// Sample pipeline from file path to skin sample.
pub mod extract;
/// Class vocabulary and label mask encoding.
pub mod label;
/// ONNX model loading and execution.
pub mod model;
/// Erosion, dilation, opening and closing on masks.
pub mod morphology;
/// Detection post-processing (score filtering, NMS).
pub mod postprocess;
/// Image to detector tensor conversion.
pub mod preprocess;
/// Region of interest selection.
pub mod region;
/// Skin thresholding and the coverage gate.
pub mod skin;

pub use detector::{DetectionOutput, FaceDetection, FaceDetector, RelativeBox, YuNetDetector};
pub use extract::{SamplePipeline, SkinSample, SkipReason, extract_skin};
pub use label::{ClassVocabulary, LabelError, LabelMask, VocabularyError, encode_label};
pub use model::YuNetModel;
pub use morphology::StructuringElement;
pub use postprocess::{BoundingBox, Detection, PostprocessConfig, apply_postprocess};
pub use preprocess::{InputSize, PreprocessConfig, PreprocessOutput, preprocess_image};
pub use region::{
    PixelRect, Region, RegionFailure, RegionPolicy, RegionSource, select_region,
};
pub use skin::{ExtractionFailure, SkinClassifier, SkinExtraction, extract_skin_mask};

/// Returns the crate version for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
