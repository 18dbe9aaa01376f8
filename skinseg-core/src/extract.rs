//! Path in, skin sample (or a reason to skip) out.

use std::path::Path;

use image::{GrayImage, RgbImage};
use log::debug;
use skinseg_utils::{config::SkinSettings, decode_rgb_image, timing_guard};
use thiserror::Error;

use crate::detector::FaceDetector;
use crate::region::{PixelRect, RegionFailure, RegionPolicy, RegionSource, select_region};
use crate::skin::{ExtractionFailure, SkinClassifier};

/// Expected reasons a sample produces no output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    #[error("could not decode image: {0}")]
    Unreadable(String),
    #[error(transparent)]
    Region(#[from] RegionFailure),
    #[error(transparent)]
    Extraction(#[from] ExtractionFailure),
}

impl SkipReason {
    /// Short stable key for counting skips.
    pub fn kind(&self) -> &'static str {
        match self {
            SkipReason::Unreadable(_) => "unreadable",
            SkipReason::Region(RegionFailure::NoFaceFound) => "no_face",
            SkipReason::Region(RegionFailure::EmptyImage)
            | SkipReason::Extraction(ExtractionFailure::EmptyRegion) => "empty",
            SkipReason::Extraction(ExtractionFailure::InsufficientSkin { .. }) => {
                "insufficient_skin"
            }
        }
    }
}

/// An accepted sample.
#[derive(Debug, Clone)]
pub struct SkinSample {
    /// The decoded source image.
    pub image: RgbImage,
    /// Where the region sits in `image`.
    pub region: PixelRect,
    pub source: RegionSource,
    /// Region pixels with non-skin zeroed.
    pub skin_image: RgbImage,
    /// Binary mask matching `skin_image`.
    pub mask: GrayImage,
    pub skin_ratio: f64,
}

/// Region selection and skin extraction bundled for repeated use.
///
/// Cheap to share across worker threads: the detector is borrowed and the
/// classifier is read-only.
pub struct SamplePipeline<'d> {
    detector: Option<&'d dyn FaceDetector>,
    policy: RegionPolicy,
    classifier: SkinClassifier,
}

impl<'d> SamplePipeline<'d> {
    pub fn new(
        detector: Option<&'d dyn FaceDetector>,
        policy: RegionPolicy,
        skin: &SkinSettings,
    ) -> Self {
        Self {
            detector,
            policy,
            classifier: SkinClassifier::new(skin),
        }
    }

    pub fn policy(&self) -> RegionPolicy {
        self.policy
    }

    /// Decode `path` and run [`Self::process_image`].
    pub fn process_path(&self, path: &Path) -> Result<SkinSample, SkipReason> {
        let _guard = timing_guard(format!("extract {}", path.display()), log::Level::Debug);
        let image = decode_rgb_image(path).map_err(|err| SkipReason::Unreadable(format!("{err:#}")))?;
        self.process_image(image)
    }

    pub fn process_image(&self, image: RgbImage) -> Result<SkinSample, SkipReason> {
        let (rect, source, extraction) = {
            let region = select_region(&image, self.detector, self.policy)?;
            let extraction = self.classifier.extract(region.image())?;
            (region.rect(), region.source(), extraction)
        };
        debug!(
            "Accepted {:?} region {:?} with skin ratio {:.4}",
            source, rect, extraction.skin_ratio
        );

        Ok(SkinSample {
            image,
            region: rect,
            source,
            skin_image: extraction.skin_image,
            mask: extraction.mask,
            skin_ratio: extraction.skin_ratio,
        })
    }
}

/// Skin image and mask for `path`, or `None` for every expected skip.
///
/// Uses the default skin thresholds; skips are logged at debug level.
pub fn extract_skin(
    path: &Path,
    detector: Option<&dyn FaceDetector>,
    policy: RegionPolicy,
) -> Option<SkinSample> {
    SamplePipeline::new(detector, policy, &SkinSettings::default())
        .process_path(path)
        .inspect_err(|reason| debug!("Skipping {}: {reason}", path.display()))
        .ok()
}
