//! Choosing the part of an image that skin extraction looks at.
//!
//! The selector asks a [`FaceDetector`] for the primary face and crops to it.
//! When no face is found the whole image is used unless the policy requires a
//! face. The whole-image fallback borrows the caller's buffer instead of
//! copying it.

use std::borrow::Cow;

use image::{RgbImage, imageops};
use log::{debug, warn};
use skinseg_utils::config::RegionSettings;
use thiserror::Error;

use crate::detector::{FaceDetector, RelativeBox};

/// Axis-aligned rectangle in absolute pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// The rectangle covering an entire `width` x `height` image.
    pub const fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Convert a relative box to pixels within a `width` x `height` image.
    ///
    /// Offsets and extents are each scaled and truncated toward zero, so the
    /// far edge is `trunc(x * W) + trunc(w * W)`. The result is clamped to the
    /// image; `None` when nothing of it remains.
    pub fn from_relative(bbox: &RelativeBox, width: u32, height: u32) -> Option<Self> {
        let (x1, x2) = span(bbox.x, bbox.width, width)?;
        let (y1, y2) = span(bbox.y, bbox.height, height)?;
        Some(Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        })
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// `(x, y, width, height)` tuple.
    pub fn as_tuple(&self) -> (u32, u32, u32, u32) {
        (self.x, self.y, self.width, self.height)
    }
}

fn span(offset: f32, extent: f32, limit: u32) -> Option<(u32, u32)> {
    if !offset.is_finite() || !extent.is_finite() {
        return None;
    }
    let limit_f = limit as f64;
    let start = (offset as f64 * limit_f).trunc();
    let end = start + (extent as f64 * limit_f).trunc();
    let start = start.clamp(0.0, limit_f) as u32;
    let end = end.clamp(0.0, limit_f) as u32;
    (end > start).then_some((start, end))
}

/// How a region was chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionSource {
    /// Cropped to the detector's primary face.
    Face { score: f32 },
    /// The whole image.
    FullImage,
}

/// Region pixels plus where they came from.
#[derive(Debug, Clone)]
pub struct Region<'a> {
    image: Cow<'a, RgbImage>,
    rect: PixelRect,
    source: RegionSource,
}

impl<'a> Region<'a> {
    /// Wrap an entire image without copying it.
    pub fn full_image(image: &'a RgbImage) -> Self {
        Self {
            image: Cow::Borrowed(image),
            rect: PixelRect::full(image.width(), image.height()),
            source: RegionSource::FullImage,
        }
    }

    fn face(image: &RgbImage, rect: PixelRect, score: f32) -> Self {
        let crop = imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image();
        Self {
            image: Cow::Owned(crop),
            rect,
            source: RegionSource::Face { score },
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    pub fn source(&self) -> RegionSource {
        self.source
    }

    pub fn is_full_image(&self) -> bool {
        matches!(self.source, RegionSource::FullImage)
    }

    pub fn into_image(self) -> RgbImage {
        self.image.into_owned()
    }
}

/// Whether to look for a face, and whether one is mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionPolicy {
    pub use_detection: bool,
    pub require_detection: bool,
}

impl Default for RegionPolicy {
    fn default() -> Self {
        RegionSettings::default().into()
    }
}

impl From<RegionSettings> for RegionPolicy {
    fn from(settings: RegionSettings) -> Self {
        Self {
            use_detection: settings.use_detection,
            require_detection: settings.require_detection,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegionFailure {
    #[error("no face found and a face is required")]
    NoFaceFound,
    #[error("image has no pixels")]
    EmptyImage,
}

/// Pick the region of `image` to extract skin from.
///
/// A detector error is logged and treated like an image without a face, as is
/// a detection that falls entirely outside the image. `detector` may be `None`
/// when detection is configured but unavailable; that also counts as no face.
pub fn select_region<'a>(
    image: &'a RgbImage,
    detector: Option<&dyn FaceDetector>,
    policy: RegionPolicy,
) -> Result<Region<'a>, RegionFailure> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(RegionFailure::EmptyImage);
    }

    if !policy.use_detection {
        return Ok(Region::full_image(image));
    }

    let face = detector.and_then(|detector| match detector.detect(image) {
        Ok(face) => face,
        Err(err) => {
            warn!("Face detector failed; treating as no face: {err:#}");
            None
        }
    });

    let located = face.and_then(|face| {
        let rect = PixelRect::from_relative(&face.bbox, width, height);
        if rect.is_none() {
            debug!("Discarding face box outside the image: {:?}", face.bbox);
        }
        rect.map(|rect| (rect, face.score))
    });

    match located {
        Some((rect, score)) => Ok(Region::face(image, rect, score)),
        None if policy.require_detection => Err(RegionFailure::NoFaceFound),
        None => Ok(Region::full_image(image)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::FaceDetection;
    use image::Rgb;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedDetector {
        result: Option<FaceDetection>,
        calls: AtomicUsize,
    }

    impl FixedDetector {
        fn new(result: Option<FaceDetection>) -> Self {
            Self {
                result,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl FaceDetector for FixedDetector {
        fn detect(&self, _image: &RgbImage) -> anyhow::Result<Option<FaceDetection>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result)
        }
    }

    struct FailingDetector;

    impl FaceDetector for FailingDetector {
        fn detect(&self, _image: &RgbImage) -> anyhow::Result<Option<FaceDetection>> {
            anyhow::bail!("inference exploded")
        }
    }

    fn face(x: f32, y: f32, width: f32, height: f32) -> FaceDetection {
        FaceDetection {
            bbox: RelativeBox {
                x,
                y,
                width,
                height,
            },
            score: 0.9,
        }
    }

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 0]))
    }

    const DETECT: RegionPolicy = RegionPolicy {
        use_detection: true,
        require_detection: false,
    };

    #[test]
    fn relative_box_truncates_each_term() {
        let rect = PixelRect::from_relative(
            &RelativeBox {
                x: 0.255,
                y: 0.1,
                width: 0.499,
                height: 0.5,
            },
            100,
            50,
        )
        .expect("rect");
        assert_eq!(rect, PixelRect {
            x: 25,
            y: 5,
            width: 49,
            height: 25
        });
    }

    #[test]
    fn relative_box_is_clamped_to_image() {
        let rect = PixelRect::from_relative(&face(-0.2, 0.75, 0.5, 0.5).bbox, 100, 100)
            .expect("partially visible box");
        assert_eq!(rect, PixelRect {
            x: 0,
            y: 75,
            width: 30,
            height: 25
        });
        assert!(PixelRect::from_relative(&face(1.2, 0.0, 0.5, 0.5).bbox, 100, 100).is_none());
        assert!(PixelRect::from_relative(&face(0.1, 0.1, 0.0, 0.5).bbox, 100, 100).is_none());
        assert!(PixelRect::from_relative(&face(f32::NAN, 0.1, 0.2, 0.5).bbox, 100, 100).is_none());
    }

    #[test]
    fn face_region_is_cropped_copy() {
        let image = gradient(40, 20);
        let detector = FixedDetector::new(Some(face(0.25, 0.5, 0.5, 0.25)));
        let region = select_region(&image, Some(&detector), DETECT).expect("region");

        assert_eq!(region.rect(), PixelRect {
            x: 10,
            y: 10,
            width: 20,
            height: 5
        });
        assert_eq!(region.source(), RegionSource::Face { score: 0.9 });
        assert_eq!(region.image().dimensions(), (20, 5));
        assert_eq!(region.image().get_pixel(0, 0).0, [10, 10, 0]);
        assert_eq!(region.image().get_pixel(19, 4).0, [29, 14, 0]);
    }

    #[test]
    fn no_face_falls_back_to_same_buffer() {
        let image = gradient(8, 8);
        let detector = FixedDetector::new(None);
        let region = select_region(&image, Some(&detector), DETECT).expect("region");

        assert!(region.is_full_image());
        assert!(std::ptr::eq(region.image(), &image));
        assert_eq!(region.rect(), PixelRect::full(8, 8));
        assert_eq!(detector.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn required_face_missing_is_a_failure() {
        let image = gradient(8, 8);
        let policy = RegionPolicy {
            use_detection: true,
            require_detection: true,
        };
        let detector = FixedDetector::new(None);
        assert_eq!(
            select_region(&image, Some(&detector), policy).unwrap_err(),
            RegionFailure::NoFaceFound
        );
        let outside = FixedDetector::new(Some(face(2.0, 2.0, 0.5, 0.5)));
        assert_eq!(
            select_region(&image, Some(&outside), policy).unwrap_err(),
            RegionFailure::NoFaceFound
        );
    }

    #[test]
    fn detection_disabled_skips_the_detector() {
        let image = gradient(8, 8);
        let detector = FixedDetector::new(Some(face(0.0, 0.0, 0.5, 0.5)));
        let policy = RegionPolicy {
            use_detection: false,
            require_detection: true,
        };
        let region = select_region(&image, Some(&detector), policy).expect("region");
        assert!(region.is_full_image());
        assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn detector_errors_degrade_to_no_face() {
        let image = gradient(8, 8);
        let region = select_region(&image, Some(&FailingDetector), DETECT).expect("region");
        assert!(region.is_full_image());
    }

    #[test]
    fn missing_detector_counts_as_no_face() {
        let image = gradient(8, 8);
        assert!(select_region(&image, None, DETECT).expect("region").is_full_image());
    }

    #[test]
    fn empty_image_is_rejected() {
        let image = RgbImage::new(0, 5);
        assert_eq!(
            select_region(&image, None, RegionPolicy::default()).unwrap_err(),
            RegionFailure::EmptyImage
        );
    }
}
