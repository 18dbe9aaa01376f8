use anyhow::Result;
use image::{GrayImage, Rgb, RgbImage};
use skinseg_core::{
    ClassVocabulary, ExtractionFailure, FaceDetection, FaceDetector, PixelRect, RegionPolicy,
    RegionSource, RelativeBox, SamplePipeline, SkipReason, encode_label, extract_skin,
    extract_skin_mask, select_region,
};
use skinseg_utils::config::SkinSettings;
use tempfile::tempdir;

const SKIN: Rgb<u8> = Rgb([220, 160, 130]);
const BACKDROP: Rgb<u8> = Rgb([30, 60, 200]);

struct StubDetector(Option<RelativeBox>);

impl FaceDetector for StubDetector {
    fn detect(&self, _image: &RgbImage) -> Result<Option<FaceDetection>> {
        Ok(self.0.map(|bbox| FaceDetection { bbox, score: 0.97 }))
    }
}

/// Skin inside `skin` (pixel rectangle), backdrop elsewhere.
fn portrait(width: u32, height: u32, skin: PixelRect) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let inside = x >= skin.x
            && x < skin.x + skin.width
            && y >= skin.y
            && y < skin.y + skin.height;
        if inside { SKIN } else { BACKDROP }
    })
}

#[test]
fn dry_sample_with_forty_percent_skin_gets_label_two() {
    let vocabulary = ClassVocabulary::new(["oily", "dry", "normal"]).expect("vocabulary");
    let image = portrait(100, 100, PixelRect::full(40, 100));

    let extraction = extract_skin_mask(&image).expect("40% coverage is accepted");
    assert_eq!(extraction.skin_ratio, 0.40);

    let class_id = vocabulary.id_of("dry").expect("dry is known");
    let label = encode_label(&extraction.mask, class_id, vocabulary.len()).expect("encode");

    assert_eq!(label.max_value(), 2);
    assert!(label.max_value() as usize <= vocabulary.len());
    for (x, y, value) in label.as_image().enumerate_pixels() {
        let expected = if extraction.mask.get_pixel(x, y)[0] > 0 { 2 } else { 0 };
        assert_eq!(value[0], expected, "pixel ({x}, {y})");
    }
}

#[test]
fn all_black_input_is_always_rejected() {
    for (w, h) in [(1, 1), (7, 3), (64, 64)] {
        let err = extract_skin_mask(&RgbImage::new(w, h)).unwrap_err();
        assert_eq!(
            err,
            ExtractionFailure::InsufficientSkin {
                ratio: 0.0,
                minimum: 0.05
            }
        );
    }
}

#[test]
fn mask_dimensions_follow_the_face_region() {
    let image = portrait(100, 80, PixelRect {
        x: 20,
        y: 20,
        width: 50,
        height: 40,
    });
    let detector = StubDetector(Some(RelativeBox {
        x: 0.2,
        y: 0.25,
        width: 0.5,
        height: 0.5,
    }));
    let pipeline = SamplePipeline::new(
        Some(&detector),
        RegionPolicy::default(),
        &SkinSettings::default(),
    );

    let sample = pipeline.process_image(image).expect("face sample");
    assert_eq!(sample.source, RegionSource::Face { score: 0.97 });
    assert_eq!(sample.region, PixelRect {
        x: 20,
        y: 20,
        width: 50,
        height: 40
    });
    assert_eq!(sample.mask.dimensions(), (50, 40));
    assert_eq!(sample.skin_image.dimensions(), (50, 40));
    assert_eq!(sample.skin_ratio, 1.0);
}

#[test]
fn fallback_region_is_the_caller_buffer() {
    let image = portrait(32, 32, PixelRect::full(16, 32));
    let detector = StubDetector(None);
    let policy = RegionPolicy {
        use_detection: true,
        require_detection: false,
    };

    let region = select_region(&image, Some(&detector), policy).expect("fallback");
    assert!(std::ptr::eq(region.image(), &image));
    assert_eq!(region.rect(), PixelRect::full(32, 32));
}

#[test]
fn required_face_turns_into_a_skip() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("no_face.png");
    portrait(32, 32, PixelRect::full(32, 32))
        .save(&path)
        .expect("save");

    let policy = RegionPolicy {
        use_detection: true,
        require_detection: true,
    };
    let detector = StubDetector(None);
    assert!(extract_skin(&path, Some(&detector), policy).is_none());

    let pipeline = SamplePipeline::new(Some(&detector), policy, &SkinSettings::default());
    assert_eq!(pipeline.process_path(&path).unwrap_err().kind(), "no_face");
}

#[test]
fn pixels_passing_one_colorspace_are_excluded() {
    // HSV-only on the left half, YCrCb-only on the right half.
    let image = RgbImage::from_fn(40, 40, |x, _| {
        if x < 20 {
            Rgb([200, 193, 160])
        } else {
            Rgb([180, 90, 110])
        }
    });
    let pipeline = SamplePipeline::new(
        None,
        RegionPolicy {
            use_detection: false,
            require_detection: false,
        },
        &SkinSettings::default(),
    );
    assert!(matches!(
        pipeline.process_image(image),
        Err(SkipReason::Extraction(ExtractionFailure::InsufficientSkin { ratio, .. })) if ratio == 0.0
    ));
}

#[test]
fn extraction_is_deterministic() {
    let image = RgbImage::from_fn(64, 48, |x, y| {
        if (x / 6 + y / 5) % 3 == 0 {
            BACKDROP
        } else {
            SKIN
        }
    });
    let first = extract_skin_mask(&image).expect("first run");
    let second = extract_skin_mask(&image).expect("second run");
    assert_eq!(first.mask, second.mask);
    assert_eq!(first.skin_image, second.skin_image);
    assert_eq!(first.skin_ratio, second.skin_ratio);
}

#[test]
fn label_values_stay_within_vocabulary() {
    let vocabulary = ClassVocabulary::new(["a", "b", "c", "d"]).expect("vocabulary");
    let mut binary = GrayImage::new(12, 12);
    for (x, y, pixel) in binary.enumerate_pixels_mut() {
        if (x * y) % 5 == 0 {
            pixel[0] = 255;
        }
    }
    for (id, _) in vocabulary.iter() {
        let label = encode_label(&binary, id, vocabulary.len()).expect("encode");
        assert_eq!(label.max_value(), id);
        assert!(label.as_image().pixels().all(|p| p[0] == 0 || p[0] == id));
    }
    assert!(encode_label(&binary, 5, vocabulary.len()).is_err());
}
