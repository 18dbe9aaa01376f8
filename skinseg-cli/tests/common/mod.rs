/// Common helpers for CLI integration tests: synthetic dataset trees.
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};

/// Passes both the HSV and YCrCb skin tests.
pub const SKIN: Rgb<u8> = Rgb([220, 160, 130]);
/// Fails both tests.
pub const BACKDROP: Rgb<u8> = Rgb([20, 40, 160]);

pub fn find_model_path() -> Option<PathBuf> {
    let candidates = vec![
        "models/face_detection_yunet_2023mar.onnx",
        "../models/face_detection_yunet_2023mar.onnx",
    ];
    candidates
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .and_then(|p| p.canonicalize().ok())
}

/// A 50x50 image whose first `skin_columns` columns are skin.
pub fn striped_image(skin_columns: u32) -> RgbImage {
    RgbImage::from_fn(50, 50, |x, _| if x < skin_columns { SKIN } else { BACKDROP })
}

pub fn write_image(path: &Path, image: &RgbImage) {
    std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    image.save(path).expect("save image");
}

/// Builds `<root>/{train,valid}/<class>/<image>`:
///
/// - `train/dry/dry_01.png`: 40% skin
/// - `train/dry/black.png`: no skin, rejected
/// - `train/oily/oily_01.png`: 60% skin
/// - `valid/oily/oily_02.png`: 100% skin
///
/// No `test` split exists.
pub fn build_input_tree(root: &Path) {
    write_image(&root.join("train/dry/dry_01.png"), &striped_image(20));
    write_image(
        &root.join("train/dry/black.png"),
        &RgbImage::from_pixel(50, 50, Rgb([0, 0, 0])),
    );
    write_image(&root.join("train/oily/oily_01.png"), &striped_image(30));
    write_image(&root.join("valid/oily/oily_02.png"), &striped_image(50));
}
