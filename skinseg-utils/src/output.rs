//! Persistence helpers for the generated dataset.
//!
//! Skin images keep the encoding implied by their file extension. Label masks
//! are always written as single-channel 8-bit PNG because any lossy codec
//! would smear class ids across boundaries.

use anyhow::{Context, Result};
use image::{
    ExtendedColorType, GrayImage, ImageEncoder, RgbImage,
    codecs::{
        bmp::BmpEncoder,
        jpeg::JpegEncoder,
        png::{CompressionType, FilterType, PngEncoder},
        webp::WebPEncoder,
    },
};
use log::debug;
use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};

/// Image formats the exporter can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormatHint {
    #[default]
    Png,
    Jpeg,
    Bmp,
    Webp,
}

impl ImageFormatHint {
    /// Determine format from a filesystem extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        ext.parse().ok()
    }

    /// Determine format from a path, defaulting to PNG.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .unwrap_or_default()
    }
}

impl std::str::FromStr for ImageFormatHint {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "bmp" => Ok(Self::Bmp),
            "webp" => Ok(Self::Webp),
            other => Err(format!("unknown image format '{other}'")),
        }
    }
}

/// Encoder tuning shared by every image written during a run.
#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub jpeg_quality: u8,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self { jpeg_quality: 95 }
    }
}

/// Write an RGB image, choosing the encoder from the destination extension.
pub fn save_rgb_image(image: &RgbImage, destination: &Path, options: &OutputOptions) -> Result<()> {
    let format = ImageFormatHint::from_path(destination);
    debug!("Saving {} as {:?}", destination.display(), format);

    let mut buffer = Vec::new();
    let (w, h) = image.dimensions();
    let raw = image.as_raw();
    match format {
        ImageFormatHint::Png => PngEncoder::new_with_quality(
            &mut buffer,
            CompressionType::Default,
            FilterType::Adaptive,
        )
        .write_image(raw, w, h, ExtendedColorType::Rgb8)
        .context("failed to encode PNG")?,
        ImageFormatHint::Jpeg => {
            JpegEncoder::new_with_quality(&mut buffer, options.jpeg_quality.clamp(1, 100))
                .write_image(raw, w, h, ExtendedColorType::Rgb8)
                .context("failed to encode JPEG")?
        }
        ImageFormatHint::Bmp => BmpEncoder::new(&mut buffer)
            .write_image(raw, w, h, ExtendedColorType::Rgb8)
            .context("failed to encode BMP")?,
        ImageFormatHint::Webp => WebPEncoder::new_lossless(&mut buffer)
            .write_image(raw, w, h, ExtendedColorType::Rgb8)
            .context("failed to encode WebP")?,
    }

    write_bytes(destination, &buffer)
}

/// Write a single-channel label mask as lossless PNG.
pub fn save_label_mask(mask: &GrayImage, destination: &Path) -> Result<()> {
    let mut buffer = Vec::new();
    PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, FilterType::Adaptive)
        .write_image(
            mask.as_raw(),
            mask.width(),
            mask.height(),
            ExtendedColorType::L8,
        )
        .context("failed to encode mask PNG")?;
    write_bytes(destination, &buffer)
}

/// Write one class name per line; line `i` (1-based) names label id `i`.
pub fn write_class_list<S: AsRef<str>>(names: &[S], destination: &Path) -> Result<()> {
    let mut contents = String::new();
    for name in names {
        contents.push_str(name.as_ref());
        contents.push('\n');
    }
    write_bytes(destination, contents.as_bytes())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty() && !p.exists()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file =
        fs::File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))
}
