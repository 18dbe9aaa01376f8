//! Common helpers shared across skinseg crates.

/// Color models and pixel-level colorspace conversions.
pub mod color;
/// Persistent settings for the dataset builder.
pub mod config;
/// Image decoding, resizing, and tensor conversion.
pub mod image_utils;
/// Image, mask, and class-list persistence.
pub mod output;
/// Human-facing previews (mask overlays, colorized label masks).
pub mod preview;
/// Instrumentation helpers for optional performance tracing.
pub mod telemetry;

use std::path::Path;

use anyhow::Result;
use log::LevelFilter;

pub use color::{RgbaColor, hsv_to_rgb, rgb_to_hsv, rgb_to_hsv8, rgb_to_ycrcb8};
pub use image_utils::{
    compute_resize_scales, decode_rgb_image, load_image, resize_image, rgb_to_bgr_chw,
};
pub use output::{
    ImageFormatHint, OutputOptions, save_label_mask, save_rgb_image, write_class_list,
};
pub use preview::{class_color, colorize_label_mask, render_region_preview};
pub use telemetry::{
    TimingGuard, configure as configure_telemetry, telemetry_allows, telemetry_enabled,
    telemetry_level, timing_guard, timing_guard_if,
};

/// Initialize logging once for the CLI and tests.
///
/// `RUST_LOG` wins when it is set; otherwise `default_filter` applies.
pub fn init_logging(default_filter: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    builder.filter_module("skinseg::telemetry", LevelFilter::Trace);

    if builder.try_init().is_err() {
        // Logger already initialized; nothing to do.
    }
    Ok(())
}

/// Validate that a path exists and resolve it to an absolute path.
pub fn normalize_path<P: AsRef<Path>>(path: P) -> Result<std::path::PathBuf> {
    let path = path.as_ref();
    anyhow::ensure!(path.exists(), "path does not exist: {}", path.display());
    Ok(path.canonicalize()?)
}
