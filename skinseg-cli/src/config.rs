//! Configuration loading and CLI override logic.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;
use skinseg_utils::{
    config::{AppSettings, default_settings_path},
    normalize_path,
};

use crate::args::BuildArgs;

/// Load application settings from a file or use defaults.
pub fn load_settings(config_path: Option<&PathBuf>) -> Result<AppSettings> {
    if let Some(path) = config_path {
        let resolved = normalize_path(path)?;
        let settings = AppSettings::load_from_path(&resolved)?;
        info!("Loaded settings from {}", resolved.display());
        Ok(settings)
    } else {
        let default_path = default_settings_path();
        if default_path.exists() {
            let settings = AppSettings::load_from_path(&default_path).with_context(|| {
                format!(
                    "failed to load default settings from {}",
                    default_path.display()
                )
            })?;
            info!("Loaded settings from {}", default_path.display());
            Ok(settings)
        } else {
            Ok(AppSettings::default())
        }
    }
}

/// Apply command-line arguments on top of loaded or default settings.
pub fn apply_cli_overrides(settings: &mut AppSettings, args: &BuildArgs) {
    if let Some(input) = args.input.as_ref() {
        settings.dataset.input_root = input.clone();
    }
    if let Some(output) = args.output.as_ref() {
        settings.dataset.output_root = output.clone();
    }
    if let Some(model) = args.model.as_ref() {
        settings.model_path = Some(model.display().to_string());
    }

    if args.no_face_detection {
        settings.region.use_detection = false;
        settings.region.require_detection = false;
    }
    if args.require_face {
        settings.region.use_detection = true;
        settings.region.require_detection = true;
    }

    if let Some(score) = args.score_threshold {
        settings.detection.score_threshold = score;
    }
    if let Some(nms) = args.nms_threshold {
        settings.detection.nms_threshold = nms;
    }
    if let Some(width) = args.width {
        settings.input.width = width;
    }
    if let Some(height) = args.height {
        settings.input.height = height;
    }
    if let Some(mode) = args.resize_quality {
        settings.input.resize_quality = mode;
    }

    if let Some(ratio) = args.min_skin_ratio {
        settings.skin.min_skin_ratio = ratio;
    }
    if let Some(splits) = args.splits.as_ref() {
        settings.dataset.splits = splits
            .iter()
            .map(|split| split.trim().to_string())
            .filter(|split| !split.is_empty())
            .collect();
    }
    if args.preview {
        settings.dataset.previews = true;
    }

    if args.telemetry {
        settings.telemetry.enabled = true;
    }
    if let Some(level) = args.telemetry_level.as_ref() {
        let normalized = level.trim();
        if !normalized.is_empty() {
            let lower = normalized.to_ascii_lowercase();
            settings.telemetry.level = lower.clone();
            if lower == "off" {
                settings.telemetry.enabled = false;
            }
        }
    }

    settings.sanitize();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::Path;

    fn parse(args: &[&str]) -> BuildArgs {
        BuildArgs::parse_from(std::iter::once("skinseg-cli").chain(args.iter().copied()))
    }

    #[test]
    fn flags_override_settings() {
        let mut settings = AppSettings::default();
        let args = parse(&[
            "--input",
            "raw",
            "--output",
            "out",
            "--model",
            "m.onnx",
            "--require-face",
            "--min-skin-ratio",
            "0.2",
            "--splits",
            "train, valid",
            "--preview",
        ]);
        apply_cli_overrides(&mut settings, &args);

        assert_eq!(settings.dataset.input_root, Path::new("raw"));
        assert_eq!(settings.dataset.output_root, Path::new("out"));
        assert_eq!(settings.model_path(), Path::new("m.onnx"));
        assert!(settings.region.use_detection && settings.region.require_detection);
        assert_eq!(settings.skin.min_skin_ratio, 0.2);
        assert_eq!(settings.dataset.splits, vec!["train", "valid"]);
        assert!(settings.dataset.previews);
    }

    #[test]
    fn disabling_detection_clears_requirement() {
        let mut settings = AppSettings::default();
        settings.region.require_detection = true;
        apply_cli_overrides(&mut settings, &parse(&["--no-face-detection"]));
        assert!(!settings.region.use_detection);
        assert!(!settings.region.require_detection);
    }

    #[test]
    fn absent_flags_keep_settings() {
        let mut settings = AppSettings::default();
        settings.skin.min_skin_ratio = 0.3;
        settings.dataset.previews = true;
        apply_cli_overrides(&mut settings, &parse(&[]));
        assert_eq!(settings.skin.min_skin_ratio, 0.3);
        assert!(settings.dataset.previews);
        assert!(settings.region.use_detection);
    }

    #[test]
    fn telemetry_off_level_disables_telemetry() {
        let mut settings = AppSettings::default();
        apply_cli_overrides(
            &mut settings,
            &parse(&["--telemetry", "--telemetry-level", "OFF"]),
        );
        assert!(!settings.telemetry.enabled);
        assert_eq!(settings.telemetry.level, "off");
    }
}
