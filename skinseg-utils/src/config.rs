//! Shared configuration types consumed across the skinseg workspace.
//!
//! Every section deserializes with `#[serde(default)]`, so a settings file only
//! needs the keys it wants to change. The CLI layers its flags on top of the
//! loaded (or default) [`AppSettings`].

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Default location of the face detection model.
pub const DEFAULT_MODEL_PATH: &str = "models/face_detection_yunet_2023mar.onnx";

/// Face detector post-processing parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionSettings {
    /// Minimum confidence score for a detection to be considered valid.
    pub score_threshold: f32,
    /// Threshold for non-maximum suppression to merge overlapping boxes.
    pub nms_threshold: f32,
    /// The maximum number of candidates kept before suppression.
    pub top_k: usize,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
            nms_threshold: 0.3,
            top_k: 5_000,
        }
    }
}

/// Resize filter preference used when scaling images for the detector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeQuality {
    /// Triangle filter.
    #[default]
    Quality,
    /// Nearest neighbour.
    Speed,
}

impl fmt::Display for ResizeQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResizeQuality::Quality => "quality",
            ResizeQuality::Speed => "speed",
        })
    }
}

impl FromStr for ResizeQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quality" => Ok(ResizeQuality::Quality),
            "speed" => Ok(ResizeQuality::Speed),
            other => Err(format!(
                "invalid resize quality '{other}'; expected 'quality' or 'speed'"
            )),
        }
    }
}

/// Detector input resolution in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputDimensions {
    pub width: u32,
    pub height: u32,
    pub resize_quality: ResizeQuality,
}

impl Default for InputDimensions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 640,
            resize_quality: ResizeQuality::Quality,
        }
    }
}

/// How the region of interest is chosen for each image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RegionSettings {
    /// Run the face detector at all.
    pub use_detection: bool,
    /// Reject images in which no face is found instead of using the full frame.
    pub require_detection: bool,
}

impl Default for RegionSettings {
    fn default() -> Self {
        Self {
            use_detection: true,
            require_detection: false,
        }
    }
}

/// Inclusive per-channel bounds for an 8-bit three-channel pixel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl ChannelRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    /// Returns `true` when every channel lies within its bounds.
    pub fn contains(&self, pixel: [u8; 3]) -> bool {
        pixel
            .iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .all(|(value, (lo, hi))| (*lo..=*hi).contains(value))
    }
}

/// Skin classification thresholds and the coverage gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SkinSettings {
    /// Bounds on OpenCV-scaled HSV (hue 0..180).
    pub hsv: ChannelRange,
    /// Bounds on YCrCb.
    pub ycrcb: ChannelRange,
    /// Side length of the elliptical structuring element.
    pub kernel_size: u32,
    /// Samples whose cleaned mask covers less than this fraction are rejected.
    pub min_skin_ratio: f64,
}

impl Default for SkinSettings {
    fn default() -> Self {
        Self {
            hsv: ChannelRange::new([0, 40, 60], [25, 255, 255]),
            ycrcb: ChannelRange::new([0, 135, 85], [255, 180, 135]),
            kernel_size: 5,
            min_skin_ratio: 0.05,
        }
    }
}

impl SkinSettings {
    /// Clamp values to ranges the extractor can work with.
    pub fn sanitize(&mut self) {
        self.kernel_size = self.kernel_size.clamp(1, 31);
        if !self.min_skin_ratio.is_finite() {
            self.min_skin_ratio = Self::default().min_skin_ratio;
        }
        self.min_skin_ratio = self.min_skin_ratio.clamp(0.0, 1.0);
    }
}

/// Input/output layout of a dataset build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatasetSettings {
    /// Root of the classification dataset (`<root>/<split>/<class>/<image>`).
    pub input_root: PathBuf,
    /// Root of the generated segmentation dataset.
    pub output_root: PathBuf,
    /// Splits processed in order. Class names always come from `train`.
    pub splits: Vec<String>,
    /// Accepted source extensions, compared case-insensitively.
    pub extensions: Vec<String>,
    /// JPEG quality used when a skin image is written as JPEG (1-100).
    pub jpeg_quality: u8,
    /// Write mask overlays under `<output_root>/previews/<split>`.
    pub previews: bool,
    /// Overlay opacity for previews (0.0-1.0).
    pub preview_alpha: f32,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            input_root: PathBuf::from("dataset_original"),
            output_root: PathBuf::from("dataset"),
            splits: vec!["train".into(), "valid".into(), "test".into()],
            extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
            jpeg_quality: 95,
            previews: false,
            preview_alpha: 0.4,
        }
    }
}

impl DatasetSettings {
    /// Clamp values to sensible ranges.
    pub fn sanitize(&mut self) {
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        self.preview_alpha = if self.preview_alpha.is_finite() {
            self.preview_alpha.clamp(0.0, 1.0)
        } else {
            0.4
        };
        for ext in &mut self.extensions {
            *ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        }
        self.extensions.retain(|ext| !ext.is_empty());
    }
}

/// Settings controlling optional runtime telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Whether telemetry timing logs are enabled.
    pub enabled: bool,
    /// Logging level for telemetry output (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "debug".to_string(),
        }
    }
}

impl TelemetrySettings {
    /// Resolve the configured level string into a `LevelFilter`.
    pub fn level_filter(&self) -> LevelFilter {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" | "warning" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Debug,
        }
    }
}

/// Persistent settings for a dataset build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Face detection model path. `None` falls back to [`DEFAULT_MODEL_PATH`].
    pub model_path: Option<String>,
    pub input: InputDimensions,
    pub detection: DetectionSettings,
    pub region: RegionSettings,
    pub skin: SkinSettings,
    pub dataset: DatasetSettings,
    pub telemetry: TelemetrySettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            model_path: Some(DEFAULT_MODEL_PATH.into()),
            input: InputDimensions::default(),
            detection: DetectionSettings::default(),
            region: RegionSettings::default(),
            skin: SkinSettings::default(),
            dataset: DatasetSettings::default(),
            telemetry: TelemetrySettings::default(),
        }
    }
}

impl AppSettings {
    /// Load settings from a JSON file.
    ///
    /// Missing keys take their defaults and a missing `model_path` falls back
    /// to [`DEFAULT_MODEL_PATH`].
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let mut settings: AppSettings = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings JSON at {}", path.display()))?;

        if settings.model_path.is_none() {
            settings.model_path = Some(DEFAULT_MODEL_PATH.into());
        }
        settings.sanitize();

        Ok(settings)
    }

    /// Serialize settings to disk in pretty-printed JSON, overwriting any existing file.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let payload =
            serde_json::to_string_pretty(self).context("failed to serialize settings JSON")?;
        fs::write(path, payload)
            .with_context(|| format!("failed to write settings file {}", path.display()))?;
        Ok(())
    }

    /// Clamp every section into its valid range.
    pub fn sanitize(&mut self) {
        self.skin.sanitize();
        self.dataset.sanitize();
    }

    /// Resolved model path.
    pub fn model_path(&self) -> PathBuf {
        PathBuf::from(self.model_path.as_deref().unwrap_or(DEFAULT_MODEL_PATH))
    }
}

/// Default path for persisted settings (`config/skinseg_settings.json`).
pub fn default_settings_path() -> PathBuf {
    env::current_dir()
        .map(|dir| dir.join("config/skinseg_settings.json"))
        .unwrap_or_else(|_| PathBuf::from("config/skinseg_settings.json"))
}
