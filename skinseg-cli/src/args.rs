//! Command-line argument definitions for skinseg-cli.

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use skinseg_utils::config::ResizeQuality;

/// Turn a per-class image folder tree into a skin segmentation dataset.
///
/// Reads `<input>/<split>/<class>/<image>` and writes skin-only images to
/// `<output>/images/<split>/`, label masks to `<output>/masks/<split>/` and the
/// class list to `<output>/classes.txt`.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct BuildArgs {
    /// Root of the classification dataset (defaults to the settings file, then `dataset_original`).
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Root of the generated dataset (defaults to the settings file, then `dataset`).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Path to the YuNet face detection ONNX model.
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Optional settings JSON. Defaults to `config/skinseg_settings.json` when present, otherwise built-in parameters.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Use the whole image as the region; the face detector is not loaded.
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_face_detection: bool,

    /// Skip images in which no face is found instead of using the whole image.
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "no_face_detection")]
    pub require_face: bool,

    /// Override the face detection score threshold.
    #[arg(long)]
    pub score_threshold: Option<f32>,

    /// Override the NMS threshold.
    #[arg(long)]
    pub nms_threshold: Option<f32>,

    /// Override detector input width (pixels).
    #[arg(long)]
    pub width: Option<u32>,

    /// Override detector input height (pixels).
    #[arg(long)]
    pub height: Option<u32>,

    /// Resize quality mode: `quality` (Triangle) or `speed` (fast Nearest).
    #[arg(long, value_name = "MODE")]
    pub resize_quality: Option<ResizeQuality>,

    /// Minimum fraction of region pixels that must be skin (0.0-1.0).
    #[arg(long, value_name = "RATIO")]
    pub min_skin_ratio: Option<f64>,

    /// Comma-separated splits to process, in order (e.g. `train,valid,test`).
    #[arg(long, value_delimiter = ',', value_name = "SPLIT")]
    pub splits: Option<Vec<String>>,

    /// Worker threads for per-image processing (defaults to one per core).
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Also write mask overlays to `<output>/previews/<split>/`.
    #[arg(long, action = ArgAction::SetTrue)]
    pub preview: bool,

    /// Write a JSON summary of the run to this path.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Enable telemetry timing logs (defaults to settings file).
    #[arg(long, action = ArgAction::SetTrue)]
    pub telemetry: bool,

    /// Override telemetry logging level (error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub telemetry_level: Option<String>,

    /// Log per-image decisions.
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub verbose: bool,
}
