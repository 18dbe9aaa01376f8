use anyhow::Result;
use std::cmp::Ordering;
use tract_onnx::prelude::{Tensor, tract_ndarray::ArrayView2};
use skinseg_utils::config::DetectionSettings;

/// Columns in a decoded detection row: `[x, y, w, h, score]`.
pub const DETECTION_COLS: usize = 5;
/// Columns in rows emitted by YuNet exports that decode in-graph (bbox, 5 landmarks, score).
pub const FUSED_COLS: usize = 15;

/// Filtering applied to raw detector rows.
#[derive(Debug, Clone)]
pub struct PostprocessConfig {
    /// Minimum confidence score for a detection to be considered valid.
    pub score_threshold: f32,
    /// Threshold for non-maximum suppression to merge overlapping bounding boxes.
    pub nms_threshold: f32,
    /// The maximum number of detections kept after sorting by score.
    pub top_k: usize,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        DetectionSettings::default().into()
    }
}

/// Axis-aligned bounding box in source image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        (self.width.max(0.0)) * (self.height.max(0.0))
    }

    /// Intersection over union with another box.
    pub fn iou(&self, other: &Self) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        if intersection <= 0.0 {
            return 0.0;
        }

        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// A scored face box in source image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub score: f32,
}

/// Turn raw detector rows into final detections, best score first.
///
/// Rows below the score threshold or with a non-positive extent are dropped,
/// the rest are scaled back to the source image, truncated to `top_k` and
/// passed through greedy non-maximum suppression.
pub fn apply_postprocess(
    output: &Tensor,
    scale_x: f32,
    scale_y: f32,
    config: &PostprocessConfig,
) -> Result<Vec<Detection>> {
    let rows = detection_rows(output)?;
    let score_col = rows.ncols() - 1;

    let mut detections = Vec::new();
    for row in rows.rows() {
        let score = row[score_col];
        if !score.is_finite() || score < config.score_threshold {
            continue;
        }

        let bbox = BoundingBox {
            x: row[0] * scale_x,
            y: row[1] * scale_y,
            width: row[2] * scale_x,
            height: row[3] * scale_y,
        };
        if bbox.width <= 0.0 || bbox.height <= 0.0 {
            continue;
        }

        detections.push(Detection { bbox, score });
    }

    detections.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    if config.top_k > 0 && detections.len() > config.top_k {
        detections.truncate(config.top_k);
    }

    if config.nms_threshold > 0.0 && detections.len() > 1 {
        detections = non_max_suppression(detections, config.nms_threshold);
    }

    Ok(detections)
}

/// View the output tensor as a 2-D row matrix, accepting an optional batch axis.
fn detection_rows(output: &Tensor) -> Result<ArrayView2<'_, f32>> {
    let (rows, cols) = match output.shape() {
        [rows, cols] | [1, rows, cols] if *cols == DETECTION_COLS || *cols == FUSED_COLS => {
            (*rows, *cols)
        }
        other => anyhow::bail!(
            "detector output must have shape [N, {DETECTION_COLS}] or [N, {FUSED_COLS}], optionally batched (got {other:?})"
        ),
    };

    let slice = output
        .as_slice::<f32>()
        .map_err(|e| anyhow::anyhow!("detector output is not f32: {e}"))?;

    ArrayView2::from_shape((rows, cols), slice)
        .map_err(|_| anyhow::anyhow!("detector output data is not contiguous"))
}

fn non_max_suppression(detections: Vec<Detection>, threshold: f32) -> Vec<Detection> {
    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for detection in detections {
        if kept
            .iter()
            .all(|existing| detection.bbox.iou(&existing.bbox) <= threshold)
        {
            kept.push(detection);
        }
    }
    kept
}

impl From<DetectionSettings> for PostprocessConfig {
    fn from(settings: DetectionSettings) -> Self {
        PostprocessConfig {
            score_threshold: settings.score_threshold,
            nms_threshold: settings.nms_threshold,
            top_k: settings.top_k,
        }
    }
}

impl From<&DetectionSettings> for PostprocessConfig {
    fn from(settings: &DetectionSettings) -> Self {
        settings.clone().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor_from_rows(rows: &[[f32; DETECTION_COLS]]) -> Tensor {
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        Tensor::from_shape(&[rows.len(), DETECTION_COLS], &flat).unwrap()
    }

    #[test]
    fn filters_by_score_and_scales_coordinates() {
        let tensor = tensor_from_rows(&[
            [10.0, 20.0, 30.0, 40.0, 0.95],
            [5.0, 5.0, 10.0, 10.0, 0.2],
        ]);

        let detections = apply_postprocess(
            &tensor,
            2.0,
            0.5,
            &PostprocessConfig {
                score_threshold: 0.3,
                ..Default::default()
            },
        )
        .expect("postprocess should succeed");

        assert_eq!(detections.len(), 1);
        let det = detections[0];
        assert_eq!(det.score, 0.95);
        assert_eq!(
            det.bbox,
            BoundingBox {
                x: 20.0,
                y: 10.0,
                width: 60.0,
                height: 20.0
            }
        );
    }

    #[test]
    fn suppresses_overlapping_boxes_keeping_best() {
        let tensor = tensor_from_rows(&[
            [1.0, 1.0, 10.0, 10.0, 0.95],
            [0.0, 0.0, 10.0, 10.0, 0.99],
            [50.0, 50.0, 10.0, 10.0, 0.7],
        ]);

        let detections = apply_postprocess(&tensor, 1.0, 1.0, &PostprocessConfig::default())
            .expect("postprocess should succeed");

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].score, 0.99);
        assert_eq!(detections[1].score, 0.7);
    }

    #[test]
    fn drops_degenerate_boxes() {
        let tensor = tensor_from_rows(&[[3.0, 3.0, 0.0, 10.0, 0.99]]);
        let detections = apply_postprocess(&tensor, 1.0, 1.0, &PostprocessConfig::default())
            .expect("postprocess should succeed");
        assert!(detections.is_empty());
    }

    #[test]
    fn accepts_batched_fused_rows() {
        let mut row = [0.0f32; FUSED_COLS];
        row[2] = 4.0;
        row[3] = 4.0;
        row[FUSED_COLS - 1] = 0.8;
        let tensor = Tensor::from_shape(&[1, 1, FUSED_COLS], &row).unwrap();

        let detections = apply_postprocess(&tensor, 1.0, 1.0, &PostprocessConfig::default())
            .expect("postprocess should succeed");
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].score, 0.8);
    }

    #[test]
    fn rejects_unexpected_shapes() {
        let tensor = Tensor::from_shape(&[2, 7], &[0.0f32; 14]).unwrap();
        assert!(apply_postprocess(&tensor, 1.0, 1.0, &PostprocessConfig::default()).is_err());
    }

    #[test]
    fn converts_detection_settings_into_config() {
        let settings = DetectionSettings {
            score_threshold: 0.75,
            nms_threshold: 0.25,
            top_k: 123,
        };

        let config: PostprocessConfig = (&settings).into();
        assert_eq!(config.score_threshold, 0.75);
        assert_eq!(config.nms_threshold, 0.25);
        assert_eq!(config.top_k, 123);
        assert_eq!(PostprocessConfig::default().score_threshold, 0.5);
    }
}
