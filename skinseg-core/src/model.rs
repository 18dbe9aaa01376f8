use std::{fmt::Write, path::Path};

use anyhow::{Context, Result};
use log::{debug, warn};
use tract_onnx::prelude::{
    Framework, Graph, InferenceModelExt, IntoTensor, SimplePlan, Tensor, TypedFact, TypedOp, tvec,
};

use crate::postprocess::DETECTION_COLS;
use crate::preprocess::InputSize;

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

const STRIDES: [usize; 3] = [8, 16, 32];
/// cls, obj, bbox, kps per stride.
const OUTPUTS_PER_STRIDE: usize = 4;

/// The YuNet face detection graph prepared for execution with `tract`.
#[derive(Debug)]
pub struct YuNetModel {
    runnable: RunnableModel,
    input_size: InputSize,
}

impl YuNetModel {
    /// Load and optimize the ONNX graph.
    ///
    /// If tract cannot optimize the graph it is retried in decluttered form,
    /// which runs roughly half as fast but accepts more operator variants.
    pub fn load<P: AsRef<Path>>(model_path: P, input_size: InputSize) -> Result<Self> {
        let path = model_path.as_ref();
        anyhow::ensure!(path.exists(), "model file not found: {}", path.display());

        let runnable = match load_runnable_model(path, true) {
            Ok(model) => {
                debug!(
                    "Face model {} optimized ({}x{})",
                    path.display(),
                    input_size.width,
                    input_size.height
                );
                model
            }
            Err(opt_err) => {
                let optimize_msg = format!("{opt_err}");
                let mut chain_msg = String::new();
                for cause in opt_err.chain() {
                    let _ = writeln!(&mut chain_msg, "  - {cause}");
                }
                warn!(
                    "Face model {} failed optimized load ({}); using decluttered graph.\n{}",
                    path.display(),
                    optimize_msg,
                    chain_msg.trim_end()
                );
                load_runnable_model(path, false).with_context(|| {
                    format!("decluttered load failed after optimize error: {optimize_msg}")
                })?
            }
        };

        Ok(Self {
            runnable,
            input_size,
        })
    }

    /// Run the graph on a `[1, 3, H, W]` BGR tensor.
    ///
    /// Returns a `[N, 5]` tensor of `[x, y, w, h, score]` rows in input-tensor
    /// pixels. Exports that already decode in-graph are passed through as-is.
    pub fn run(&self, input: Tensor) -> Result<Tensor> {
        let outputs = self
            .runnable
            .run(tvec![input.into()])
            .map_err(|e| anyhow::anyhow!("face model execution failed: {e}"))?;

        let mut tensors: Vec<Tensor> = outputs
            .into_iter()
            .map(|value| value.into_tensor())
            .collect();

        match tensors.len() {
            1 => tensors
                .pop()
                .ok_or_else(|| anyhow::anyhow!("face model produced no outputs")),
            len if len == STRIDES.len() * OUTPUTS_PER_STRIDE => {
                decode_stride_outputs(&tensors, self.input_size)
            }
            other => anyhow::bail!(
                "unexpected number of face model outputs: expected 1 or {}, got {}",
                STRIDES.len() * OUTPUTS_PER_STRIDE,
                other
            ),
        }
    }

    pub fn input_size(&self) -> InputSize {
        self.input_size
    }
}

fn load_runnable_model(path: &Path, optimized: bool) -> Result<RunnableModel> {
    // The graph keeps the input shape declared in the ONNX file.
    let model = tract_onnx::onnx()
        .model_for_path(path)
        .with_context(|| format!("failed to parse ONNX graph from {}", path.display()))?;

    if optimized {
        model
            .into_optimized()
            .map_err(|e| anyhow::anyhow!("unable to optimize face model graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make face model runnable: {e}"))
    } else {
        model
            .into_typed()
            .map_err(|e| anyhow::anyhow!("unable to type-check face model graph: {e}"))?
            .into_decluttered()
            .map_err(|e| anyhow::anyhow!("unable to declutter face model graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make face model runnable: {e}"))
    }
}

fn f32_output<'a>(outputs: &'a [Tensor], index: usize, name: &str) -> Result<&'a [f32]> {
    outputs[index]
        .as_slice::<f32>()
        .map_err(|e| anyhow::anyhow!("{name} output not f32: {e}"))
}

/// Decode YuNet's per-stride anchor-free heads into box rows.
///
/// Outputs are ordered `cls x3, obj x3, bbox x3, kps x3` (strides 8, 16, 32).
/// Landmarks are not needed for region selection and are skipped.
pub(crate) fn decode_stride_outputs(outputs: &[Tensor], input_size: InputSize) -> Result<Tensor> {
    anyhow::ensure!(
        outputs.len() == STRIDES.len() * OUTPUTS_PER_STRIDE,
        "stride decode expects {} tensors, got {}",
        STRIDES.len() * OUTPUTS_PER_STRIDE,
        outputs.len()
    );

    let pad_w = (input_size.width as usize).div_ceil(32) * 32;
    let pad_h = (input_size.height as usize).div_ceil(32) * 32;

    let mut fused = Vec::new();
    for (stride_index, &stride) in STRIDES.iter().enumerate() {
        let cols = pad_w / stride;
        let rows = pad_h / stride;
        let cell_count = rows * cols;
        let stride_f = stride as f32;

        let cls = f32_output(outputs, stride_index, "cls")?;
        let obj = f32_output(outputs, stride_index + STRIDES.len(), "obj")?;
        let bbox = f32_output(outputs, stride_index + STRIDES.len() * 2, "bbox")?;
        anyhow::ensure!(
            cls.len() == cell_count && obj.len() == cell_count,
            "score head length mismatch at stride {stride}: expected {cell_count}, got cls {} / obj {}",
            cls.len(),
            obj.len()
        );
        anyhow::ensure!(
            bbox.len() == cell_count * 4,
            "bbox length mismatch at stride {stride}: expected {}, got {}",
            cell_count * 4,
            bbox.len()
        );

        fused.reserve(cell_count * DETECTION_COLS);
        for row in 0..rows {
            for col in 0..cols {
                let idx = row * cols + col;
                let score = (cls[idx].clamp(0.0, 1.0) * obj[idx].clamp(0.0, 1.0)).sqrt();
                let score = if score.is_finite() { score } else { 0.0 };

                let delta = &bbox[idx * 4..idx * 4 + 4];
                let cx = (col as f32 + delta[0]) * stride_f;
                let cy = (row as f32 + delta[1]) * stride_f;
                let w = delta[2].exp() * stride_f;
                let h = delta[3].exp() * stride_f;

                fused.extend_from_slice(&[
                    (-0.5f32).mul_add(w, cx),
                    (-0.5f32).mul_add(h, cy),
                    w,
                    h,
                    score,
                ]);
            }
        }
    }

    let rows = fused.len() / DETECTION_COLS;
    Tensor::from_shape(&[rows, DETECTION_COLS], &fused)
        .map_err(|e| anyhow::anyhow!("failed to build decoded detection tensor: {e}"))
}
