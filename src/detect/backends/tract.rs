#![cfg(feature = "face-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::FaceDetector;
use crate::detect::region::{FaceRegion, Rect};
use crate::frame::GrayFrame;

/// Overlap above which a lower-ranked candidate is suppressed.
const SUPPRESSION_IOU: f32 = 0.3;

/// Tract-based face backend for UltraFace-style ONNX models.
///
/// The model takes `[1, 3, H, W]` input normalised as `(p - 127) / 128` and
/// yields `scores[1, N, 2]` (background, face) and `boxes[1, N, 4]` as
/// normalised corner coordinates. Regions keep the model's anchor order.
pub struct TractFaceBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    width: u32,
    height: u32,
    confidence_threshold: f32,
}

impl TractFaceBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
            confidence_threshold: 0.7,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Nearest-neighbour resample of the gray frame into the model input,
    /// replicated across the three channels.
    fn build_input(&self, frame: &GrayFrame) -> Result<Tensor> {
        if frame.width == 0 || frame.height == 0 {
            return Err(anyhow!("cannot run face detection on an empty frame"));
        }
        let (in_w, in_h) = (self.width as usize, self.height as usize);
        let (src_w, src_h) = (frame.width as usize, frame.height as usize);
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, in_h, in_w), |(_, _, y, x)| {
            let sx = (x * src_w / in_w).min(src_w - 1);
            let sy = (y * src_h / in_h).min(src_h - 1);
            (frame.get(sx as u32, sy as u32) as f32 - 127.0) / 128.0
        });
        Ok(input.into_tensor())
    }

    fn extract_faces(&self, outputs: TVec<TValue>, frame: &GrayFrame) -> Result<Vec<FaceRegion>> {
        let scores = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no score output"))?
            .to_array_view::<f32>()
            .context("score tensor was not f32")?;
        let boxes = outputs
            .get(1)
            .ok_or_else(|| anyhow!("model produced no box output"))?
            .to_array_view::<f32>()
            .context("box tensor was not f32")?;

        let anchors = scores.len() / 2;
        if boxes.len() != anchors * 4 {
            return Err(anyhow!(
                "score/box outputs disagree: {} anchors vs {} box values",
                anchors,
                boxes.len()
            ));
        }
        let scores: Vec<f32> = scores.iter().copied().collect();
        let boxes: Vec<f32> = boxes.iter().copied().collect();

        let (fw, fh) = (frame.width as f32, frame.height as f32);
        let mut candidates: Vec<FaceRegion> = Vec::new();
        for i in 0..anchors {
            let confidence = scores[i * 2 + 1];
            if confidence < self.confidence_threshold {
                continue;
            }
            let x1 = (boxes[i * 4] * fw).clamp(0.0, fw);
            let y1 = (boxes[i * 4 + 1] * fh).clamp(0.0, fh);
            let x2 = (boxes[i * 4 + 2] * fw).clamp(0.0, fw);
            let y2 = (boxes[i * 4 + 3] * fh).clamp(0.0, fh);
            if x2 <= x1 || y2 <= y1 {
                continue;
            }
            candidates.push(FaceRegion {
                rect: Rect::new(x1 as u32, y1 as u32, (x2 - x1) as u32, (y2 - y1) as u32),
                confidence,
            });
        }

        Ok(suppress_overlaps(candidates))
    }
}

/// Greedy suppression by confidence. Survivors keep their input order.
fn suppress_overlaps(candidates: Vec<FaceRegion>) -> Vec<FaceRegion> {
    let mut ranked: Vec<usize> = (0..candidates.len()).collect();
    ranked.sort_by(|&a, &b| candidates[b].confidence.total_cmp(&candidates[a].confidence));

    let mut keep = vec![false; candidates.len()];
    let mut kept: Vec<usize> = Vec::new();
    for idx in ranked {
        let overlaps = kept
            .iter()
            .any(|&k| candidates[k].rect.iou(&candidates[idx].rect) > SUPPRESSION_IOU);
        if !overlaps {
            keep[idx] = true;
            kept.push(idx);
        }
    }

    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(c, k)| k.then_some(c))
        .collect()
}

impl FaceDetector for TractFaceBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &GrayFrame) -> Result<Vec<FaceRegion>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.extract_faces(outputs, frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = GrayFrame::filled(self.width, self.height, 0);
        self.detect(&blank).map(|_| ())
    }
}
