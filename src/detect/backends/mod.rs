pub mod stub;

#[cfg(feature = "face-tract")]
pub mod tract;

use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::detect::backend::FaceDetector;

pub use stub::{NoFaceBackend, ScriptedFaceBackend};

#[cfg(feature = "face-tract")]
pub use tract::TractFaceBackend;

/// Which face backend to build, and its model parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceSettings {
    /// `none` or `tract`.
    pub backend: String,
    pub model_path: Option<PathBuf>,
    pub confidence: f32,
    pub input_width: u32,
    pub input_height: u32,
}

impl Default for FaceSettings {
    fn default() -> Self {
        Self {
            backend: "none".to_string(),
            model_path: None,
            confidence: 0.7,
            input_width: 320,
            input_height: 240,
        }
    }
}

impl FaceSettings {
    /// Operator-facing note when no face backend will run.
    pub fn disabled_notice(&self) -> Option<&'static str> {
        (self.backend == "none").then_some(
            "Face detection is off (face.backend = \"none\"): only motion will be logged. \
             Build with --features face-tract and set face.backend = \"tract\" and \
             face.model_path to enable it.",
        )
    }
}

/// Build the configured face backend and run its warm-up hook.
pub fn build_face_detector(settings: &FaceSettings) -> Result<Box<dyn FaceDetector>> {
    let mut detector: Box<dyn FaceDetector> = match settings.backend.as_str() {
        "none" => Box::new(NoFaceBackend),
        "tract" => build_tract(settings)?,
        other => return Err(anyhow!("unknown face backend '{}'", other)),
    };
    detector.warm_up()?;
    log::info!("face backend: {}", detector.name());
    Ok(detector)
}

#[cfg(feature = "face-tract")]
fn build_tract(settings: &FaceSettings) -> Result<Box<dyn FaceDetector>> {
    let model_path = settings
        .model_path
        .as_ref()
        .ok_or_else(|| anyhow!("the tract face backend needs face.model_path"))?;
    let backend = TractFaceBackend::new(model_path, settings.input_width, settings.input_height)?
        .with_threshold(settings.confidence);
    Ok(Box::new(backend))
}

#[cfg(not(feature = "face-tract"))]
fn build_tract(_settings: &FaceSettings) -> Result<Box<dyn FaceDetector>> {
    Err(anyhow!("the tract face backend requires the face-tract feature"))
}
