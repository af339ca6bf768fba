use std::collections::VecDeque;

use anyhow::Result;

use crate::detect::backend::FaceDetector;
use crate::detect::region::FaceRegion;
use crate::frame::GrayFrame;

/// Backend for deployments without a face model. Never reports a face.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFaceBackend;

impl FaceDetector for NoFaceBackend {
    fn name(&self) -> &'static str {
        "none"
    }

    fn detect(&mut self, _frame: &GrayFrame) -> Result<Vec<FaceRegion>> {
        Ok(Vec::new())
    }
}

/// Replays a fixed script of per-frame results, one entry per `detect`
/// call. Once the script runs out it keeps returning `fallback`.
#[derive(Clone, Debug, Default)]
pub struct ScriptedFaceBackend {
    script: VecDeque<Vec<FaceRegion>>,
    fallback: Vec<FaceRegion>,
    calls: u64,
}

impl ScriptedFaceBackend {
    pub fn new(script: Vec<Vec<FaceRegion>>) -> Self {
        Self {
            script: script.into(),
            fallback: Vec::new(),
            calls: 0,
        }
    }

    /// Returns the same regions on every call.
    pub fn always(regions: Vec<FaceRegion>) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: regions,
            calls: 0,
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl FaceDetector for ScriptedFaceBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _frame: &GrayFrame) -> Result<Vec<FaceRegion>> {
        self.calls += 1;
        Ok(self
            .script
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::region::Rect;

    #[test]
    fn no_face_backend_is_always_empty() -> Result<()> {
        let mut backend = NoFaceBackend;
        assert!(backend.detect(&GrayFrame::filled(4, 4, 200))?.is_empty());
        Ok(())
    }

    #[test]
    fn scripted_backend_replays_then_falls_back() -> Result<()> {
        let face = FaceRegion::new(Rect::new(1, 2, 3, 4));
        let mut backend = ScriptedFaceBackend::new(vec![vec![], vec![face]]);
        let frame = GrayFrame::filled(4, 4, 0);

        assert!(backend.detect(&frame)?.is_empty());
        assert_eq!(backend.detect(&frame)?, vec![face]);
        assert!(backend.detect(&frame)?.is_empty());
        assert_eq!(backend.calls(), 3);
        Ok(())
    }

    #[test]
    fn always_backend_repeats() -> Result<()> {
        let face = FaceRegion::new(Rect::new(5, 5, 30, 30));
        let mut backend = ScriptedFaceBackend::always(vec![face]);
        let frame = GrayFrame::filled(4, 4, 0);
        for _ in 0..3 {
            assert_eq!(backend.detect(&frame)?, vec![face]);
        }
        Ok(())
    }
}
