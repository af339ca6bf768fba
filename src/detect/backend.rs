use anyhow::Result;

use crate::detect::region::FaceRegion;
use crate::frame::GrayFrame;

/// Face detection capability.
///
/// The model behind a backend is a black box. Backends return regions in
/// their own native order; callers that need "the" face take the first
/// element and never re-sort.
pub trait FaceDetector {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Face rectangles found in a grayscale frame, in pixel coordinates of
    /// that frame.
    fn detect(&mut self, frame: &GrayFrame) -> Result<Vec<FaceRegion>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
