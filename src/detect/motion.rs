//! Frame-differencing motion detector.
//!
//! Each tick the grayscale frame is smoothed, differenced against the
//! previous tick's smoothed frame, thresholded, dilated, and split into
//! connected blobs. Blobs smaller than `min_area` are noise.
//!
//! The reference slides: it is replaced by the current smoothed frame on
//! every tick, motion or not. A continuously moving object keeps
//! triggering; a body creeping slower than the threshold per frame does
//! not.

use crate::detect::contours::external_components;
use crate::detect::filters::{abs_diff, dilate, gaussian_blur, gaussian_kernel_1d, threshold};
use crate::detect::region::MotionRegion;
use crate::frame::{Frame, GrayFrame};

pub const DEFAULT_BLUR_KERNEL: usize = 21;
pub const DEFAULT_DIFF_THRESHOLD: u8 = 25;
pub const DEFAULT_DILATE_ITERATIONS: u32 = 2;
pub const DEFAULT_MIN_AREA: u32 = 500;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MotionSettings {
    /// Gaussian kernel size, odd.
    pub blur_kernel: usize,
    /// Intensity difference that counts as change.
    pub diff_threshold: u8,
    pub dilate_iterations: u32,
    /// Blobs with fewer changed pixels are discarded.
    pub min_area: u32,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            blur_kernel: DEFAULT_BLUR_KERNEL,
            diff_threshold: DEFAULT_DIFF_THRESHOLD,
            dilate_iterations: DEFAULT_DILATE_ITERATIONS,
            min_area: DEFAULT_MIN_AREA,
        }
    }
}

pub struct MotionDetector {
    settings: MotionSettings,
    kernel: Vec<f32>,
    reference: Option<GrayFrame>,
}

impl MotionDetector {
    pub fn new(settings: MotionSettings) -> Self {
        let kernel = gaussian_kernel_1d(settings.blur_kernel.max(1) | 1);
        Self {
            settings,
            kernel,
            reference: None,
        }
    }

    pub fn settings(&self) -> &MotionSettings {
        &self.settings
    }

    /// The smoothed grayscale of the last frame seen, if any.
    pub fn reference(&self) -> Option<&GrayFrame> {
        self.reference.as_ref()
    }

    pub fn smooth(&self, gray: &GrayFrame) -> GrayFrame {
        gaussian_blur(gray, &self.kernel)
    }

    pub fn detect(&mut self, frame: &Frame) -> Vec<MotionRegion> {
        self.detect_gray(&frame.to_gray())
    }

    /// Motion regions for this tick. Always replaces the reference.
    ///
    /// The first frame, and any frame whose size differs from the
    /// reference, only seeds the reference and yields no regions.
    pub fn detect_gray(&mut self, gray: &GrayFrame) -> Vec<MotionRegion> {
        let smoothed = self.smooth(gray);

        let regions = match self.reference.as_ref() {
            None => Vec::new(),
            Some(reference) if !reference.same_dimensions(&smoothed) => {
                log::warn!(
                    "frame size changed from {}x{} to {}x{}; reseeding motion reference",
                    reference.width,
                    reference.height,
                    smoothed.width,
                    smoothed.height
                );
                Vec::new()
            }
            Some(reference) => self.regions_between(reference, &smoothed),
        };

        self.reference = Some(smoothed);
        regions
    }

    fn regions_between(&self, reference: &GrayFrame, current: &GrayFrame) -> Vec<MotionRegion> {
        let diff = match abs_diff(reference, current) {
            Ok(diff) => diff,
            Err(e) => {
                log::warn!("motion differencing skipped: {}", e);
                return Vec::new();
            }
        };
        let mask = dilate(
            &threshold(&diff, self.settings.diff_threshold),
            self.settings.dilate_iterations,
        );

        external_components(&mask)
            .into_iter()
            .filter(|c| c.area >= self.settings.min_area)
            .map(|c| MotionRegion {
                rect: c.bounds,
                area: c.area,
            })
            .collect()
    }

    /// Forget the reference; the next frame reseeds it.
    pub fn reset(&mut self) {
        self.reference = None;
    }
}

impl Default for MotionDetector {
    fn default() -> Self {
        Self::new(MotionSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank() -> Frame {
        Frame::filled(160, 120, [0, 0, 0])
    }

    fn with_square(x: u32, y: u32, size: u32, rgb: [u8; 3]) -> Frame {
        let mut frame = blank();
        for dy in 0..size {
            for dx in 0..size {
                frame.put_pixel((x + dx) as i64, (y + dy) as i64, rgb);
            }
        }
        frame
    }

    #[test]
    fn first_frame_only_seeds_reference() {
        let mut detector = MotionDetector::default();
        assert!(detector.reference().is_none());
        let regions = detector.detect(&with_square(40, 40, 50, [255, 255, 255]));
        assert!(regions.is_empty());
        assert!(detector.reference().is_some());
    }

    #[test]
    fn identical_frames_produce_no_regions() {
        let mut detector = MotionDetector::default();
        for _ in 0..5 {
            assert!(detector.detect(&blank()).is_empty());
        }
    }

    #[test]
    fn bright_square_is_motion() {
        let mut detector = MotionDetector::default();
        detector.detect(&blank());
        let regions = detector.detect(&with_square(50, 30, 50, [255, 255, 255]));
        assert_eq!(regions.len(), 1);
        let region = regions[0];
        assert!(region.area >= 500);
        assert!(region.rect.x <= 50 && region.rect.right() >= 100);
        assert!(region.rect.y <= 30 && region.rect.bottom() >= 80);
    }

    #[test]
    fn speck_below_min_area_is_noise() {
        let mut detector = MotionDetector::default();
        detector.detect(&blank());
        let regions = detector.detect(&with_square(70, 50, 3, [255, 255, 255]));
        assert!(regions.is_empty());
    }

    #[test]
    fn faint_change_stays_below_threshold() {
        let mut detector = MotionDetector::default();
        detector.detect(&blank());
        let regions = detector.detect(&with_square(30, 30, 60, [20, 20, 20]));
        assert!(regions.is_empty());
    }

    #[test]
    fn reference_tracks_last_frame_regardless_of_history() {
        let mut detector = MotionDetector::default();
        detector.detect(&with_square(10, 10, 40, [255, 0, 0]));
        detector.detect(&blank());
        let last = with_square(90, 60, 30, [0, 255, 0]);
        detector.detect(&last);

        let expected = detector.smooth(&last.to_gray());
        assert_eq!(detector.reference(), Some(&expected));
    }

    #[test]
    fn sliding_reference_flattens_a_static_change() {
        let mut detector = MotionDetector::default();
        let changed = with_square(50, 30, 50, [255, 255, 255]);
        detector.detect(&blank());
        assert_eq!(detector.detect(&changed).len(), 1);
        assert!(detector.detect(&changed).is_empty());
    }

    #[test]
    fn size_change_reseeds() {
        let mut detector = MotionDetector::default();
        detector.detect(&blank());
        let bigger = Frame::filled(200, 150, [255, 255, 255]);
        assert!(detector.detect(&bigger).is_empty());
        assert_eq!(detector.reference().map(|r| r.width), Some(200));
    }
}
