//! Frame sources.
//!
//! This module provides different sources for frames:
//! - Synthetic scenes (`stub://<name>`) for demos and tests
//! - Directories of still images (`dir://<path>` or a plain path)
//! - USB/V4L2 cameras (`/dev/videoN`, feature: camera-v4l2)
//! - In-memory sequences (`SequenceSource`) for injecting frames
//!
//! All sources produce `Frame` instances in capture order. A source that
//! cannot deliver the next frame either returns `Ok(None)` (stream ended)
//! or an error (device failure); the monitor treats both as the end of the
//! session.

pub mod file;
pub mod normalize;
pub mod sequence;
pub mod synthetic;
#[cfg(feature = "camera-v4l2")]
pub mod v4l2;

use std::time::{Duration, Instant};

use anyhow::Result;

use crate::frame::Frame;

pub use file::ImageDirSource;
pub use normalize::PixelFormat;
pub use sequence::SequenceSource;
pub use synthetic::SyntheticSource;
#[cfg(feature = "camera-v4l2")]
pub use v4l2::V4l2Source;

/// A camera, or anything else that yields frames in order.
pub trait FrameSource {
    /// Open the underlying device or stream.
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame. `Ok(None)` means the stream has ended.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Check if the source is healthy.
    fn is_healthy(&self) -> bool;

    /// Get frame statistics.
    fn stats(&self) -> SourceStats;

    /// Release the device. Called once when the monitor stops.
    fn release(&mut self) {}
}

/// Statistics for a frame source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub origin: String,
}

/// Configuration for a frame source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceConfig {
    /// Source locator, e.g. "stub://front_door", "dir:///var/frames", "/dev/video0".
    pub url: String,
    /// Target frame rate. Synthetic and directory sources pace themselves to it;
    /// 0 means as fast as possible.
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "stub://camera".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// Pick a source implementation from the URL scheme.
pub fn open_source(config: SourceConfig) -> Result<Box<dyn FrameSource>> {
    if config.url.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(config)));
    }
    if config.url.starts_with("/dev/video") {
        #[cfg(feature = "camera-v4l2")]
        {
            return Ok(Box::new(V4l2Source::new(config)?));
        }
        #[cfg(not(feature = "camera-v4l2"))]
        {
            anyhow::bail!("camera capture requires the camera-v4l2 feature");
        }
    }
    Ok(Box::new(ImageDirSource::new(config)?))
}

/// Sleeps out the remainder of one frame interval.
pub(crate) struct FramePacer {
    interval: Option<Duration>,
    last: Option<Instant>,
}

impl FramePacer {
    pub(crate) fn new(target_fps: u32) -> Self {
        Self {
            interval: (target_fps > 0)
                .then(|| Duration::from_secs_f64(1.0 / target_fps as f64)),
            last: None,
        }
    }

    pub(crate) fn wait(&mut self) {
        if let (Some(interval), Some(last)) = (self.interval, self.last) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        self.last = Some(Instant::now());
    }
}
