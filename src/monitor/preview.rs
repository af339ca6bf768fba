use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use image::ImageFormat;

use crate::frame::Frame;

/// Where annotated frames are shown.
pub trait Preview {
    fn render(&mut self, frame: &Frame, tick: u64) -> Result<()>;
}

/// Discards every frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPreview;

impl Preview for NoPreview {
    fn render(&mut self, _frame: &Frame, _tick: u64) -> Result<()> {
        Ok(())
    }
}

/// Overwrites a JPEG snapshot every `every_n_ticks` ticks, starting at
/// tick 1. The file is written beside its target and renamed into place so
/// viewers never read a half-written image.
#[derive(Clone, Debug)]
pub struct JpegPreview {
    path: PathBuf,
    every_n_ticks: u64,
    written: u64,
}

impl JpegPreview {
    pub fn new(path: impl Into<PathBuf>, every_n_ticks: u64) -> Self {
        Self {
            path: path.into(),
            every_n_ticks: every_n_ticks.max(1),
            written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl Preview for JpegPreview {
    fn render(&mut self, frame: &Frame, tick: u64) -> Result<()> {
        if tick.saturating_sub(1) % self.every_n_ticks != 0 {
            return Ok(());
        }
        let staging = self.path.with_extension("partial");
        frame
            .to_image()?
            .save_with_format(&staging, ImageFormat::Jpeg)
            .with_context(|| format!("writing preview {}", staging.display()))?;
        std::fs::rename(&staging, &self.path)
            .with_context(|| format!("replacing preview {}", self.path.display()))?;
        self.written += 1;
        Ok(())
    }
}

/// Latest annotated frame, handed from the loop thread to a display.
///
/// Only the newest frame is kept; a display that falls behind skips
/// frames rather than queueing them.
#[derive(Debug, Default)]
pub struct LiveFeed {
    latest: Mutex<Option<(Frame, u64)>>,
    finished: AtomicBool,
}

impl LiveFeed {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Take the newest frame and its tick, if one arrived since the last call.
    pub fn take_latest(&self) -> Option<(Frame, u64)> {
        self.latest.lock().ok()?.take()
    }

    /// Set once the publishing preview is dropped, i.e. the session is over.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    fn publish(&self, frame: &Frame, tick: u64) -> Result<()> {
        let mut slot = self
            .latest
            .lock()
            .map_err(|_| anyhow::anyhow!("live feed lock poisoned"))?;
        *slot = Some((frame.clone(), tick));
        Ok(())
    }
}

/// Publishes every rendered frame to a `LiveFeed`.
#[derive(Debug)]
pub struct FeedPreview {
    feed: Arc<LiveFeed>,
}

impl FeedPreview {
    pub fn new(feed: Arc<LiveFeed>) -> Self {
        Self { feed }
    }
}

impl Preview for FeedPreview {
    fn render(&mut self, frame: &Frame, tick: u64) -> Result<()> {
        self.feed.publish(frame, tick)
    }
}

impl Drop for FeedPreview {
    fn drop(&mut self) {
        self.feed.finish();
    }
}

/// Renders to each preview in turn. A failure in one does not skip the
/// rest; the first error is returned.
pub struct Previews(pub Vec<Box<dyn Preview>>);

impl Preview for Previews {
    fn render(&mut self, frame: &Frame, tick: u64) -> Result<()> {
        let mut first_err = None;
        for preview in &mut self.0 {
            if let Err(e) = preview.render(frame, tick) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_on_schedule() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("preview.jpg");
        let mut preview = JpegPreview::new(&path, 3);
        let frame = Frame::filled(16, 16, [10, 200, 30]);

        for tick in 1..=7 {
            preview.render(&frame, tick)?;
        }
        // ticks 1, 4, 7
        assert_eq!(preview.written(), 3);

        let decoded = image::open(&path)?.to_rgb8();
        assert_eq!(decoded.dimensions(), (16, 16));
        assert!(!path.with_extension("partial").exists());
        Ok(())
    }

    #[test]
    fn missing_directory_is_an_error() {
        let mut preview = JpegPreview::new("/nonexistent/watchpost/preview.jpg", 1);
        assert!(preview.render(&Frame::filled(4, 4, [0, 0, 0]), 1).is_err());
    }

    #[test]
    fn feed_keeps_only_the_newest_frame() -> Result<()> {
        let feed = LiveFeed::new();
        let mut preview = FeedPreview::new(feed.clone());
        assert!(feed.take_latest().is_none());

        preview.render(&Frame::filled(4, 4, [1, 1, 1]), 1)?;
        preview.render(&Frame::filled(4, 4, [2, 2, 2]), 2)?;
        let (frame, tick) = feed.take_latest().expect("published frame");
        assert_eq!(tick, 2);
        assert_eq!(frame.pixel(0, 0), Some([2, 2, 2]));
        assert!(feed.take_latest().is_none());
        Ok(())
    }

    #[test]
    fn dropping_the_preview_finishes_the_feed() {
        let feed = LiveFeed::new();
        let preview = FeedPreview::new(feed.clone());
        assert!(!feed.is_finished());
        drop(preview);
        assert!(feed.is_finished());
    }

    #[test]
    fn every_preview_renders_even_after_a_failure() -> Result<()> {
        let feed = LiveFeed::new();
        let mut previews = Previews(vec![
            Box::new(JpegPreview::new("/nonexistent/watchpost/preview.jpg", 1)),
            Box::new(FeedPreview::new(feed.clone())),
        ]);
        assert!(previews.render(&Frame::filled(4, 4, [0, 0, 0]), 1).is_err());
        assert!(feed.take_latest().is_some());
        Ok(())
    }
}
