use std::collections::VecDeque;

use anyhow::{anyhow, Result};

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

/// In-memory frame source. Yields the given frames once, in order.
///
/// An optional failure point makes the source error out instead of ending
/// cleanly, to mimic a camera dropping out mid-session.
#[derive(Debug, Default)]
pub struct SequenceSource {
    frames: VecDeque<Frame>,
    fail_after: Option<u64>,
    fail_connect: bool,
    frame_count: u64,
    connected: bool,
    released: bool,
}

impl SequenceSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
            ..Self::default()
        }
    }

    /// Error on the read following the `count`-th frame.
    pub fn failing_after(mut self, count: u64) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Refuse to connect.
    pub fn unplugged(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn was_released(&self) -> bool {
        self.released
    }
}

impl FrameSource for SequenceSource {
    fn connect(&mut self) -> Result<()> {
        if self.fail_connect {
            return Err(anyhow!("sequence source unplugged"));
        }
        self.connected = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.connected {
            return Err(anyhow!("sequence source not connected"));
        }
        if self.fail_after.is_some_and(|n| self.frame_count >= n) {
            return Err(anyhow!(
                "sequence source failed after {} frames",
                self.frame_count
            ));
        }
        let frame = self.frames.pop_front();
        if frame.is_some() {
            self.frame_count += 1;
        }
        Ok(frame)
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            origin: "sequence".to_string(),
        }
    }

    fn release(&mut self) {
        self.connected = false;
        self.released = true;
    }
}
