//! Synthetic frame source (`stub://`).
//!
//! Simulates a static camera:
//! - A fixed background with low-amplitude sensor noise
//! - Periodically an "intruder" square crosses the scene
//!
//! Two names are reserved for exercising startup health checks:
//! `stub://black` yields black frames and `stub://offline` never connects.

use anyhow::{anyhow, Result};
use rand::Rng;

use super::{FramePacer, FrameSource, SourceConfig, SourceStats};
use crate::frame::Frame;

/// Frames per scene cycle.
const CYCLE_FRAMES: u64 = 120;
/// Frame within the cycle at which the intruder enters.
const INTRUDER_ENTERS_AT: u64 = 40;
const INTRUDER_SIZE: u32 = 48;
const INTRUDER_STEP: u32 = 6;
const NOISE_AMPLITUDE: i16 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scene {
    Normal,
    Black,
    Offline,
}

pub struct SyntheticSource {
    config: SourceConfig,
    scene: Scene,
    connected: bool,
    frame_count: u64,
    pacer: FramePacer,
}

impl SyntheticSource {
    pub fn new(config: SourceConfig) -> Self {
        let scene = match config.url.trim_start_matches("stub://") {
            "black" => Scene::Black,
            "offline" => Scene::Offline,
            _ => Scene::Normal,
        };
        Self {
            pacer: FramePacer::new(config.target_fps),
            config,
            scene,
            connected: false,
            frame_count: 0,
        }
    }

    fn generate(&self) -> Frame {
        let (w, h) = (self.config.width, self.config.height);
        if self.scene == Scene::Black {
            return Frame::filled(w, h, [0, 0, 0]);
        }

        let mut rng = rand::thread_rng();
        let mut pixels = Vec::with_capacity(w as usize * h as usize * 3);
        for y in 0..h {
            for x in 0..w {
                let base = 70 + (x * 40 / w.max(1)) as i16 + (y * 20 / h.max(1)) as i16;
                for channel_bias in [0i16, 5, -5] {
                    let noise = rng.gen_range(-NOISE_AMPLITUDE..=NOISE_AMPLITUDE);
                    pixels.push((base + channel_bias + noise).clamp(0, 255) as u8);
                }
            }
        }
        let mut frame = Frame::new(pixels, w, h).unwrap_or_else(|_| Frame::filled(w, h, [70, 75, 65]));

        if let Some((ix, iy)) = self.intruder_position() {
            for dy in 0..INTRUDER_SIZE {
                for dx in 0..INTRUDER_SIZE {
                    frame.put_pixel((ix + dx) as i64, (iy + dy) as i64, [230, 220, 200]);
                }
            }
        }
        frame
    }

    /// Top-left corner of the intruder for the current frame, if it is in view.
    fn intruder_position(&self) -> Option<(u32, u32)> {
        let phase = self.frame_count % CYCLE_FRAMES;
        if phase < INTRUDER_ENTERS_AT {
            return None;
        }
        let x = (phase - INTRUDER_ENTERS_AT) as u32 * INTRUDER_STEP;
        if x >= self.config.width {
            return None;
        }
        let y = self.config.height.saturating_sub(INTRUDER_SIZE) / 2;
        Some((x, y))
    }
}

impl FrameSource for SyntheticSource {
    /// Synthetic sources are always "connected", except `stub://offline`.
    fn connect(&mut self) -> Result<()> {
        if self.scene == Scene::Offline {
            return Err(anyhow!("{}: device not responding", self.config.url));
        }
        self.connected = true;
        log::info!("SyntheticSource: connected to {}", self.config.url);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.connected {
            return Err(anyhow!("{}: source not connected", self.config.url));
        }
        self.pacer.wait();
        self.frame_count += 1;
        Ok(Some(self.generate()))
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            origin: self.config.url.clone(),
        }
    }

    fn release(&mut self) {
        self.connected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> SourceConfig {
        SourceConfig {
            url: url.to_string(),
            target_fps: 0,
            width: 320,
            height: 240,
        }
    }

    #[test]
    fn produces_frames_of_configured_size() -> Result<()> {
        let mut source = SyntheticSource::new(config("stub://front"));
        source.connect()?;
        let frame = source.next_frame()?.expect("frame");
        assert_eq!((frame.width, frame.height), (320, 240));
        assert!(frame.to_gray().count_nonzero() > 0);
        assert_eq!(source.stats().frames_captured, 1);
        Ok(())
    }

    #[test]
    fn black_scene_is_degenerate() -> Result<()> {
        let mut source = SyntheticSource::new(config("stub://black"));
        source.connect()?;
        let frame = source.next_frame()?.expect("frame");
        assert_eq!(frame.to_gray().count_nonzero(), 0);
        Ok(())
    }

    #[test]
    fn offline_scene_fails_to_connect() {
        let mut source = SyntheticSource::new(config("stub://offline"));
        assert!(source.connect().is_err());
        assert!(source.next_frame().is_err());
        assert!(!source.is_healthy());
    }

    #[test]
    fn intruder_crosses_periodically() -> Result<()> {
        let mut source = SyntheticSource::new(config("stub://front"));
        source.connect()?;
        let mut seen = 0;
        for _ in 0..CYCLE_FRAMES {
            source.next_frame()?;
            if source.intruder_position().is_some() {
                seen += 1;
            }
        }
        assert!(seen > 0);
        assert!(seen < CYCLE_FRAMES);
        Ok(())
    }

    #[test]
    fn release_disconnects() -> Result<()> {
        let mut source = SyntheticSource::new(config("stub://front"));
        source.connect()?;
        source.release();
        assert!(!source.is_healthy());
        assert!(source.next_frame().is_err());
        Ok(())
    }
}
