//! Image directory frame source.
//!
//! Replays a directory of still images (JPEG or PNG) as a camera, in file
//! name order. Useful for reproducing an incident from exported stills.
//! The source MUST NOT fetch remote URLs.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::{FramePacer, FrameSource, SourceConfig, SourceStats};
use crate::frame::Frame;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next_index: usize,
    frame_count: u64,
    connected: bool,
    last_error: Option<String>,
    pacer: FramePacer,
}

impl ImageDirSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        let dir = local_dir(&config.url)?;
        Ok(Self {
            dir,
            files: Vec::new(),
            next_index: 0,
            frame_count: 0,
            connected: false,
            last_error: None,
            pacer: FramePacer::new(config.target_fps),
        })
    }

    pub fn remaining(&self) -> usize {
        self.files.len().saturating_sub(self.next_index)
    }
}

impl FrameSource for ImageDirSource {
    fn connect(&mut self) -> Result<()> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)
            .with_context(|| format!("open frame directory {}", self.dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image(path))
            .collect();
        files.sort();
        if files.is_empty() {
            return Err(anyhow!("no images found in {}", self.dir.display()));
        }
        log::info!(
            "ImageDirSource: connected to {} ({} frames)",
            self.dir.display(),
            files.len()
        );
        self.files = files;
        self.next_index = 0;
        self.connected = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.connected {
            return Err(anyhow!("{}: source not connected", self.dir.display()));
        }
        let Some(path) = self.files.get(self.next_index) else {
            return Ok(None);
        };
        self.pacer.wait();
        let image = image::open(path).map_err(|e| {
            self.last_error = Some(e.to_string());
            anyhow!("decode {}: {}", path.display(), e)
        })?;
        self.next_index += 1;
        self.frame_count += 1;
        Ok(Some(Frame::from_image(image.to_rgb8())))
    }

    fn is_healthy(&self) -> bool {
        self.connected && self.last_error.is_none()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            origin: self.dir.display().to_string(),
        }
    }

    fn release(&mut self) {
        self.connected = false;
    }
}

fn local_dir(url: &str) -> Result<PathBuf> {
    let path = url.strip_prefix("dir://").unwrap_or(url);
    if path.trim().is_empty() {
        return Err(anyhow!("frame directory path is empty"));
    }
    if path.contains("://") {
        return Err(anyhow!(
            "unsupported source '{}': only stub://, dir:// and local paths are accepted",
            url
        ));
    }
    Ok(PathBuf::from(path))
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
