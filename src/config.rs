use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::{default_users, CredentialStore};
use crate::detect::motion::{
    DEFAULT_BLUR_KERNEL, DEFAULT_DIFF_THRESHOLD, DEFAULT_DILATE_ITERATIONS, DEFAULT_MIN_AREA,
};
use crate::detect::{FaceSettings, MotionSettings};
use crate::ingest::SourceConfig;
use crate::monitor::MonitorSettings;
use crate::sink::{LogSettings, DEFAULT_EVENT_LOG, DEFAULT_TEXT_LOG};

const DEFAULT_SOURCE_URL: &str = "stub://camera";
const DEFAULT_SOURCE_FPS: u32 = 10;
const DEFAULT_SOURCE_WIDTH: u32 = 640;
const DEFAULT_SOURCE_HEIGHT: u32 = 480;
const DEFAULT_LOG_DIR: &str = ".";
const DEFAULT_STATUS_PAGE: &str = "status.html";
const DEFAULT_PREVIEW_PATH: &str = "preview.jpg";
const DEFAULT_PREVIEW_EVERY: u64 = 10;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct MonitorConfigFile {
    source: Option<SourceConfigFile>,
    motion: Option<MotionConfigFile>,
    face: Option<FaceConfigFile>,
    logs: Option<LogsConfigFile>,
    status_page: Option<PathBuf>,
    preview: Option<PreviewConfigFile>,
    users: Option<BTreeMap<String, String>>,
    continue_on_degenerate_start: Option<bool>,
    max_ticks: Option<u64>,
    poll_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct MotionConfigFile {
    blur_kernel: Option<usize>,
    diff_threshold: Option<u32>,
    dilate_iterations: Option<u32>,
    min_area: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct FaceConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    confidence: Option<f32>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct LogsConfigFile {
    dir: Option<PathBuf>,
    text_log: Option<String>,
    event_log: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct PreviewConfigFile {
    path: Option<PathBuf>,
    every_n_ticks: Option<u64>,
    window: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub source: SourceConfig,
    pub motion: MotionSettings,
    pub face: FaceSettings,
    pub logs: LogSettings,
    pub status_page: PathBuf,
    pub preview: PreviewSettings,
    pub users: BTreeMap<String, String>,
    pub continue_on_degenerate_start: bool,
    pub max_ticks: Option<u64>,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewSettings {
    /// `None` disables the preview.
    pub path: Option<PathBuf>,
    pub every_n_ticks: u64,
    /// Show every annotated frame in a window (`preview-window` feature).
    pub window: bool,
}

impl MonitorConfig {
    /// Defaults, overlaid by the JSON file named in `WATCHPOST_CONFIG`,
    /// overlaid by individual `WATCHPOST_*` variables.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("WATCHPOST_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Like [`MonitorConfig::load`] with an explicit file instead of
    /// `WATCHPOST_CONFIG`.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MonitorConfigFile) -> Result<Self> {
        let source_file = file.source.unwrap_or_default();
        let source = SourceConfig {
            url: source_file
                .url
                .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
            target_fps: source_file.target_fps.unwrap_or(DEFAULT_SOURCE_FPS),
            width: source_file.width.unwrap_or(DEFAULT_SOURCE_WIDTH),
            height: source_file.height.unwrap_or(DEFAULT_SOURCE_HEIGHT),
        };

        let motion_file = file.motion.unwrap_or_default();
        let diff_threshold = match motion_file.diff_threshold {
            Some(value) => threshold_from(value)?,
            None => DEFAULT_DIFF_THRESHOLD,
        };
        let motion = MotionSettings {
            blur_kernel: motion_file.blur_kernel.unwrap_or(DEFAULT_BLUR_KERNEL),
            diff_threshold,
            dilate_iterations: motion_file
                .dilate_iterations
                .unwrap_or(DEFAULT_DILATE_ITERATIONS),
            min_area: motion_file.min_area.unwrap_or(DEFAULT_MIN_AREA),
        };

        let face_defaults = FaceSettings::default();
        let face_file = file.face.unwrap_or_default();
        let face = FaceSettings {
            backend: face_file.backend.unwrap_or(face_defaults.backend),
            model_path: face_file.model_path,
            confidence: face_file.confidence.unwrap_or(face_defaults.confidence),
            input_width: face_file.input_width.unwrap_or(face_defaults.input_width),
            input_height: face_file.input_height.unwrap_or(face_defaults.input_height),
        };

        let logs_file = file.logs.unwrap_or_default();
        let logs = LogSettings {
            dir: logs_file
                .dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            text_log: logs_file
                .text_log
                .unwrap_or_else(|| DEFAULT_TEXT_LOG.to_string()),
            event_log: logs_file
                .event_log
                .unwrap_or_else(|| DEFAULT_EVENT_LOG.to_string()),
        };

        let preview_file = file.preview.unwrap_or_default();
        let preview = PreviewSettings {
            path: Some(
                preview_file
                    .path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_PREVIEW_PATH)),
            ),
            every_n_ticks: preview_file.every_n_ticks.unwrap_or(DEFAULT_PREVIEW_EVERY),
            window: preview_file.window.unwrap_or(false),
        };

        Ok(Self {
            source,
            motion,
            face,
            logs,
            status_page: file
                .status_page
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATUS_PAGE)),
            preview,
            users: file.users.unwrap_or_else(default_users),
            continue_on_degenerate_start: file.continue_on_degenerate_start.unwrap_or(true),
            max_ticks: file.max_ticks,
            poll_interval: Duration::from_millis(
                file.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("WATCHPOST_SOURCE") {
            if !url.trim().is_empty() {
                self.source.url = url;
            }
        }
        if let Ok(dir) = std::env::var("WATCHPOST_LOG_DIR") {
            if !dir.trim().is_empty() {
                self.logs.dir = PathBuf::from(dir);
            }
        }
        if let Ok(page) = std::env::var("WATCHPOST_STATUS_PAGE") {
            if !page.trim().is_empty() {
                self.status_page = PathBuf::from(page);
            }
        }
        if let Ok(area) = std::env::var("WATCHPOST_MIN_AREA") {
            self.motion.min_area = area
                .trim()
                .parse()
                .map_err(|_| anyhow!("WATCHPOST_MIN_AREA must be a non-negative integer"))?;
        }
        if let Ok(threshold) = std::env::var("WATCHPOST_DIFF_THRESHOLD") {
            let value: u32 = threshold
                .trim()
                .parse()
                .map_err(|_| anyhow!("WATCHPOST_DIFF_THRESHOLD must be an integer"))?;
            self.motion.diff_threshold = threshold_from(value)?;
        }
        if let Ok(flag) = std::env::var("WATCHPOST_CONTINUE_ON_DEGENERATE") {
            self.continue_on_degenerate_start = parse_bool(&flag).ok_or_else(|| {
                anyhow!("WATCHPOST_CONTINUE_ON_DEGENERATE must be true/false, got '{}'", flag)
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.motion.blur_kernel == 0 || self.motion.blur_kernel % 2 == 0 {
            return Err(anyhow!(
                "motion.blur_kernel must be a positive odd number, got {}",
                self.motion.blur_kernel
            ));
        }
        if self.source.url.trim().is_empty() {
            return Err(anyhow!("source.url must not be empty"));
        }
        if self.users.is_empty() {
            return Err(anyhow!("users must contain at least one credential"));
        }
        if self.logs.text_log.trim().is_empty() || self.logs.event_log.trim().is_empty() {
            return Err(anyhow!("logs.text_log and logs.event_log must not be empty"));
        }
        if self.logs.text_log == self.logs.event_log {
            return Err(anyhow!("text and event logs must be different files"));
        }
        if self.status_page.as_os_str().is_empty() {
            return Err(anyhow!("status_page must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.face.confidence) {
            return Err(anyhow!(
                "face.confidence must be between 0 and 1, got {}",
                self.face.confidence
            ));
        }
        Ok(())
    }

    pub fn credentials(&self) -> CredentialStore {
        CredentialStore::new(self.users.clone())
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            motion: self.motion.clone(),
            status_page: Some(self.status_page.clone()),
            continue_on_degenerate_start: self.continue_on_degenerate_start,
            max_ticks: self.max_ticks,
            poll_interval: self.poll_interval,
        }
    }
}

fn threshold_from(value: u32) -> Result<u8> {
    u8::try_from(value)
        .map_err(|_| anyhow!("motion diff threshold must be at most 255, got {}", value))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn read_config_file(path: &Path) -> Result<MonitorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
