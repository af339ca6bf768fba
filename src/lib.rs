//! Watchpost: single-camera motion and face monitoring.
//!
//! A logged-in operator starts a session; every frame is compared with the
//! one before it for motion and handed to a face backend, and whatever is
//! found is written to an append-only text log and a CSV event log
//! attributed to that operator.
//!
//! # Module Structure
//!
//! - `frame`: RGB and grayscale frame buffers
//! - `ingest`: Frame sources (synthetic, image directories, V4L2 cameras)
//! - `detect`: Motion differencing and face backends
//! - `classify`: Per-tick event classification
//! - `sink`: Text log, CSV log, status page and summary chart
//! - `annotate`: Drawing results onto the preview frame
//! - `monitor`: The session loop and its cancellation token
//! - `auth`, `config`, `error`: Login, configuration, failure taxonomy

pub mod annotate;
pub mod auth;
pub mod classify;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod monitor;
pub mod sink;

pub use auth::{prompt_login, CredentialStore, Identity};
pub use classify::{Event, EventClassifier, EventKind};
pub use config::MonitorConfig;
pub use detect::{
    build_face_detector, FaceDetector, FaceRegion, FaceSettings, MotionDetector, MotionRegion,
    MotionSettings, Rect,
};
pub use error::Error;
pub use frame::{Frame, GrayFrame};
pub use ingest::{open_source, FrameSource, SequenceSource, SourceConfig};
pub use monitor::{
    check_camera_health, LoopState, Monitor, MonitorParts, MonitorSettings, SessionReport,
    StopReason, StopToken,
};
pub use sink::{CameraHealth, EventLogs, EventSink, LogSettings};
