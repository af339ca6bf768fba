//! The surveillance loop.
//!
//! A session moves `Starting -> Running -> Stopped`:
//! 1. Starting: connect the camera, read one frame and classify its health
//!    (recorded once in the text log and on the status page)
//! 2. Running: one tick per frame (acquire, detect motion and faces,
//!    classify, log, annotate, render, poll for cancellation)
//! 3. Stopped: release the camera and close the logs
//!
//! Ticks run strictly one after another on the caller's thread.

pub mod preview;
pub mod stop;
#[cfg(feature = "preview-window")]
pub mod window;

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Local};

use crate::annotate::annotate;
use crate::auth::Identity;
use crate::classify::{EventClassifier, EventKind};
use crate::detect::{FaceDetector, MotionDetector, MotionSettings};
use crate::error::Error;
use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::sink::{write_status_page, CameraHealth, EventSink};

pub use preview::{FeedPreview, JpegPreview, LiveFeed, NoPreview, Preview, Previews};
pub use stop::{install_ctrlc, spawn_key_watcher, StopToken};
#[cfg(feature = "preview-window")]
pub use window::{run_preview_window, PreviewWindow};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Starting,
    Running,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The stop token was set.
    Cancelled,
    /// The source reported end of stream.
    SourceEnded,
    /// A frame read failed.
    SourceFailed,
    /// `max_ticks` frames were processed.
    TickLimit,
    /// The startup health check failed and continuing was not allowed.
    UnhealthyStart,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::Cancelled => "cancelled",
            StopReason::SourceEnded => "source ended",
            StopReason::SourceFailed => "source failed",
            StopReason::TickLimit => "tick limit reached",
            StopReason::UnhealthyStart => "unhealthy start",
        };
        f.write_str(text)
    }
}

/// What a finished session did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionReport {
    pub identity: Identity,
    pub started_at: DateTime<Local>,
    pub health: CameraHealth,
    pub ticks: u64,
    pub motion_events: u64,
    pub face_events: u64,
    pub stop_reason: StopReason,
}

#[derive(Clone, Debug)]
pub struct MonitorSettings {
    pub motion: MotionSettings,
    /// Written once after the health check. `None` skips the page.
    pub status_page: Option<PathBuf>,
    /// Keep running after a black or failed first frame.
    pub continue_on_degenerate_start: bool,
    pub max_ticks: Option<u64>,
    /// How long each tick waits for a stop request after rendering.
    pub poll_interval: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            motion: MotionSettings::default(),
            status_page: None,
            continue_on_degenerate_start: true,
            max_ticks: None,
            poll_interval: Duration::from_millis(1),
        }
    }
}

/// The collaborators a monitor drives.
pub struct MonitorParts {
    pub source: Box<dyn FrameSource>,
    pub faces: Box<dyn FaceDetector>,
    pub sink: Box<dyn EventSink>,
    pub preview: Box<dyn Preview>,
}

/// Lives from login to the end of the loop. Whether it is running is
/// the monitor's `LoopState`.
#[derive(Debug)]
struct SessionState {
    identity: Identity,
    started_at: DateTime<Local>,
    health: Option<CameraHealth>,
    ticks: u64,
    motion_events: u64,
    face_events: u64,
    stop_reason: Option<StopReason>,
}

impl SessionState {
    fn new(identity: Identity) -> Self {
        Self {
            identity,
            started_at: Local::now(),
            health: None,
            ticks: 0,
            motion_events: 0,
            face_events: 0,
            stop_reason: None,
        }
    }

    fn finish(self) -> SessionReport {
        SessionReport {
            identity: self.identity,
            started_at: self.started_at,
            health: self.health.unwrap_or(CameraHealth::Failed),
            ticks: self.ticks,
            motion_events: self.motion_events,
            face_events: self.face_events,
            stop_reason: self.stop_reason.unwrap_or(StopReason::SourceEnded),
        }
    }
}

pub struct Monitor {
    settings: MonitorSettings,
    identity: Identity,
    parts: MonitorParts,
    motion: MotionDetector,
    classifier: EventClassifier,
    stop: StopToken,
    state: LoopState,
}

impl Monitor {
    pub fn new(
        settings: MonitorSettings,
        identity: Identity,
        parts: MonitorParts,
        stop: StopToken,
    ) -> Self {
        let motion = MotionDetector::new(settings.motion.clone());
        Self {
            settings,
            identity,
            parts,
            motion,
            classifier: EventClassifier::new(),
            stop,
            state: LoopState::Starting,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn source(&self) -> &dyn FrameSource {
        self.parts.source.as_ref()
    }

    pub fn motion(&self) -> &MotionDetector {
        &self.motion
    }

    /// Run one session to completion.
    ///
    /// The camera is released and the logs closed however the session
    /// ends. A log write failure aborts the session and is returned after
    /// that cleanup.
    pub fn run(&mut self) -> Result<SessionReport> {
        self.state = LoopState::Starting;
        let mut session = SessionState::new(self.identity.clone());
        let outcome = self.run_session(&mut session);

        self.state = LoopState::Stopped;
        self.parts.source.release();
        let closed = self.parts.sink.close();

        match (outcome, closed) {
            (Err(err), Err(close_err)) => {
                log::error!("closing logs after failure: {:#}", close_err);
                Err(err)
            }
            (Err(err), Ok(())) | (Ok(()), Err(err)) => Err(err),
            (Ok(()), Ok(())) => {
                let report = session.finish();
                log::info!(
                    "session ended ({}): {} ticks, {} motion events, {} face events",
                    report.stop_reason,
                    report.ticks,
                    report.motion_events,
                    report.face_events
                );
                Ok(report)
            }
        }
    }

    fn run_session(&mut self, session: &mut SessionState) -> Result<()> {
        let (health, first_frame) = check_camera_health(self.parts.source.as_mut());
        session.health = Some(health);
        self.record_health(health)?;

        if !health.is_ok() && !self.settings.continue_on_degenerate_start {
            log::warn!("camera unhealthy at start ({}); not starting detection", health);
            session.stop_reason = Some(StopReason::UnhealthyStart);
            return Ok(());
        }

        self.state = LoopState::Running;
        log::info!(
            "monitor running as {} since {}",
            session.identity,
            session.started_at.format("%H:%M:%S")
        );

        let mut pending = first_frame;
        let mut last_health_log = Instant::now();
        loop {
            if self
                .settings
                .max_ticks
                .is_some_and(|max| session.ticks >= max)
            {
                session.stop_reason = Some(StopReason::TickLimit);
                break;
            }

            let frame = match pending.take() {
                Some(frame) => frame,
                None => match self.parts.source.next_frame() {
                    Ok(Some(frame)) => frame,
                    Ok(None) => {
                        log::info!("frame source ended");
                        session.stop_reason = Some(StopReason::SourceEnded);
                        break;
                    }
                    Err(e) => {
                        let err = Error::FrameAcquisition {
                            reason: format!("{:#}", e),
                        };
                        log::warn!("{}", err);
                        session.stop_reason = Some(StopReason::SourceFailed);
                        break;
                    }
                },
            };

            session.ticks += 1;
            self.tick(frame, session)?;

            if self.stop.poll(self.settings.poll_interval) {
                session.stop_reason = Some(StopReason::Cancelled);
                break;
            }

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let stats = self.parts.source.stats();
                log::info!(
                    "source health={} frames={} origin={}",
                    self.parts.source.is_healthy(),
                    stats.frames_captured,
                    stats.origin
                );
                last_health_log = Instant::now();
            }
        }
        Ok(())
    }

    fn record_health(&mut self, health: CameraHealth) -> Result<()> {
        let at = Local::now();
        self.parts
            .sink
            .record_note(&at, &self.identity, health.message())?;
        if let Some(path) = &self.settings.status_page {
            if let Err(e) = write_status_page(path, &self.identity, health, &at) {
                log::warn!("status page not written: {}", e);
            }
        }
        Ok(())
    }

    fn tick(&mut self, mut frame: Frame, session: &mut SessionState) -> Result<()> {
        let gray = frame.to_gray();
        let motion = self.motion.detect_gray(&gray);
        let faces = match self.parts.faces.detect(&gray) {
            Ok(faces) => faces,
            Err(e) => {
                log::warn!("face backend {} failed: {:#}", self.parts.faces.name(), e);
                Vec::new()
            }
        };

        let events = self
            .classifier
            .classify(&self.identity, &motion, &faces, Local::now());
        for event in &events {
            self.parts.sink.record(event)?;
            match event.kind {
                EventKind::MotionDetected => session.motion_events += 1,
                EventKind::FaceDetected => session.face_events += 1,
            }
            log::debug!("tick {}: {}", session.ticks, event.kind);
        }

        annotate(&mut frame, &motion, &faces);
        if let Err(e) = self.parts.preview.render(&frame, session.ticks) {
            log::warn!("preview render failed: {:#}", e);
        }
        Ok(())
    }
}

/// Connect `source` and classify its first frame.
///
/// Never fails: a source that cannot connect or deliver a frame is
/// `Failed`, and a frame with no nonzero gray pixel is `BlackScreen`. The
/// frame is returned whenever one was read.
pub fn check_camera_health(source: &mut dyn FrameSource) -> (CameraHealth, Option<Frame>) {
    let frame = match first_frame(source) {
        Ok(frame) => frame,
        Err(err) => {
            log::warn!("{}", err);
            return (CameraHealth::Failed, None);
        }
    };
    if frame.to_gray().count_nonzero() == 0 {
        log::warn!(
            "{}",
            Error::DegenerateFrame {
                width: frame.width,
                height: frame.height,
            }
        );
        return (CameraHealth::BlackScreen, Some(frame));
    }
    (CameraHealth::Working, Some(frame))
}

fn first_frame(source: &mut dyn FrameSource) -> std::result::Result<Frame, Error> {
    source.connect().map_err(|e| Error::CameraInit {
        reason: format!("{:#}", e),
    })?;
    match source.next_frame() {
        Ok(Some(frame)) => Ok(frame),
        Ok(None) => Err(Error::CameraInit {
            reason: "no frame available".to_string(),
        }),
        Err(e) => Err(Error::CameraInit {
            reason: format!("{:#}", e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Event;
    use crate::detect::{FaceRegion, NoFaceBackend, Rect, ScriptedFaceBackend};
    use crate::ingest::SequenceSource;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorded {
        events: Arc<Mutex<Vec<Event>>>,
        notes: Arc<Mutex<Vec<String>>>,
        closed: Arc<Mutex<bool>>,
    }

    impl EventSink for Recorded {
        fn record(&mut self, event: &Event) -> Result<()> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }

        fn record_note(
            &mut self,
            _at: &DateTime<Local>,
            _identity: &Identity,
            message: &str,
        ) -> Result<()> {
            self.notes.lock().unwrap().push(message.to_string());
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    fn gray_frame(level: u8) -> Frame {
        Frame::filled(160, 120, [level, level, level])
    }

    fn monitor(frames: Vec<Frame>, faces: Box<dyn FaceDetector>, sink: Recorded) -> Monitor {
        Monitor::new(
            MonitorSettings::default(),
            Identity::new("admin"),
            MonitorParts {
                source: Box::new(SequenceSource::new(frames)),
                faces,
                sink: Box::new(sink),
                preview: Box::new(NoPreview),
            },
            StopToken::new(),
        )
    }

    #[test]
    fn startup_frame_is_the_first_tick() -> Result<()> {
        let sink = Recorded::default();
        let mut monitor = monitor(vec![gray_frame(90); 4], Box::new(NoFaceBackend), sink.clone());
        let report = monitor.run()?;

        assert_eq!(report.ticks, 4);
        assert_eq!(report.health, CameraHealth::Working);
        assert_eq!(report.stop_reason, StopReason::SourceEnded);
        assert_eq!(monitor.state(), LoopState::Stopped);
        assert!(!monitor.source().is_healthy());
        assert!(*sink.closed.lock().unwrap());
        assert_eq!(
            sink.notes.lock().unwrap().as_slice(),
            ["Camera is working normally."]
        );
        Ok(())
    }

    #[test]
    fn face_backend_errors_count_as_no_faces() -> Result<()> {
        struct Broken;
        impl FaceDetector for Broken {
            fn name(&self) -> &'static str {
                "broken"
            }
            fn detect(&mut self, _frame: &crate::frame::GrayFrame) -> Result<Vec<FaceRegion>> {
                Err(anyhow::anyhow!("model exploded"))
            }
        }

        let sink = Recorded::default();
        let report = monitor(vec![gray_frame(90); 2], Box::new(Broken), sink.clone()).run()?;
        assert_eq!(report.ticks, 2);
        assert!(sink.events.lock().unwrap().is_empty());
        Ok(())
    }

    #[test]
    fn faces_are_reported_every_tick() -> Result<()> {
        let sink = Recorded::default();
        let faces = ScriptedFaceBackend::always(vec![FaceRegion::new(Rect::new(1, 2, 30, 30))]);
        let report = monitor(vec![gray_frame(90); 3], Box::new(faces), sink.clone()).run()?;
        assert_eq!(report.face_events, 3);
        assert_eq!(report.motion_events, 0);
        Ok(())
    }

    #[test]
    fn black_start_can_refuse_to_run() -> Result<()> {
        let sink = Recorded::default();
        let mut monitor = Monitor::new(
            MonitorSettings {
                continue_on_degenerate_start: false,
                ..MonitorSettings::default()
            },
            Identity::new("admin"),
            MonitorParts {
                source: Box::new(SequenceSource::new(vec![gray_frame(0); 3])),
                faces: Box::new(NoFaceBackend),
                sink: Box::new(sink.clone()),
                preview: Box::new(NoPreview),
            },
            StopToken::new(),
        );
        let report = monitor.run()?;
        assert_eq!(report.health, CameraHealth::BlackScreen);
        assert_eq!(report.stop_reason, StopReason::UnhealthyStart);
        assert_eq!(report.ticks, 0);
        assert_eq!(
            sink.notes.lock().unwrap().as_slice(),
            ["Black screen detected!"]
        );
        Ok(())
    }

    #[test]
    fn health_check_classifies_sources() {
        let mut ok = SequenceSource::new(vec![gray_frame(40)]);
        assert_eq!(check_camera_health(&mut ok).0, CameraHealth::Working);

        let mut black = SequenceSource::new(vec![gray_frame(0)]);
        let (health, frame) = check_camera_health(&mut black);
        assert_eq!(health, CameraHealth::BlackScreen);
        assert!(frame.is_some());

        let mut empty = SequenceSource::new(Vec::new());
        assert_eq!(check_camera_health(&mut empty).0, CameraHealth::Failed);

        let mut unplugged = SequenceSource::new(vec![gray_frame(40)]).unplugged();
        let (health, frame) = check_camera_health(&mut unplugged);
        assert_eq!(health, CameraHealth::Failed);
        assert!(frame.is_none());
    }
}
