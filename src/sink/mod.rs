//! Audit outputs: the plain-text log, the CSV event log, the status page
//! and the end-of-session summary.
//!
//! These are the operator-facing records of a session. Diagnostics go
//! through the `log` facade instead and never land here.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::auth::Identity;
use crate::classify::{Event, EventKind};

pub mod status;
pub mod structured;
pub mod summary;
pub mod text;

pub use status::{write_status_page, CameraHealth};
pub use structured::StructuredLog;
pub use summary::{render_bar_chart, tally_file, EventTally};
pub use text::TextLog;

pub const DEFAULT_TEXT_LOG: &str = "person_log.txt";
pub const DEFAULT_EVENT_LOG: &str = "event_log.csv";

pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Where the audit logs live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    pub dir: PathBuf,
    pub text_log: String,
    pub event_log: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            text_log: DEFAULT_TEXT_LOG.to_string(),
            event_log: DEFAULT_EVENT_LOG.to_string(),
        }
    }
}

impl LogSettings {
    pub fn text_log_path(&self) -> PathBuf {
        self.dir.join(&self.text_log)
    }

    pub fn event_log_path(&self) -> PathBuf {
        self.dir.join(&self.event_log)
    }
}

/// Destination for classified events and free-form session notes.
///
/// Errors returned here end the session.
pub trait EventSink {
    fn record(&mut self, event: &Event) -> Result<()>;

    fn record_note(
        &mut self,
        at: &DateTime<Local>,
        identity: &Identity,
        message: &str,
    ) -> Result<()>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// The text log plus the CSV log, dispatched per event kind.
pub struct EventLogs {
    text: TextLog,
    structured: StructuredLog,
}

impl EventLogs {
    pub fn open(settings: &LogSettings) -> Result<Self> {
        std::fs::create_dir_all(&settings.dir)
            .with_context(|| format!("creating log directory {}", settings.dir.display()))?;
        let text = TextLog::open(settings.text_log_path())?;
        let structured = StructuredLog::open(settings.event_log_path())?;
        log::debug!(
            "audit logs: {} and {}",
            text.path().display(),
            structured.path().display()
        );
        Ok(Self { text, structured })
    }
}

impl EventSink for EventLogs {
    fn record(&mut self, event: &Event) -> Result<()> {
        if event.kind == EventKind::FaceDetected {
            let message = match event.region {
                Some(rect) => format!("{} at {}", event.kind, rect),
                None => event.kind.to_string(),
            };
            self.text
                .write_line(&event.timestamp, &event.identity, &message)?;
        }
        self.structured
            .append(&event.timestamp, &event.identity, event.kind)?;
        Ok(())
    }

    fn record_note(
        &mut self,
        at: &DateTime<Local>,
        identity: &Identity,
        message: &str,
    ) -> Result<()> {
        self.text.write_line(at, identity, message)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.text.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Rect;

    fn event(kind: EventKind, region: Option<Rect>) -> Event {
        Event {
            timestamp: Local::now(),
            identity: Identity::new("admin"),
            kind,
            region,
        }
    }

    #[test]
    fn dispatch_follows_event_kind() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = LogSettings {
            dir: dir.path().join("logs"),
            ..LogSettings::default()
        };

        let mut logs = EventLogs::open(&settings)?;
        logs.record(&event(EventKind::MotionDetected, Some(Rect::new(0, 0, 30, 30))))?;
        logs.record(&event(EventKind::FaceDetected, Some(Rect::new(5, 6, 7, 8))))?;
        logs.close()?;

        let text = std::fs::read_to_string(settings.text_log_path())?;
        assert_eq!(text.lines().count(), 1);
        assert!(text.trim_end().ends_with("admin: Face Detected at [5 6 7 8]"));

        let csv = std::fs::read_to_string(settings.event_log_path())?;
        let rows: Vec<_> = csv.lines().skip(1).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].ends_with("Motion Detected"));
        assert!(rows[1].ends_with("Face Detected"));
        Ok(())
    }

    #[test]
    fn notes_go_to_text_log_only() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = LogSettings {
            dir: dir.path().to_path_buf(),
            ..LogSettings::default()
        };
        let mut logs = EventLogs::open(&settings)?;
        logs.record_note(&Local::now(), &Identity::new("admin"), "Black screen detected!")?;
        logs.close()?;

        assert!(std::fs::read_to_string(settings.text_log_path())?
            .contains("admin: Black screen detected!"));
        assert_eq!(
            std::fs::read_to_string(settings.event_log_path())?,
            "Timestamp,Username,Event\r\n"
        );
        Ok(())
    }

    #[test]
    fn timestamp_format() {
        use chrono::TimeZone;
        let at = Local.with_ymd_and_hms(2023, 12, 31, 23, 59, 1).unwrap();
        assert_eq!(format_timestamp(&at), "2023-12-31 23:59:01");
    }
}
