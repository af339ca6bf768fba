//! Per-tick event classification.
//!
//! Turns the motion and face results of one tick into discrete events.
//! Face and motion are independent; either, both or neither may fire.
//! Absence never produces an event.

use std::fmt;

use chrono::{DateTime, Local};

use crate::auth::Identity;
use crate::detect::{FaceRegion, MotionRegion, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    MotionDetected,
    FaceDetected,
}

impl EventKind {
    /// The label written to the structured log.
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::MotionDetected => "Motion Detected",
            EventKind::FaceDetected => "Face Detected",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub timestamp: DateTime<Local>,
    pub identity: Identity,
    pub kind: EventKind,
    /// Face events carry the first face; motion events the largest blob.
    pub region: Option<Rect>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EventClassifier;

impl EventClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Events for one tick, face before motion, all stamped with `at`.
    ///
    /// The face event uses `faces[0]` as the detector returned it.
    pub fn classify(
        &self,
        identity: &Identity,
        motion: &[MotionRegion],
        faces: &[FaceRegion],
        at: DateTime<Local>,
    ) -> Vec<Event> {
        let mut events = Vec::with_capacity(2);

        if let Some(first) = faces.first() {
            events.push(Event {
                timestamp: at,
                identity: identity.clone(),
                kind: EventKind::FaceDetected,
                region: Some(first.rect),
            });
        }

        if !motion.is_empty() {
            let largest = motion.iter().max_by_key(|r| r.area).map(|r| r.rect);
            events.push(Event {
                timestamp: at,
                identity: identity.clone(),
                kind: EventKind::MotionDetected,
                region: largest,
            });
        }

        events
    }
}
