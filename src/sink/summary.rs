use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use super::structured::parse_csv_line;

/// Event counts read back from a structured log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventTally {
    pub motion: usize,
    pub face: usize,
}

/// Count events in CSV text by the `Event` column. The header and rows
/// with fewer than three fields are skipped.
pub fn tally_rows(contents: &str) -> EventTally {
    let mut tally = EventTally::default();
    for line in contents.lines().skip(1) {
        let fields = parse_csv_line(line);
        let Some(event) = fields.get(2) else {
            continue;
        };
        if event.contains("Motion Detected") {
            tally.motion += 1;
        }
        if event.contains("Face") {
            tally.face += 1;
        }
    }
    tally
}

pub fn tally_file(path: &Path) -> Result<EventTally> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading event log {}", path.display()))?;
    Ok(tally_rows(&contents))
}

pub fn render_bar_chart(tally: &EventTally) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Detection Events Bar Chart");
    let _ = writeln!(out, "============================");
    let _ = writeln!(
        out,
        "Motion Detected: {} ({})",
        "#".repeat(tally.motion),
        tally.motion
    );
    let _ = writeln!(
        out,
        "Face Detected:   {} ({})",
        "#".repeat(tally.face),
        tally.face
    );
    out
}
