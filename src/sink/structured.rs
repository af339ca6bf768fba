use std::borrow::Cow;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::format_timestamp;
use crate::auth::Identity;
use crate::classify::EventKind;
use crate::error::Error;

pub const HEADER: [&str; 3] = ["Timestamp", "Username", "Event"];

/// Append-only CSV event log.
///
/// The header is written only when the file is first created; reopening an
/// existing log never truncates it. Each row is a full open-append-close so
/// an abrupt exit loses at most the row being written.
pub struct StructuredLog {
    path: PathBuf,
}

impl StructuredLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(csv_row(&HEADER).as_bytes())
                    .and_then(|_| file.flush())
                    .map_err(|e| Error::sink(&path, e))?;
                log::info!("created event log {}", path.display());
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(Error::sink(&path, e)),
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(
        &self,
        at: &DateTime<Local>,
        identity: &Identity,
        kind: EventKind,
    ) -> Result<(), Error> {
        let timestamp = format_timestamp(at);
        let row = csv_row(&[timestamp.as_str(), identity.as_str(), kind.label()]);
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::sink(&self.path, e))?;
        file.write_all(row.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| Error::sink(&self.path, e))
    }
}

fn csv_row(fields: &[&str]) -> String {
    let mut row = fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",");
    row.push_str("\r\n");
    row
}

fn csv_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Split one CSV record into fields, honouring double-quote escaping.
pub(crate) fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches(['\r', '\n']).chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if current.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
