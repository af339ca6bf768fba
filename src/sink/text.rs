use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::format_timestamp;
use crate::auth::Identity;
use crate::error::Error;

/// Append-only plain-text log, one `[timestamp] identity: message` line per
/// entry. Every line is flushed as it is written.
pub struct TextLog {
    path: PathBuf,
    file: Option<File>,
}

impl TextLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::sink(&path, e))?;
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_line(
        &mut self,
        at: &DateTime<Local>,
        identity: &Identity,
        message: &str,
    ) -> Result<(), Error> {
        let file = self.file.as_mut().ok_or_else(|| {
            Error::sink(
                &self.path,
                std::io::Error::new(std::io::ErrorKind::Other, "log already closed"),
            )
        })?;
        let line = format!("[{}] {}: {}\n", format_timestamp(at), identity, message);
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| Error::sink(&self.path, e))
    }

    /// Flush and drop the handle. Later writes fail.
    pub fn close(&mut self) -> Result<(), Error> {
        if let Some(mut file) = self.file.take() {
            file.flush().map_err(|e| Error::sink(&self.path, e))?;
            file.sync_all().map_err(|e| Error::sink(&self.path, e))?;
        }
        Ok(())
    }
}
