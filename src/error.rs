use std::path::PathBuf;

/// Failure classes of a surveillance session.
///
/// Most code returns `anyhow::Result`; these variants travel inside it so
/// callers can tell failure classes apart with `downcast_ref`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Credential mismatch at login. Recovered by reprompting.
    #[error("invalid username or password for '{username}'")]
    Auth { username: String },

    /// The camera could not produce a first frame.
    #[error("camera failed to initialize: {reason}")]
    CameraInit { reason: String },

    /// The first frame has no nonzero pixel after grayscale conversion.
    #[error("camera produced a black {width}x{height} frame")]
    DegenerateFrame { width: u32, height: u32 },

    /// A frame read failed mid-session. Ends the loop, not the process.
    #[error("frame acquisition failed: {reason}")]
    FrameAcquisition { reason: String },

    /// An audit log append failed. Fatal to the session.
    #[error("failed to write {}: {source}", path.display())]
    Sink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn sink(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Sink {
            path: path.into(),
            source,
        }
    }
}
