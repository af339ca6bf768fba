mod backend;
pub mod backends;
pub mod contours;
pub mod filters;
pub mod motion;
mod region;

pub use backend::FaceDetector;
pub use backends::{build_face_detector, FaceSettings, NoFaceBackend, ScriptedFaceBackend};
pub use motion::{MotionDetector, MotionSettings};
pub use region::{FaceRegion, MotionRegion, Rect};
