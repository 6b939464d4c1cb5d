//! Client-side exam-integrity monitor core.
//!
//! Samples a candidate's webcam on a fixed cadence, sends frames to a remote
//! classifier, turns the returned tags plus environment transitions
//! (fullscreen exits, hidden tabs, lost focus) into deduplicated violation
//! reports with evidence snapshots, and force-submits the exam if the
//! analysis pipeline goes stale. All external surfaces — camera, screen,
//! window control, submission, and the HTTP endpoints — are traits, so the
//! whole pipeline runs under test with mock collaborators and paused time.

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod media;
pub mod monitor;
pub mod motion;
pub mod session;
pub mod types;
mod utils;

pub use api::{AnalyzeRequest, AnalyzeResponse, ApiError, HttpProctorApi, ProctorApi, ViolationReport};
pub use config::MonitorConfig;
pub use dispatcher::ViolationDispatcher;
pub use media::{
    CameraFrame, CameraSource, ExamSubmitter, FrameStore, JpegImage, ScreenSource, WindowControl,
};
pub use monitor::{EnvironmentEvent, MonitorController, MonitorDeps};
pub use motion::{movement_pulse, MotionScorer, MOVEMENT_PULSE_MAX};
pub use session::{SessionHandle, SessionSnapshot, SessionState};
pub use types::{ViolationCandidate, ViolationType};
