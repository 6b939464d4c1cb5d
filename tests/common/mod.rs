//! Shared mock collaborators for the monitor flow tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::time::Instant;

use examwatch::{
    AnalyzeRequest, AnalyzeResponse, ApiError, CameraFrame, CameraSource, ExamSubmitter,
    JpegImage, ProctorApi, ScreenSource, ViolationReport, ViolationType, WindowControl,
};

/// What the mock classifier does on each analyze call.
#[derive(Clone)]
pub enum AnalyzeBehavior {
    /// Respond immediately with these tags.
    Tags(Vec<ViolationType>),
    /// Respond with a non-success HTTP status.
    HttpError(u16),
    /// Take this long, then respond with no tags.
    Slow(Duration),
}

pub struct MockApi {
    behavior: Mutex<AnalyzeBehavior>,
    pub analyze_calls: AtomicU64,
    pub heartbeats: AtomicU64,
    violations: Mutex<Vec<ViolationReport>>,
    violation_times: Mutex<Vec<Instant>>,
    in_flight: AtomicU64,
    pub max_in_flight: AtomicU64,
}

impl MockApi {
    pub fn new(behavior: AnalyzeBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(behavior),
            analyze_calls: AtomicU64::new(0),
            heartbeats: AtomicU64::new(0),
            violations: Mutex::new(Vec::new()),
            violation_times: Mutex::new(Vec::new()),
            in_flight: AtomicU64::new(0),
            max_in_flight: AtomicU64::new(0),
        })
    }

    pub fn set_behavior(&self, behavior: AnalyzeBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn violations(&self) -> Vec<ViolationReport> {
        self.violations.lock().unwrap().clone()
    }

    pub fn violations_of(&self, kind: &ViolationType) -> Vec<ViolationReport> {
        self.violations()
            .into_iter()
            .filter(|report| &report.kind == kind)
            .collect()
    }

    /// Arrival instants of accepted reports of one type, in order.
    pub fn times_of(&self, kind: &ViolationType) -> Vec<Instant> {
        let reports = self.violations.lock().unwrap();
        let times = self.violation_times.lock().unwrap();
        reports
            .iter()
            .zip(times.iter())
            .filter(|(report, _)| &report.kind == kind)
            .map(|(_, at)| *at)
            .collect()
    }
}

#[async_trait]
impl ProctorApi for MockApi {
    async fn analyze(&self, _request: AnalyzeRequest) -> Result<AnalyzeResponse, ApiError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        let behavior = self.behavior.lock().unwrap().clone();
        let result = match behavior {
            AnalyzeBehavior::Tags(violations) => Ok(AnalyzeResponse {
                violations,
                score: 0.0,
            }),
            AnalyzeBehavior::HttpError(status) => Err(ApiError::Status(status)),
            AnalyzeBehavior::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(AnalyzeResponse {
                    violations: Vec::new(),
                    score: 0.0,
                })
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn report_violation(&self, report: ViolationReport) -> Result<(), ApiError> {
        self.violations.lock().unwrap().push(report);
        self.violation_times.lock().unwrap().push(Instant::now());
        Ok(())
    }

    async fn heartbeat(&self) -> Result<(), ApiError> {
        self.heartbeats.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Camera producing the same small solid frame every grab.
pub struct SolidCamera;

impl CameraSource for SolidCamera {
    fn grab_frame(&self) -> Result<CameraFrame> {
        Ok(CameraFrame::new(16, 12, vec![96; 16 * 12 * 3]))
    }
}

/// Screen source that is either live or gone for the whole test.
pub struct MockScreen {
    active: AtomicBool,
}

impl MockScreen {
    pub fn new(active: bool) -> Arc<Self> {
        Arc::new(Self {
            active: AtomicBool::new(active),
        })
    }
}

impl ScreenSource for MockScreen {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn grab_still(&self) -> Result<JpegImage> {
        if !self.is_active() {
            return Err(anyhow!("screen stream ended"));
        }
        CameraFrame::new(16, 12, vec![200; 16 * 12 * 3]).encode_jpeg(70)
    }
}

/// Exam window mock. `grants` controls whether fullscreen requests succeed;
/// every request is counted either way.
pub struct MockWindow {
    grants: bool,
    fullscreen: AtomicBool,
    pub requests: AtomicU64,
}

impl MockWindow {
    pub fn new(grants: bool) -> Arc<Self> {
        Arc::new(Self {
            grants,
            fullscreen: AtomicBool::new(false),
            requests: AtomicU64::new(0),
        })
    }

}

impl WindowControl for MockWindow {
    fn is_fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::SeqCst)
    }

    fn request_fullscreen(&self) -> Result<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.grants {
            self.fullscreen.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            Err(anyhow!("fullscreen refused outside a user gesture"))
        }
    }
}

#[derive(Default)]
pub struct MockSubmitter {
    pub submissions: AtomicU64,
}

impl MockSubmitter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl ExamSubmitter for MockSubmitter {
    async fn submit_exam(&self) {
        self.submissions.fetch_add(1, Ordering::SeqCst);
    }
}
