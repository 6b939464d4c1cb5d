//! The violation dispatcher: single chokepoint between violation candidates
//! and the reporting endpoint.
//!
//! `report` runs to completion synchronously — cooldown check, counter
//! update, and evidence selection happen under the caller with no await, so
//! candidates arriving back-to-back are serialized by arrival order. Only
//! the final network emit is spawned fire-and-forget.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::time::Instant;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

use crate::api::{ProctorApi, ViolationReport};
use crate::config::MonitorConfig;
use crate::media::{CameraSource, FrameStore, JpegImage, ScreenSource};
use crate::session::SessionHandle;
use crate::types::{ViolationCandidate, ViolationType};

pub struct ViolationDispatcher {
    session: SessionHandle,
    api: Arc<dyn ProctorApi>,
    frames: Arc<FrameStore>,
    camera: Option<Arc<dyn CameraSource>>,
    screen: Option<Arc<dyn ScreenSource>>,
    config: MonitorConfig,
    last_accepted: Mutex<HashMap<ViolationType, Instant>>,
}

impl ViolationDispatcher {
    pub fn new(
        session: SessionHandle,
        api: Arc<dyn ProctorApi>,
        frames: Arc<FrameStore>,
        camera: Option<Arc<dyn CameraSource>>,
        screen: Option<Arc<dyn ScreenSource>>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            session,
            api,
            frames,
            camera,
            screen,
            config,
            last_accepted: Mutex::new(HashMap::new()),
        }
    }

    pub fn report(&self, kind: ViolationType) {
        self.dispatch(ViolationCandidate::new(kind));
    }

    pub fn report_with_evidence(&self, kind: ViolationType, evidence: Option<JpegImage>) {
        self.dispatch(ViolationCandidate {
            kind,
            evidence_hint: evidence,
        });
    }

    pub fn dispatch(&self, candidate: ViolationCandidate) {
        if self.session.is_stopped() {
            return;
        }

        let ViolationCandidate {
            kind,
            evidence_hint,
        } = candidate;

        if !self.pass_cooldown(&kind) {
            return;
        }

        let total = self.session.with(|s| {
            s.violation_total += 1;
            s.last_violation = Some(kind.clone());
            s.violation_total
        });
        log_info!("violation accepted: {kind} (total {total})");

        // Evidence must never block or fail the dispatch; a report with no
        // image is acceptable.
        let screenshot = if kind.is_severe() {
            evidence_hint.or_else(|| self.capture_evidence(&kind))
        } else {
            None
        };

        let api = Arc::clone(&self.api);
        let report = ViolationReport {
            kind: kind.clone(),
            screenshot: screenshot.map(|still| still.to_data_url()),
        };
        tokio::spawn(async move {
            if let Err(err) = api.report_violation(report).await {
                log_warn!("violation report for {kind} failed: {err}");
            }
        });
    }

    /// Cooldown gate. Checking the elapsed time and recording the acceptance
    /// happen under one lock, so rapid duplicate candidates cannot both pass.
    fn pass_cooldown(&self, kind: &ViolationType) -> bool {
        let cooldown = self.config.cooldown_for(kind);
        let now = Instant::now();
        let mut accepted = self.last_accepted.lock().unwrap();

        if let Some(last) = accepted.get(kind) {
            if now.duration_since(*last) < cooldown {
                return false;
            }
        }
        accepted.insert(kind.clone(), now);
        true
    }

    fn capture_evidence(&self, kind: &ViolationType) -> Option<JpegImage> {
        if kind.prefers_screen_evidence() {
            // What was on screen when the candidate was produced, falling
            // back to the camera if no screen stream is active.
            self.frames
                .latest_screen()
                .or_else(|| self.grab_screen_still())
                .or_else(|| self.frames.latest_camera())
        } else {
            self.frames
                .latest_camera()
                .or_else(|| self.grab_camera_still())
        }
    }

    fn grab_screen_still(&self) -> Option<JpegImage> {
        let screen = self.screen.as_ref()?;
        if !screen.is_active() {
            return None;
        }
        screen.grab_still().ok()
    }

    fn grab_camera_still(&self) -> Option<JpegImage> {
        let frame = self.camera.as_ref()?.grab_frame().ok()?;
        frame.encode_jpeg(self.config.jpeg_quality).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AnalyzeRequest, AnalyzeResponse, ApiResult};
    use crate::media::CameraFrame;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct RecordingApi {
        violations: Mutex<Vec<ViolationReport>>,
    }

    #[async_trait]
    impl ProctorApi for RecordingApi {
        async fn analyze(&self, _request: AnalyzeRequest) -> ApiResult<AnalyzeResponse> {
            Ok(AnalyzeResponse::default())
        }

        async fn report_violation(&self, report: ViolationReport) -> ApiResult<()> {
            self.violations.lock().unwrap().push(report);
            Ok(())
        }

        async fn heartbeat(&self) -> ApiResult<()> {
            Ok(())
        }
    }

    struct SolidCamera;

    impl CameraSource for SolidCamera {
        fn grab_frame(&self) -> anyhow::Result<CameraFrame> {
            Ok(CameraFrame::new(8, 8, vec![128; 8 * 8 * 3]))
        }
    }

    struct DeadScreen;

    impl ScreenSource for DeadScreen {
        fn is_active(&self) -> bool {
            false
        }

        fn grab_still(&self) -> anyhow::Result<JpegImage> {
            Err(anyhow!("screen stream ended"))
        }
    }

    struct Fixture {
        session: SessionHandle,
        api: Arc<RecordingApi>,
        dispatcher: ViolationDispatcher,
    }

    fn fixture(camera: Option<Arc<dyn CameraSource>>) -> Fixture {
        let session = SessionHandle::new(CancellationToken::new());
        let api = Arc::new(RecordingApi::default());
        let dispatcher = ViolationDispatcher::new(
            session.clone(),
            api.clone() as Arc<dyn ProctorApi>,
            Arc::new(FrameStore::new()),
            camera,
            Some(Arc::new(DeadScreen) as Arc<dyn ScreenSource>),
            MonitorConfig::default(),
        );
        Fixture {
            session,
            api,
            dispatcher,
        }
    }

    async fn drain_emits() {
        // Spawned emits run once the test task yields.
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    fn sent(api: &RecordingApi) -> Vec<ViolationReport> {
        api.violations.lock().unwrap().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_suppresses_rapid_duplicates() {
        let fx = fixture(None);

        fx.dispatcher.report(ViolationType::PhoneDetected);
        tokio::time::advance(Duration::from_millis(400)).await;
        fx.dispatcher.report(ViolationType::PhoneDetected);
        drain_emits().await;

        assert_eq!(sent(&fx.api).len(), 1);
        assert_eq!(fx.session.snapshot().violation_total, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reports_past_cooldown_both_count() {
        let fx = fixture(None);

        fx.dispatcher.report(ViolationType::PhoneDetected);
        tokio::time::advance(Duration::from_millis(1_000)).await;
        fx.dispatcher.report(ViolationType::PhoneDetected);
        drain_emits().await;

        assert_eq!(sent(&fx.api).len(), 2);
        assert_eq!(fx.session.snapshot().violation_total, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_cooldown_types_always_pass() {
        let fx = fixture(None);

        fx.dispatcher.report(ViolationType::TabHidden);
        fx.dispatcher.report(ViolationType::TabHidden);
        drain_emits().await;

        assert_eq!(sent(&fx.api).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldowns_are_tracked_per_type() {
        let fx = fixture(None);

        fx.dispatcher.report(ViolationType::GazeLeft);
        fx.dispatcher.report(ViolationType::GazeRight);
        drain_emits().await;

        assert_eq!(sent(&fx.api).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn severe_types_attach_evidence_from_hint() {
        let fx = fixture(None);
        let still = CameraFrame::new(8, 8, vec![20; 8 * 8 * 3])
            .encode_jpeg(70)
            .unwrap();

        fx.dispatcher
            .report_with_evidence(ViolationType::MultipleFaces, Some(still));
        drain_emits().await;

        let reports = sent(&fx.api);
        assert!(reports[0].screenshot.as_deref().unwrap().starts_with("data:image/jpeg"));
    }

    #[tokio::test(start_paused = true)]
    async fn non_severe_types_never_attach_evidence() {
        let fx = fixture(None);
        let still = CameraFrame::new(8, 8, vec![20; 8 * 8 * 3])
            .encode_jpeg(70)
            .unwrap();

        fx.dispatcher
            .report_with_evidence(ViolationType::GazeLeft, Some(still));
        drain_emits().await;

        assert!(sent(&fx.api)[0].screenshot.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn severe_types_fall_back_to_live_camera() {
        let fx = fixture(Some(Arc::new(SolidCamera)));

        fx.dispatcher.report(ViolationType::NoFace);
        drain_emits().await;

        assert!(sent(&fx.api)[0].screenshot.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_evidence_still_dispatches() {
        let fx = fixture(None);

        // Screen-preferring type, screen dead, no cached frames: report goes
        // out with no image.
        fx.dispatcher.report(ViolationType::WindowBlur);
        drain_emits().await;

        let reports = sent(&fx.api);
        assert_eq!(reports.len(), 1);
        assert!(reports[0].screenshot.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_session_ignores_candidates() {
        let fx = fixture(None);
        fx.session.stop();

        fx.dispatcher.report(ViolationType::TabHidden);
        drain_emits().await;

        assert!(sent(&fx.api).is_empty());
        assert_eq!(fx.session.snapshot().violation_total, 0);
    }
}
