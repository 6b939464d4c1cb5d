//! The capture & analysis loop.
//!
//! One persistent task: capture a frame, score motion locally, send the
//! frame to the classifier, turn the returned tags into violation
//! candidates, then sleep the fixed delay. The delay is measured from cycle
//! completion, so a slow classifier slows the loop down instead of building
//! a backlog, and awaiting our own request is the single-flight discipline —
//! a second analyze can never be issued while one is outstanding.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

use crate::api::{AnalyzeRequest, ProctorApi};
use crate::config::MonitorConfig;
use crate::dispatcher::ViolationDispatcher;
use crate::media::{CameraSource, FrameStore};
use crate::motion::MotionScorer;
use crate::session::SessionHandle;
use crate::types::ViolationType;

pub(crate) struct AnalysisContext {
    pub session: SessionHandle,
    pub camera: Arc<dyn CameraSource>,
    pub frames: Arc<FrameStore>,
    pub api: Arc<dyn ProctorApi>,
    pub dispatcher: Arc<ViolationDispatcher>,
    pub config: MonitorConfig,
}

pub(crate) async fn analysis_loop(ctx: AnalysisContext, cancel: CancellationToken) {
    let mut scorer = MotionScorer::new();
    let delay = ctx.config.analyze_interval();

    loop {
        if ctx.session.is_stopped() {
            break;
        }

        // Transient failures (no frame, network error, non-2xx) never stop
        // the loop; they are logged and the next cycle is scheduled.
        if let Err(err) = run_cycle(&ctx, &mut scorer).await {
            log_warn!("analyze cycle failed: {err:#}");
            ctx.session.set_status(format!("Analyze failed: {err}"));
        }

        if ctx.session.is_stopped() {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => break,
        }
    }

    log_info!("analysis loop shutting down");
}

async fn run_cycle(ctx: &AnalysisContext, scorer: &mut MotionScorer) -> Result<()> {
    let frame = ctx.camera.grab_frame().context("camera frame unavailable")?;

    let movement = scorer.score_frame(&frame).context("motion scoring failed")?;
    let still = frame
        .encode_jpeg(ctx.config.jpeg_quality)
        .context("frame encode failed")?;
    ctx.frames.set_camera(still.clone());

    ctx.session.with(|s| {
        s.movement_score = movement;
        s.analyzing = true;
    });

    let request = AnalyzeRequest {
        image: still.to_data_url(),
        enable_phone: ctx.config.enable_phone_detection,
    };
    let result = ctx.api.analyze(request).await;
    ctx.session.with(|s| s.analyzing = false);
    let response = result.context("analyze request failed")?;

    let face_present = !response.violations.contains(&ViolationType::NoFace);
    let phone_seen = response.violations.contains(&ViolationType::PhoneDetected);

    // Success: publish the liveness timestamp the watchdog observes, and
    // advance or reset the consecutive phone-detection streak.
    let streak = ctx.session.with(|s| {
        s.last_analysis_at = Instant::now();
        s.suspicion_score = response.score;
        s.face_present = face_present;
        if phone_seen {
            s.phone_streak += 1;
        } else {
            s.phone_streak = 0;
        }
        s.phone_streak
    });

    ctx.session.set_status(format!(
        "Analyze OK: face={face_present} | motion={movement:.1} | suspicion={:.2}",
        response.score
    ));
    log_debug!(
        "analyze ok: {} tag(s), motion {movement:.1}, phone streak {streak}",
        response.violations.len()
    );

    for kind in response.violations {
        // Require the configured run of consecutive phone detections before
        // forwarding, to absorb single-frame misclassifications. All other
        // tags are forwarded unconditionally.
        if kind == ViolationType::PhoneDetected && streak < ctx.config.phone_streak_min {
            continue;
        }
        ctx.dispatcher
            .report_with_evidence(kind, Some(still.clone()));
    }

    Ok(())
}
