//! Environment integrity monitors: fullscreen, visibility, and focus.
//!
//! The embedding surface pushes [`EnvironmentEvent`]s into a channel; the
//! pump turns them into violation candidates. Evidence is captured at event
//! time rather than at dispatch time, since screen state may have changed by
//! then. Two periodic companions run alongside the pump: a fullscreen
//! reconciler and a screen-still sampler.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

use crate::config::MonitorConfig;
use crate::dispatcher::ViolationDispatcher;
use crate::media::{FrameStore, JpegImage, ScreenSource, WindowControl};
use crate::session::SessionHandle;
use crate::types::ViolationType;

/// Raw environment transitions, delivered by the embedding surface in
/// occurrence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentEvent {
    FullscreenChanged { fullscreen: bool },
    VisibilityChanged { hidden: bool },
    FocusChanged { focused: bool },
    /// A user click/keypress; fullscreen requests are retried on gestures
    /// because platform policy may refuse them otherwise.
    UserGesture,
}

pub(crate) struct EnvironmentContext {
    pub session: SessionHandle,
    pub dispatcher: Arc<ViolationDispatcher>,
    pub window: Arc<dyn WindowControl>,
    pub screen: Option<Arc<dyn ScreenSource>>,
    pub frames: Arc<FrameStore>,
    pub config: MonitorConfig,
}

pub(crate) async fn environment_loop(
    ctx: EnvironmentContext,
    mut events: mpsc::UnboundedReceiver<EnvironmentEvent>,
    cancel: CancellationToken,
) {
    // Initial attempt on load; refusal is retried on gestures and by the
    // reconciler.
    attempt_fullscreen(&ctx.session, &ctx.window);

    loop {
        tokio::select! {
            maybe = events.recv() => {
                match maybe {
                    Some(event) => handle_event(&ctx, event),
                    None => break,
                }
            }
            _ = cancel.cancelled() => break,
        }
    }

    log_info!("environment pump shutting down");
}

fn handle_event(ctx: &EnvironmentContext, event: EnvironmentEvent) {
    if ctx.session.is_stopped() {
        return;
    }

    match event {
        EnvironmentEvent::FullscreenChanged { fullscreen: true } => {
            ctx.session.with(|s| s.fullscreen_ever_entered = true);
        }
        EnvironmentEvent::FullscreenChanged { fullscreen: false } => {
            // Only an exit after a successful entry counts; a request that
            // was never granted must not read as an exit.
            let entered = ctx.session.with(|s| s.fullscreen_ever_entered);
            if !entered {
                log_debug!("fullscreen lost before ever entered; ignoring");
                return;
            }

            ctx.dispatcher
                .report_with_evidence(ViolationType::FullscreenExit, screen_hint(ctx));

            let session = ctx.session.clone();
            let window = Arc::clone(&ctx.window);
            let delay = ctx.config.fullscreen_retry_delay();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                attempt_fullscreen(&session, &window);
            });
        }
        EnvironmentEvent::VisibilityChanged { hidden: true } => {
            ctx.dispatcher
                .report_with_evidence(ViolationType::TabHidden, screen_hint(ctx));
        }
        EnvironmentEvent::VisibilityChanged { hidden: false } => {}
        EnvironmentEvent::FocusChanged { focused: false } => {
            ctx.dispatcher
                .report_with_evidence(ViolationType::WindowBlur, screen_hint(ctx));
        }
        EnvironmentEvent::FocusChanged { focused: true } => {}
        EnvironmentEvent::UserGesture => {
            if !ctx.window.is_fullscreen() {
                attempt_fullscreen(&ctx.session, &ctx.window);
            }
        }
    }
}

/// Evidence for environment violations: the latest sampled screen still,
/// then a live screen grab, then nothing (the dispatcher falls back to the
/// camera cache).
fn screen_hint(ctx: &EnvironmentContext) -> Option<JpegImage> {
    if let Some(still) = ctx.frames.latest_screen() {
        return Some(still);
    }
    let screen = ctx.screen.as_ref()?;
    if !screen.is_active() {
        return None;
    }
    screen.grab_still().ok()
}

fn attempt_fullscreen(session: &SessionHandle, window: &Arc<dyn WindowControl>) {
    if session.is_stopped() {
        return;
    }
    if let Err(err) = window.request_fullscreen() {
        // Refusal outside a user gesture is platform policy, not a
        // violation; the next gesture or reconciler tick retries.
        log_debug!("fullscreen request refused: {err}");
    }
}

/// Re-attempts fullscreen entry on a fixed cadence whenever the session is
/// active and not currently fullscreen, independent of events.
pub(crate) async fn fullscreen_reconciler(
    session: SessionHandle,
    window: Arc<dyn WindowControl>,
    config: MonitorConfig,
    cancel: CancellationToken,
) {
    let mut ticker = interval(config.fullscreen_reconcile_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if session.is_stopped() {
                    break;
                }
                if !window.is_fullscreen() {
                    attempt_fullscreen(&session, &window);
                }
            }
            _ = cancel.cancelled() => break,
        }
    }
}

/// Keeps the screen-still cache fresh while the screen stream is active, so
/// environment evidence is a recent frame rather than a blocking capture at
/// dispatch time.
pub(crate) async fn screen_sampler(
    session: SessionHandle,
    screen: Arc<dyn ScreenSource>,
    frames: Arc<FrameStore>,
    config: MonitorConfig,
    cancel: CancellationToken,
) {
    let mut ticker = interval(config.screen_sample_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if session.is_stopped() {
                    break;
                }
                if screen.is_active() {
                    match screen.grab_still() {
                        Ok(still) => frames.set_screen(still),
                        Err(err) => log_warn!("screen sample failed: {err}"),
                    }
                } else {
                    frames.clear_screen();
                }
            }
            _ = cancel.cancelled() => break,
        }
    }
}
