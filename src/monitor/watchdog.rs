//! Heartbeat and liveness watchdog.
//!
//! The heartbeat tells the server the session is alive; its failures are
//! logged and never escalate. The watchdog watches the timestamp the
//! analysis loop publishes on every success; sustained staleness is the one
//! fatal condition and forces exam submission exactly once.

use std::sync::Arc;

use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_warn};

use crate::api::ProctorApi;
use crate::config::MonitorConfig;
use crate::media::ExamSubmitter;
use crate::session::SessionHandle;

pub(crate) async fn heartbeat_loop(
    session: SessionHandle,
    api: Arc<dyn ProctorApi>,
    config: MonitorConfig,
    cancel: CancellationToken,
) {
    let mut ticker = interval(config.heartbeat_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if session.is_stopped() {
                    break;
                }
                if let Err(err) = api.heartbeat().await {
                    log_warn!("heartbeat failed: {err}");
                }
            }
            _ = cancel.cancelled() => break,
        }
    }
}

pub(crate) async fn liveness_watchdog(
    session: SessionHandle,
    submitter: Arc<dyn ExamSubmitter>,
    config: MonitorConfig,
    cancel: CancellationToken,
) {
    let threshold = config.staleness_threshold();
    let mut ticker = interval(config.watchdog_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if session.is_stopped() {
                    break;
                }

                let stale_for = {
                    let last = session.with(|s| s.last_analysis_at);
                    Instant::now().duration_since(last)
                };

                if stale_for > threshold {
                    // One-way transition; only the call that flips the flag
                    // gets to submit.
                    if session.stop() {
                        session.set_status("Disconnected");
                        log_error!(
                            "no successful analysis for {}ms; forcing exam submission",
                            stale_for.as_millis()
                        );
                        submitter.submit_exam().await;
                    }
                    break;
                }
            }
            _ = cancel.cancelled() => break,
        }
    }
}
