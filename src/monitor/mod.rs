//! Monitor wiring: spawns the capture loop, environment monitors, heartbeat,
//! and watchdog over one shared session, and joins them on stop.

mod environment;
mod loop_worker;
mod watchdog;

pub use environment::EnvironmentEvent;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

use crate::api::ProctorApi;
use crate::config::MonitorConfig;
use crate::dispatcher::ViolationDispatcher;
use crate::media::{CameraSource, ExamSubmitter, FrameStore, ScreenSource, WindowControl};
use crate::session::{SessionHandle, SessionSnapshot};
use crate::types::ViolationType;

use environment::{environment_loop, fullscreen_reconciler, screen_sampler, EnvironmentContext};
use loop_worker::{analysis_loop, AnalysisContext};
use watchdog::{heartbeat_loop, liveness_watchdog};

/// External collaborators. `camera: None` means acquisition failed upstream:
/// the monitor reports it once and runs degraded (environment monitors and
/// heartbeat only).
pub struct MonitorDeps {
    pub api: Arc<dyn ProctorApi>,
    pub camera: Option<Arc<dyn CameraSource>>,
    pub screen: Option<Arc<dyn ScreenSource>>,
    pub window: Arc<dyn WindowControl>,
    pub submitter: Arc<dyn ExamSubmitter>,
}

pub struct MonitorController {
    session: SessionHandle,
    dispatcher: Arc<ViolationDispatcher>,
    events: mpsc::UnboundedSender<EnvironmentEvent>,
    handles: Vec<JoinHandle<()>>,
}

impl MonitorController {
    /// Start monitoring. Session state is created here; every background
    /// task shares it and stops on the same cancellation token.
    pub fn start(config: MonitorConfig, deps: MonitorDeps) -> Self {
        let cancel = CancellationToken::new();
        let session = SessionHandle::new(cancel.clone());
        let frames = Arc::new(FrameStore::new());

        let dispatcher = Arc::new(ViolationDispatcher::new(
            session.clone(),
            Arc::clone(&deps.api),
            Arc::clone(&frames),
            deps.camera.clone(),
            deps.screen.clone(),
            config.clone(),
        ));

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut handles = Vec::new();

        handles.push(tokio::spawn(environment_loop(
            EnvironmentContext {
                session: session.clone(),
                dispatcher: Arc::clone(&dispatcher),
                window: Arc::clone(&deps.window),
                screen: deps.screen.clone(),
                frames: Arc::clone(&frames),
                config: config.clone(),
            },
            event_rx,
            cancel.clone(),
        )));

        handles.push(tokio::spawn(fullscreen_reconciler(
            session.clone(),
            Arc::clone(&deps.window),
            config.clone(),
            cancel.clone(),
        )));

        handles.push(tokio::spawn(heartbeat_loop(
            session.clone(),
            Arc::clone(&deps.api),
            config.clone(),
            cancel.clone(),
        )));

        if let Some(screen) = deps.screen.clone() {
            handles.push(tokio::spawn(screen_sampler(
                session.clone(),
                screen,
                Arc::clone(&frames),
                config.clone(),
                cancel.clone(),
            )));
        }

        match deps.camera {
            Some(camera) => {
                handles.push(tokio::spawn(analysis_loop(
                    AnalysisContext {
                        session: session.clone(),
                        camera,
                        frames,
                        api: Arc::clone(&deps.api),
                        dispatcher: Arc::clone(&dispatcher),
                        config: config.clone(),
                    },
                    cancel.clone(),
                )));
                handles.push(tokio::spawn(liveness_watchdog(
                    session.clone(),
                    Arc::clone(&deps.submitter),
                    config,
                    cancel,
                )));
                session.set_status("Active");
                log_info!("monitoring started (attempt {})", session.snapshot().attempt_id);
            }
            None => {
                // Degraded mode: no frame pipeline, so no analysis loop and
                // no staleness watchdog over it. Environment monitors and
                // the heartbeat keep running.
                session.set_status("Permissions required");
                dispatcher.report(ViolationType::PermissionsBlocked);
                log_warn!("camera unavailable; monitoring degraded to environment events");
            }
        }

        Self {
            session,
            dispatcher,
            events: event_tx,
            handles,
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub fn dispatcher(&self) -> &Arc<ViolationDispatcher> {
        &self.dispatcher
    }

    /// Sender the embedding surface pushes environment transitions into.
    pub fn event_sender(&self) -> mpsc::UnboundedSender<EnvironmentEvent> {
        self.events.clone()
    }

    /// Stop monitoring and join every background task.
    pub async fn stop(&mut self) -> Result<()> {
        self.session.stop();
        for handle in self.handles.drain(..) {
            handle.await.context("monitor task failed to join")?;
        }
        Ok(())
    }
}
