//! Per-attempt session state, shared by every component of the monitor.
//!
//! All counters, timestamps, and streaks live in one record behind one lock.
//! The `stopped` flag is the sole cancellation mechanism: it flips exactly
//! once, and every periodic task checks it before acting and before
//! rescheduling itself.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::types::ViolationType;

#[derive(Debug)]
pub struct SessionState {
    pub attempt_id: String,
    pub started_at: DateTime<Utc>,
    /// Terminal flag. Once true, producers and the dispatcher are no-ops.
    pub stopped: bool,
    pub violation_total: u64,
    /// Monotonic timestamp of the last successful analyze round-trip.
    /// Initialised to session start so the watchdog measures from there.
    pub last_analysis_at: Instant,
    pub fullscreen_ever_entered: bool,
    pub phone_streak: u32,
    pub movement_score: f64,
    pub suspicion_score: f64,
    pub analyzing: bool,
    pub face_present: bool,
    pub last_violation: Option<ViolationType>,
    pub status_line: String,
}

impl SessionState {
    fn new() -> Self {
        Self {
            attempt_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            stopped: false,
            violation_total: 0,
            last_analysis_at: Instant::now(),
            fullscreen_ever_entered: false,
            phone_streak: 0,
            movement_score: 0.0,
            suspicion_score: 0.0,
            analyzing: false,
            face_present: true,
            last_violation: None,
            status_line: "Starting...".to_string(),
        }
    }
}

/// Read-only view of the session for status readouts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub attempt_id: String,
    pub started_at: DateTime<Utc>,
    pub stopped: bool,
    pub violation_total: u64,
    pub fullscreen_ever_entered: bool,
    pub phone_streak: u32,
    pub movement_score: f64,
    pub movement_pulse: f64,
    pub suspicion_score: f64,
    pub analyzing: bool,
    pub face_present: bool,
    pub last_violation: Option<ViolationType>,
    pub status_line: String,
}

/// Cloneable handle to the shared session record plus its cancellation
/// token. Locks are never held across an await.
#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<Mutex<SessionState>>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            cancel,
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut guard = self.state.lock().unwrap();
        f(&mut guard)
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().unwrap().stopped
    }

    /// One-way terminal transition. Returns true only for the call that
    /// performed it, so exactly-once actions (forced submission) can hang off
    /// the return value. Also fires the cancellation token.
    pub fn stop(&self) -> bool {
        let first = {
            let mut guard = self.state.lock().unwrap();
            if guard.stopped {
                false
            } else {
                guard.stopped = true;
                true
            }
        };
        if first {
            self.cancel.cancel();
        }
        first
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn set_status(&self, status: impl Into<String>) {
        self.state.lock().unwrap().status_line = status.into();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let guard = self.state.lock().unwrap();
        SessionSnapshot {
            attempt_id: guard.attempt_id.clone(),
            started_at: guard.started_at,
            stopped: guard.stopped,
            violation_total: guard.violation_total,
            fullscreen_ever_entered: guard.fullscreen_ever_entered,
            phone_streak: guard.phone_streak,
            movement_score: guard.movement_score,
            movement_pulse: crate::motion::movement_pulse(guard.movement_score),
            suspicion_score: guard.suspicion_score,
            analyzing: guard.analyzing,
            face_present: guard.face_present,
            last_violation: guard.last_violation.clone(),
            status_line: guard.status_line.clone(),
        }
    }
}
