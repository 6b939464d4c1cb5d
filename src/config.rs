//! Monitor configuration: cadences, thresholds, and the per-type cooldown
//! table. Loaded from a JSON file when present, with serde defaults matching
//! the shipped behaviour.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::ViolationType;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Base URL of the proctoring backend, e.g. `http://127.0.0.1:5000`.
    pub base_url: String,
    pub analyze_interval_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub watchdog_interval_ms: u64,
    /// The watchdog force-stops the session once this much time passes with
    /// no successful analysis.
    pub staleness_threshold_ms: u64,
    pub fullscreen_retry_delay_ms: u64,
    pub fullscreen_reconcile_interval_ms: u64,
    pub screen_sample_interval_ms: u64,
    /// Consecutive phone detections required before `phone_detected` is
    /// forwarded. 1 forwards every detection; raising it trades latency for
    /// fewer single-frame false positives.
    pub phone_streak_min: u32,
    pub enable_phone_detection: bool,
    pub jpeg_quality: u8,
    /// Minimum re-report interval per violation tag. Unlisted tags have no
    /// cooldown.
    pub cooldowns_ms: HashMap<String, u64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            analyze_interval_ms: 450,
            heartbeat_interval_ms: 10_000,
            watchdog_interval_ms: 2_000,
            staleness_threshold_ms: 15_000,
            fullscreen_retry_delay_ms: 150,
            fullscreen_reconcile_interval_ms: 2_000,
            screen_sample_interval_ms: 1_000,
            phone_streak_min: 1,
            enable_phone_detection: true,
            jpeg_quality: 70,
            cooldowns_ms: default_cooldowns(),
        }
    }
}

fn default_cooldowns() -> HashMap<String, u64> {
    HashMap::from([
        ("phone_detected".to_string(), 1_000),
        ("audio_noise".to_string(), 10_000),
        ("gaze_left".to_string(), 4_000),
        ("gaze_right".to_string(), 4_000),
    ])
}

impl MonitorConfig {
    /// Load from a JSON file. A missing file yields defaults; a corrupt file
    /// also falls back to defaults rather than blocking the exam.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        Ok(serde_json::from_str(&contents).unwrap_or_default())
    }

    pub fn cooldown_for(&self, kind: &ViolationType) -> Duration {
        Duration::from_millis(
            self.cooldowns_ms
                .get(kind.as_tag())
                .copied()
                .unwrap_or(0),
        )
    }

    pub fn analyze_interval(&self) -> Duration {
        Duration::from_millis(self.analyze_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }

    pub fn staleness_threshold(&self) -> Duration {
        Duration::from_millis(self.staleness_threshold_ms)
    }

    pub fn fullscreen_retry_delay(&self) -> Duration {
        Duration::from_millis(self.fullscreen_retry_delay_ms)
    }

    pub fn fullscreen_reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.fullscreen_reconcile_interval_ms)
    }

    pub fn screen_sample_interval(&self) -> Duration {
        Duration::from_millis(self.screen_sample_interval_ms)
    }
}
