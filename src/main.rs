//! Soak harness: runs the full monitor pipeline against a real backend with
//! a synthetic noise camera, so the loop/dispatcher/watchdog behaviour can
//! be observed end to end without platform capture code.
//!
//! Point it at a backend with `base_url` in the config file (default
//! `examwatch.json`, overridable via `EXAMWATCH_CONFIG`) and watch the logs.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;

use examwatch::{
    CameraFrame, CameraSource, ExamSubmitter, HttpProctorApi, MonitorConfig, MonitorController,
    MonitorDeps, WindowControl,
};

/// Produces random-noise frames; enough to exercise encoding, motion
/// scoring, and the analyze round-trip.
struct SyntheticCamera {
    width: u32,
    height: u32,
}

impl CameraSource for SyntheticCamera {
    fn grab_frame(&self) -> Result<CameraFrame> {
        let mut rng = rand::thread_rng();
        let mut rgb = vec![0u8; (self.width * self.height * 3) as usize];
        rng.fill(rgb.as_mut_slice());
        Ok(CameraFrame::new(self.width, self.height, rgb))
    }
}

/// Headless stand-in for the exam window: grants fullscreen on first ask.
#[derive(Default)]
struct HeadlessWindow {
    fullscreen: AtomicBool,
}

impl WindowControl for HeadlessWindow {
    fn is_fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::Relaxed)
    }

    fn request_fullscreen(&self) -> Result<()> {
        self.fullscreen.store(true, Ordering::Relaxed);
        Ok(())
    }
}

struct LoggingSubmitter;

#[async_trait]
impl ExamSubmitter for LoggingSubmitter {
    async fn submit_exam(&self) {
        log::error!("forced exam submission triggered");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config_path = std::env::var("EXAMWATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("examwatch.json"));
    let config = MonitorConfig::load(&config_path)?;
    log::info!("soak harness targeting {}", config.base_url);

    let api = Arc::new(HttpProctorApi::new(config.base_url.clone())?);
    let mut monitor = MonitorController::start(
        config,
        MonitorDeps {
            api,
            camera: Some(Arc::new(SyntheticCamera {
                width: 320,
                height: 240,
            })),
            screen: None,
            window: Arc::new(HeadlessWindow::default()),
            submitter: Arc::new(LoggingSubmitter),
        },
    );

    let session = monitor.session().clone();
    let status_printer = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(5));
        loop {
            ticker.tick().await;
            if session.is_stopped() {
                break;
            }
            let snapshot = session.snapshot();
            log::info!(
                "status: {} | violations={} | pulse={:.2}",
                snapshot.status_line,
                snapshot.violation_total,
                snapshot.movement_pulse
            );
        }
    });

    tokio::signal::ctrl_c().await?;
    log::info!("shutting down");
    monitor.stop().await?;
    status_printer.abort();

    Ok(())
}
