//! Frame-to-frame movement scoring.
//!
//! Frames are downsampled to a small grayscale grid and compared against the
//! previous grid by mean absolute difference. The score is advisory: it
//! drives the movement pulse in the status readout and is never a violation
//! signal on its own.

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::media::CameraFrame;

const GRID_WIDTH: u32 = 64;
const GRID_HEIGHT: u32 = 48;

/// Full-scale reference for normalising the score into a 0..1 pulse.
pub const MOVEMENT_PULSE_MAX: f64 = 20.0;

/// Stateful scorer. Holds the previous downsampled frame; reset at monitor
/// start, no cross-session lifecycle.
pub struct MotionScorer {
    previous: Option<Vec<u8>>,
}

impl MotionScorer {
    pub fn new() -> Self {
        Self { previous: None }
    }

    /// Score the current frame against the previous one and store it for the
    /// next call. The first call always scores 0.
    pub fn score_frame(&mut self, frame: &CameraFrame) -> Result<f64> {
        let current = downsample_luma(frame)?;

        let score = match &self.previous {
            None => 0.0,
            Some(previous) => mean_abs_diff(previous, &current),
        };

        self.previous = Some(current);
        Ok(score)
    }
}

impl Default for MotionScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalise a raw movement score into a 0..1 intensity pulse.
pub fn movement_pulse(score: f64) -> f64 {
    (score / MOVEMENT_PULSE_MAX).min(1.0)
}

fn downsample_luma(frame: &CameraFrame) -> Result<Vec<u8>> {
    let image = RgbImage::from_raw(frame.width, frame.height, frame.rgb.clone())
        .context("frame buffer does not match its dimensions")?;
    let small = imageops::resize(&image, GRID_WIDTH, GRID_HEIGHT, FilterType::Triangle);

    let mut luma = Vec::with_capacity((GRID_WIDTH * GRID_HEIGHT) as usize);
    for pixel in small.pixels() {
        let [r, g, b] = pixel.0;
        // ITU-R BT.601 luma weights.
        let gray = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
        luma.push(gray as u8);
    }
    Ok(luma)
}

fn mean_abs_diff(previous: &[u8], current: &[u8]) -> f64 {
    debug_assert_eq!(previous.len(), current.len());
    let sum: u64 = previous
        .iter()
        .zip(current)
        .map(|(a, b)| u64::from(a.abs_diff(*b)))
        .sum();
    sum as f64 / current.len() as f64
}
