//! Frames, encoded stills, and the traits the monitor drives its media
//! collaborators through. Real camera/screen acquisition happens outside the
//! core (the permissions pre-flight hands us working sources, or it doesn't).

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

/// A raw camera frame: tightly packed RGB8, row-major.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl CameraFrame {
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Self {
        Self { width, height, rgb }
    }

    pub fn encode_jpeg(&self, quality: u8) -> Result<JpegImage> {
        let image = RgbImage::from_raw(self.width, self.height, self.rgb.clone())
            .context("frame buffer does not match its dimensions")?;

        let mut bytes = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
        encoder
            .encode_image(&image)
            .context("jpeg encode failed")?;

        Ok(JpegImage::new(bytes))
    }
}

/// An encoded JPEG still. Cheap to clone; the bytes are shared.
#[derive(Debug, Clone)]
pub struct JpegImage {
    bytes: Arc<Vec<u8>>,
}

impl JpegImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Arc::new(bytes),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Data-URL form, which is what the reporting backend decodes.
    pub fn to_data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", BASE64.encode(self.bytes.as_slice()))
    }
}

/// Live webcam. `grab_frame` must be quick and non-blocking; an `Err` means
/// media is currently unavailable and the caller skips the cycle.
pub trait CameraSource: Send + Sync {
    fn grab_frame(&self) -> Result<CameraFrame>;
}

/// Shared-screen capture. May go inactive mid-session (the user can revoke
/// sharing); `grab_still` on an inactive source is expected to fail.
pub trait ScreenSource: Send + Sync {
    fn is_active(&self) -> bool;
    fn grab_still(&self) -> Result<JpegImage>;
}

/// Fullscreen state of the exam window. `request_fullscreen` may be refused
/// by platform policy outside a user gesture; refusal is not a violation and
/// is simply retried later.
pub trait WindowControl: Send + Sync {
    fn is_fullscreen(&self) -> bool;
    fn request_fullscreen(&self) -> Result<()>;
}

/// External exam-submission action, invoked exactly once if the liveness
/// watchdog trips.
#[async_trait]
pub trait ExamSubmitter: Send + Sync {
    async fn submit_exam(&self);
}

#[derive(Default)]
struct FrameCaches {
    camera: Option<JpegImage>,
    screen: Option<JpegImage>,
}

/// Most-recent-still cache shared between the capture loop, the screen
/// sampler, and evidence selection. Writers overwrite; readers clone.
#[derive(Default)]
pub struct FrameStore {
    inner: Mutex<FrameCaches>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_camera(&self, still: JpegImage) {
        self.inner.lock().unwrap().camera = Some(still);
    }

    pub fn set_screen(&self, still: JpegImage) {
        self.inner.lock().unwrap().screen = Some(still);
    }

    /// Dropped when the screen stream ends so stale stills are never used as
    /// evidence for later events.
    pub fn clear_screen(&self) {
        self.inner.lock().unwrap().screen = None;
    }

    pub fn latest_camera(&self) -> Option<JpegImage> {
        self.inner.lock().unwrap().camera.clone()
    }

    pub fn latest_screen(&self) -> Option<JpegImage> {
        self.inner.lock().unwrap().screen.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> CameraFrame {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..(width * height) {
            pixels.extend_from_slice(&rgb);
        }
        CameraFrame::new(width, height, pixels)
    }

    #[test]
    fn encode_produces_a_decodable_jpeg() {
        let still = solid_frame(32, 24, [120, 80, 40]).encode_jpeg(70).unwrap();
        let decoded = image::load_from_memory(still.as_bytes()).unwrap();
        assert_eq!(decoded.width(), 32);
        assert_eq!(decoded.height(), 24);
    }

    #[test]
    fn encode_rejects_mismatched_buffer() {
        let bad = CameraFrame::new(16, 16, vec![0u8; 10]);
        assert!(bad.encode_jpeg(70).is_err());
    }

    #[test]
    fn data_url_has_jpeg_prefix() {
        let still = solid_frame(8, 8, [1, 2, 3]).encode_jpeg(70).unwrap();
        assert!(still.to_data_url().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn frame_store_overwrites_and_clears() {
        let store = FrameStore::new();
        assert!(store.latest_camera().is_none());

        let first = solid_frame(8, 8, [0, 0, 0]).encode_jpeg(70).unwrap();
        let second = solid_frame(8, 8, [255, 255, 255]).encode_jpeg(70).unwrap();
        store.set_screen(first);
        store.set_screen(second.clone());
        assert_eq!(
            store.latest_screen().unwrap().as_bytes(),
            second.as_bytes()
        );

        store.clear_screen();
        assert!(store.latest_screen().is_none());
    }
}
