//! JPEG capture over a raw RGB frame source.

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::RgbImage;
use log::debug;

use super::{CaptureError, CaptureService, CaptureSettings};

/// Hands over the current frame once the renderer has finished it.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn next_frame(&self) -> Result<RgbImage, CaptureError>;
}

/// Reads a frame, downscales it if needed and encodes it as JPEG.
pub struct JpegFrameCapture<F> {
    source: F,
    settings: CaptureSettings,
}

impl<F: FrameSource> JpegFrameCapture<F> {
    pub fn new(source: F, settings: CaptureSettings) -> Self {
        Self { source, settings }
    }

    pub fn settings(&self) -> CaptureSettings {
        self.settings
    }

    fn encode(&self, frame: &RgbImage) -> Result<Vec<u8>, CaptureError> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(CaptureError::FrameUnavailable("empty frame".to_string()));
        }

        let max_width = self.settings.max_width.max(1);
        let resized;
        let frame = if width > max_width {
            let scaled_height = ((height as u64 * max_width as u64) / width as u64).max(1) as u32;
            resized = imageops::resize(frame, max_width, scaled_height, FilterType::Triangle);
            &resized
        } else {
            frame
        };

        let quality = self.settings.jpeg_quality.clamp(1, 100);
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality)
            .encode_image(frame)
            .map_err(|e| CaptureError::Encoding(e.to_string()))?;

        debug!(
            "Encoded {}x{} frame as JPEG ({} bytes, quality {})",
            frame.width(),
            frame.height(),
            bytes.len(),
            quality
        );
        Ok(bytes)
    }
}

#[async_trait]
impl<F: FrameSource> CaptureService for JpegFrameCapture<F> {
    async fn capture(&self) -> Result<Vec<u8>, CaptureError> {
        let frame = self.source.next_frame().await?;
        self.encode(&frame)
    }
}
