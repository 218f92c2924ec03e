//! Visual capture contract.
//!
//! The agent runtime only needs "give me an encoded image of the frame that
//! is currently on screen". How the pixels are produced belongs to the
//! host's renderer; [`jpeg::JpegFrameCapture`] covers the common case of a
//! host that can hand over raw RGB frames.

pub mod jpeg;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use jpeg::{FrameSource, JpegFrameCapture};

/// Produces an encoded image of the current frame.
///
/// Implementations must not complete until the frame they read has been
/// fully rendered.
#[async_trait]
pub trait CaptureService: Send + Sync {
    async fn capture(&self) -> Result<Vec<u8>, CaptureError>;
}

/// Capture error types
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Frame unavailable: {0}")]
    FrameUnavailable(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),
}

/// Size and quality limits for captured frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Frames wider than this are downscaled, keeping the aspect ratio.
    pub max_width: u32,
    /// JPEG quality, 1 to 100.
    pub jpeg_quality: u8,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            max_width: 1280,
            jpeg_quality: 50,
        }
    }
}
