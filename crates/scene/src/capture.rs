use std::error::Error as StdError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::assembler::AvatarScene;

pub const CAPTURE_FILE_NAME: &str = "programmer-avatar.png";

/// Tightly packed RGBA8 pixels, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaFrame {
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }
}

/// Renders the current scene state synchronously and reads it back.
/// Implementations must not mutate animation state.
pub trait FrameCapture {
    type Error: StdError + Send + Sync + 'static;

    fn capture_frame(&mut self, scene: &AvatarScene) -> Result<RgbaFrame, Self::Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to render frame for capture")]
    Render(#[source] Box<dyn StdError + Send + Sync>),
    #[error("frame holds {actual} bytes; expected {expected} for {width}x{height}")]
    FrameSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to write capture to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub fn encode_png(frame: &RgbaFrame) -> Result<Vec<u8>, CaptureError> {
    let expected = RgbaFrame::expected_len(frame.width, frame.height);
    if frame.pixels.len() != expected || expected == 0 {
        return Err(CaptureError::FrameSize {
            width: frame.width,
            height: frame.height,
            expected,
            actual: frame.pixels.len(),
        });
    }

    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        &frame.pixels,
        frame.width,
        frame.height,
        ExtendedColorType::Rgba8,
    )?;
    Ok(bytes)
}

/// Turns an on-demand render into `programmer-avatar.png` on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureBridge {
    target: PathBuf,
}

impl CaptureBridge {
    /// Writes `programmer-avatar.png` inside `directory`.
    pub fn in_directory(directory: impl AsRef<Path>) -> Self {
        Self {
            target: directory.as_ref().join(CAPTURE_FILE_NAME),
        }
    }

    /// Writes to an explicit file path.
    pub fn to_path(path: impl Into<PathBuf>) -> Self {
        Self {
            target: path.into(),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Renders the scene once and returns the PNG bytes.
    pub fn render_png<C>(&self, source: &mut C, scene: &AvatarScene) -> Result<Vec<u8>, CaptureError>
    where
        C: FrameCapture + ?Sized,
    {
        let frame = source
            .capture_frame(scene)
            .map_err(|err| CaptureError::Render(Box::new(err)))?;
        encode_png(&frame)
    }

    /// Renders, encodes and writes the capture. Returns the written path.
    pub fn capture<C>(&self, source: &mut C, scene: &AvatarScene) -> Result<PathBuf, CaptureError>
    where
        C: FrameCapture + ?Sized,
    {
        let png = self.render_png(source, scene)?;
        if let Some(parent) = self.target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CaptureError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.target, &png).map_err(|source| CaptureError::Io {
            path: self.target.clone(),
            source,
        })?;
        tracing::info!(path = %self.target.display(), bytes = png.len(), "wrote capture");
        Ok(self.target.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        let frame = RgbaFrame {
            width: 4,
            height: 4,
            pixels: vec![0; 10],
        };
        let err = encode_png(&frame).unwrap_err();
        assert!(matches!(err, CaptureError::FrameSize { expected: 64, actual: 10, .. }));
    }

    #[test]
    fn encodes_decodable_png() {
        let frame = RgbaFrame {
            width: 2,
            height: 1,
            pixels: vec![255, 0, 0, 255, 0, 0, 255, 255],
        };
        let png = encode_png(&frame).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.into_raw(), frame.pixels);
    }

    #[test]
    fn bridge_targets_fixed_file_name() {
        let bridge = CaptureBridge::in_directory("/tmp/out");
        assert_eq!(bridge.target(), Path::new("/tmp/out/programmer-avatar.png"));
    }
}
