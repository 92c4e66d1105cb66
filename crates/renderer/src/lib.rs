//! GPU renderer for the pyramid avatar scene.
//!
//! The crate turns an [`scene::AvatarScene`] into pixels with `wgpu`, either in
//! a `winit` window or offscreen for a one-shot capture. The overall flow is:
//!
//! ```text
//!   pyramid-avatar CLI
//!          │ RendererConfig + AnimationDriver
//!          ▼
//!   Renderer::run ──▶ winit event loop ──▶ driver.tick(GpuState)
//!                                                 │
//!        scene pass (low-res HDR) ──▶ pixelate ──▶ bloom ──▶ ACES output
//! ```
//!
//! Scene state lives in the `scene` crate and is only read here. `GpuState`
//! implements `scene::FrameSink` for presenting and `scene::FrameCapture`
//! for reading frames back, so everything above the GPU is testable without
//! one.

mod gpu;
mod headless;
mod shaders;
mod types;
mod window;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use scene::{AnimationDriver, AvatarScene};

pub use gpu::RenderCaptureError;
pub use types::{AdapterProfile, GpuPowerPreference, RendererConfig};

/// Entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Opens the viewer window and animates until it is closed.
    ///
    /// Fails when no window or GPU adapter can be created.
    pub fn run(&self, driver: AnimationDriver) -> Result<()> {
        window::run(&self.config, driver)
    }

    /// Renders `scene` as it looks `at` seconds in and writes the PNG to
    /// `output`. Needs a GPU adapter but no display.
    pub fn capture(&self, scene: AvatarScene, at: Duration, output: &Path) -> Result<PathBuf> {
        headless::capture(&self.config, scene, at, output)
    }
}
