use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use scene::{AnimationDriver, AvatarScene, CaptureBridge, FixedTimeSource};
use winit::dpi::PhysicalSize;

use crate::gpu::GpuState;
use crate::types::RendererConfig;

/// Advances a fresh scene to `at` with a single tick, so the dynamic
/// surfaces show exactly that moment.
pub(crate) fn settle_at(scene: AvatarScene, at: Duration) -> AnimationDriver {
    let mut driver = AnimationDriver::new(scene, Box::new(FixedTimeSource::from_duration(at)));
    driver.advance();
    driver
}

/// Renders one frame without a window and writes it as PNG to `output`.
pub(crate) fn capture(
    config: &RendererConfig,
    scene: AvatarScene,
    at: Duration,
    output: &Path,
) -> Result<PathBuf> {
    let (width, height) = config.surface_size;
    let mut driver = settle_at(scene, at);
    driver.resize_viewport(width, height);

    let mut gpu = GpuState::new_headless(
        PhysicalSize::new(width, height),
        config.gpu_power,
        driver.scene().post().pixel_size(),
    )
    .context("failed to initialise headless renderer")?;
    tracing::info!(
        adapter = %gpu.adapter_profile().name,
        at_seconds = at.as_secs_f64(),
        width,
        height,
        "rendering headless capture"
    );

    CaptureBridge::to_path(output)
        .capture(&mut gpu, driver.scene())
        .with_context(|| format!("failed to capture avatar to {}", output.display()))
}
