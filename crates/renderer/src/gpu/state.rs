use std::time::{Duration, Instant};

use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use scene::{AvatarScene, FrameCapture, FrameSink, RgbaFrame};
use tracing::{debug, warn};
use winit::dpi::PhysicalSize;

use crate::types::{AdapterProfile, GpuPowerPreference};

use super::context::{GpuContext, OFFSCREEN_FORMAT};
use super::meshes::MeshCache;
use super::post::PostComposer;
use super::readback::{read_texture, RenderCaptureError};
use super::scene_pass::ScenePass;
use super::targets::{RenderTargets, Target};
use super::textures::TextureCache;

/// Frames-per-second bookkeeping, refreshed once a second.
#[derive(Debug)]
pub(crate) struct FrameStats {
    frame_count: u64,
    frames_since_last_update: u32,
    last_fps_update: Instant,
    frames_per_second: f32,
}

impl FrameStats {
    pub fn new(now: Instant) -> Self {
        Self {
            frame_count: 0,
            frames_since_last_update: 0,
            last_fps_update: now,
            frames_per_second: 60.0,
        }
    }

    /// Counts a frame. Returns the new rate when a second has elapsed.
    pub fn record(&mut self, now: Instant) -> Option<f32> {
        self.frame_count += 1;
        self.frames_since_last_update += 1;
        let elapsed = now.saturating_duration_since(self.last_fps_update);
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        self.frames_per_second = self.frames_since_last_update as f32 / elapsed.as_secs_f32();
        self.frames_since_last_update = 0;
        self.last_fps_update = now;
        Some(self.frames_per_second)
    }

    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.frames_per_second.max(1.0))
    }
}

/// Everything needed to turn an `AvatarScene` into pixels, either on a
/// window surface or into an offscreen texture for capture.
pub(crate) struct GpuState {
    context: GpuContext,
    meshes: MeshCache,
    textures: TextureCache,
    scene_pass: ScenePass,
    composer: PostComposer,
    targets: RenderTargets,
    stats: FrameStats,
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        gpu_power: GpuPowerPreference,
        vsync: bool,
        pixel_size: u32,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new_windowed(target, initial_size, gpu_power, vsync)?;
        Ok(Self::from_context(context, pixel_size))
    }

    pub(crate) fn new_headless(
        size: PhysicalSize<u32>,
        gpu_power: GpuPowerPreference,
        pixel_size: u32,
    ) -> Result<Self> {
        let context = GpuContext::new_headless(size, gpu_power)?;
        Ok(Self::from_context(context, pixel_size))
    }

    fn from_context(context: GpuContext, pixel_size: u32) -> Self {
        let device = &context.device;
        Self {
            meshes: MeshCache::new(),
            textures: TextureCache::new(device, &context.queue),
            scene_pass: ScenePass::new(device),
            composer: PostComposer::new(device),
            targets: RenderTargets::new(device, context.size, pixel_size),
            stats: FrameStats::new(Instant::now()),
            context,
        }
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
    }

    pub(crate) fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    fn ensure_targets(&mut self, pixel_size: u32) {
        if self.targets.matches(self.context.size, pixel_size) {
            return;
        }
        self.targets = RenderTargets::new(&self.context.device, self.context.size, pixel_size);
        self.composer.invalidate();
    }

    fn prepare(&mut self, scene: &AvatarScene, output_format: wgpu::TextureFormat) {
        let device = &self.context.device;
        let queue = &self.context.queue;

        self.meshes.sync(device, scene.geometries());
        let uploads = self.textures.sync(device, queue, scene);
        if uploads > 0 {
            tracing::trace!(uploads, "refreshed surface textures");
        }

        self.ensure_targets(scene.post().pixel_size());
        let device = &self.context.device;
        let queue = &self.context.queue;
        self.scene_pass.prepare(device, queue, scene, &self.textures);
        self.composer
            .prepare(device, queue, &self.targets, scene, output_format);
    }

    fn encode(
        &self,
        scene: &AvatarScene,
        output_view: &wgpu::TextureView,
        output_format: wgpu::TextureFormat,
    ) -> wgpu::CommandBuffer {
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        self.scene_pass
            .encode(&mut encoder, &self.targets, &self.meshes, scene);
        self.composer
            .encode(&mut encoder, &self.targets, output_view, output_format);
        encoder.finish()
    }

    /// Draws the scene to the window surface and presents it.
    pub(crate) fn render(&mut self, scene: &AvatarScene) -> Result<(), wgpu::SurfaceError> {
        let Some(present) = self.context.surface.as_ref() else {
            return Ok(());
        };

        let acquire_start = Instant::now();
        let frame = present.surface.get_current_texture()?;
        let acquire_time = acquire_start.elapsed();
        if acquire_time > self.stats.frame_budget() {
            warn!(
                acquire_ms = acquire_time.as_millis() as u64,
                budget_ms = self.stats.frame_budget().as_millis() as u64,
                "acquiring frame took longer than the frame budget"
            );
        }

        let output_format = self.context.output_format;
        self.prepare(scene, output_format);
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let commands = self.encode(scene, &view, output_format);
        self.context.queue.submit(std::iter::once(commands));
        frame.present();

        if let Some(fps) = self.stats.record(Instant::now()) {
            debug!(
                fps = fps.round(),
                frame_count = self.stats.frame_count,
                pixel_size = self.targets.pixel_size,
                "render stats"
            );
        }
        Ok(())
    }

    /// Renders the scene into an offscreen texture of the current size and
    /// reads it back as tightly packed sRGB-encoded RGBA8.
    pub(crate) fn render_offscreen(
        &mut self,
        scene: &AvatarScene,
    ) -> Result<RgbaFrame, RenderCaptureError> {
        self.prepare(scene, OFFSCREEN_FORMAT);
        let size = (self.context.size.width, self.context.size.height);
        let output = Target::new(
            &self.context.device,
            "capture output",
            size,
            OFFSCREEN_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        );
        let commands = self.encode(scene, &output.view, OFFSCREEN_FORMAT);
        self.context.queue.submit(std::iter::once(commands));

        let pixels = read_texture(
            &self.context.device,
            &self.context.queue,
            &output.texture,
            output.size.0,
            output.size.1,
        )?;
        debug!(width = output.size.0, height = output.size.1, "read back frame");
        Ok(RgbaFrame {
            width: output.size.0,
            height: output.size.1,
            pixels,
        })
    }
}

impl FrameSink for GpuState {
    type Error = wgpu::SurfaceError;

    fn present(&mut self, scene: &AvatarScene) -> Result<(), Self::Error> {
        self.render(scene)
    }
}

impl FrameCapture for GpuState {
    type Error = RenderCaptureError;

    fn capture_frame(&mut self, scene: &AvatarScene) -> Result<RgbaFrame, Self::Error> {
        self.render_offscreen(scene)
    }
}
