use anyhow::{anyhow, Context as AnyhowContext, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;

use crate::types::{AdapterProfile, GpuPowerPreference};

/// Format of offscreen output targets (headless rendering and captures).
pub(crate) const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

pub(crate) struct PresentSurface {
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
}

/// Device, queue and (for windows) the swapchain surface.
pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub surface: Option<PresentSurface>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub size: PhysicalSize<u32>,
    /// Format the final post stage writes when presenting.
    pub output_format: wgpu::TextureFormat,
    pub adapter_profile: AdapterProfile,
}

fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        flags: wgpu::InstanceFlags::default(),
        memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        backend_options: wgpu::BackendOptions::default(),
    })
}

fn request_device(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'static>>,
    gpu_power: GpuPowerPreference,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue, AdapterProfile)> {
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: gpu_power.to_wgpu(),
        compatible_surface: surface,
        force_fallback_adapter: false,
    }))
    .context("failed to find a suitable GPU adapter")?;

    let limits = adapter.limits();
    let adapter_profile = AdapterProfile::from_wgpu(&adapter.get_info(), &limits);
    tracing::info!(
        adapter = %adapter_profile.name,
        backend = ?adapter_profile.backend,
        device_type = ?adapter_profile.device_type,
        "selected GPU adapter"
    );
    if adapter_profile.is_software() {
        tracing::warn!(adapter = %adapter_profile.name, "software rasterizer detected; expect a low frame rate");
    }

    let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("pyramid-avatar device"),
        required_features: wgpu::Features::empty(),
        required_limits: wgpu::Limits::downlevel_defaults().using_resolution(limits),
        memory_hints: wgpu::MemoryHints::Performance,
        trace: wgpu::Trace::default(),
    }))
    .context("failed to create GPU device")?;

    Ok((adapter, device, queue, adapter_profile))
}

impl GpuContext {
    pub(crate) fn new_windowed<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        gpu_power: GpuPowerPreference,
        vsync: bool,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let instance = create_instance();

        let window_handle = target
            .window_handle()
            .map_err(|err| anyhow!("failed to acquire window handle: {err}"))?;
        let display_handle = target
            .display_handle()
            .map_err(|err| anyhow!("failed to acquire display handle: {err}"))?;

        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .context("failed to create rendering surface")?;

        let (adapter, device, queue, adapter_profile) =
            request_device(&instance, Some(&surface), gpu_power)?;

        let size = PhysicalSize::new(initial_size.width.max(1), initial_size.height.max(1));
        adapter_profile.check_size(size.width, size.height)?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no supported formats"))?;
        if !surface_format.is_srgb() {
            tracing::warn!(
                ?surface_format,
                "no sRGB surface format available; encoding in the output shader"
            );
        }

        let present_mode = choose_present_mode(&surface_caps.present_modes, vsync);
        tracing::debug!(?present_mode, ?surface_format, "configuring surface");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            _instance: instance,
            surface: Some(PresentSurface { surface, config }),
            device,
            queue,
            size,
            output_format: surface_format,
            adapter_profile,
        })
    }

    /// Context without a surface; frames are only ever read back.
    pub(crate) fn new_headless(size: PhysicalSize<u32>, gpu_power: GpuPowerPreference) -> Result<Self> {
        let instance = create_instance();
        let (_adapter, device, queue, adapter_profile) = request_device(&instance, None, gpu_power)?;
        let size = PhysicalSize::new(size.width.max(1), size.height.max(1));
        adapter_profile.check_size(size.width, size.height)?;

        Ok(Self {
            _instance: instance,
            surface: None,
            device,
            queue,
            size,
            output_format: OFFSCREEN_FORMAT,
            adapter_profile,
        })
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        if let Some(present) = self.surface.as_mut() {
            present.config.width = new_size.width;
            present.config.height = new_size.height;
            present.surface.configure(&self.device, &present.config);
        }
    }

    /// Re-applies the current configuration after a lost or outdated surface.
    pub(crate) fn reconfigure(&mut self) {
        if let Some(present) = self.surface.as_ref() {
            present.surface.configure(&self.device, &present.config);
        }
    }
}

/// FIFO when vsync is on; otherwise Immediate, then Mailbox, then FIFO.
pub(crate) fn choose_present_mode(
    available: &[wgpu::PresentMode],
    vsync: bool,
) -> wgpu::PresentMode {
    let has = |mode: wgpu::PresentMode| available.contains(&mode);
    if !vsync {
        if has(wgpu::PresentMode::Immediate) {
            return wgpu::PresentMode::Immediate;
        }
        if has(wgpu::PresentMode::Mailbox) {
            return wgpu::PresentMode::Mailbox;
        }
    }
    wgpu::PresentMode::Fifo
}
