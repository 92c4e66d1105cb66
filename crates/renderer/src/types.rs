use std::path::PathBuf;

/// Adapter power preference requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    Low,
    #[default]
    High,
}

impl GpuPowerPreference {
    pub(crate) fn to_wgpu(self) -> wgpu::PowerPreference {
        match self {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        }
    }
}

/// Summary of the adapter wgpu picked, kept for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub max_texture_dimension: u32,
}

impl AdapterProfile {
    pub(crate) fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            max_texture_dimension: limits.max_texture_dimension_2d,
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }

    /// Rejects surfaces larger than the adapter can allocate.
    pub(crate) fn check_size(&self, width: u32, height: u32) -> anyhow::Result<()> {
        let max = self.max_texture_dimension;
        if width > max || height > max {
            anyhow::bail!("GPU max texture dimension is {max}, requested surface is {width}x{height}");
        }
        Ok(())
    }
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window or offscreen size in physical pixels.
    pub surface_size: (u32, u32),
    pub title: String,
    /// FIFO presentation when true, otherwise the lowest-latency mode available.
    pub vsync: bool,
    pub gpu_power: GpuPowerPreference,
    /// Where the `C` key writes `programmer-avatar.png`.
    pub capture_directory: PathBuf,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            title: "Pyramid Avatar".to_string(),
            vsync: true,
            gpu_power: GpuPowerPreference::default(),
            capture_directory: PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(device_type: wgpu::DeviceType) -> AdapterProfile {
        AdapterProfile {
            name: "test".into(),
            backend: wgpu::Backend::Vulkan,
            device_type,
            max_texture_dimension: 4096,
        }
    }

    #[test]
    fn cpu_adapters_are_software() {
        assert!(profile(wgpu::DeviceType::Cpu).is_software());
        assert!(!profile(wgpu::DeviceType::DiscreteGpu).is_software());
    }

    #[test]
    fn oversized_surfaces_are_rejected() {
        let profile = profile(wgpu::DeviceType::IntegratedGpu);
        assert!(profile.check_size(4096, 2160).is_ok());
        assert!(profile.check_size(8192, 100).is_err());
    }
}
