use std::path::PathBuf;

use anyhow::{Context, Result};
use avatarconfig::{AvatarConfig, GpuPower};
use painter::GlyphSource;
use renderer::{GpuPowerPreference, RendererConfig};
use scene::SceneOptions;
use tracing::debug;

use crate::cli::Overrides;
use crate::paths::AppPaths;

/// Configuration after the file and the command-line overrides are merged.
#[derive(Debug)]
pub struct Resolved {
    pub config: AvatarConfig,
    /// File the configuration came from, if one was read.
    pub source: Option<PathBuf>,
}

/// Loads the configuration file and applies `overrides` on top.
///
/// An explicit `--config` must exist; the default location may be missing.
pub fn resolve_config(overrides: &Overrides, paths: &AppPaths) -> Result<Resolved> {
    let (mut config, source) = match overrides.config.as_ref() {
        Some(path) => {
            let config = AvatarConfig::load(path)
                .with_context(|| format!("failed to load configuration {}", path.display()))?;
            (config, Some(path.clone()))
        }
        None => {
            let path = paths.config_file();
            let exists = path.exists();
            let config = AvatarConfig::load_or_default(&path)
                .with_context(|| format!("failed to load configuration {}", path.display()))?;
            (config, exists.then_some(path))
        }
    };

    apply_overrides(&mut config, overrides);
    config.validate().context("invalid command-line overrides")?;
    debug!(source = ?source, "resolved configuration");
    Ok(Resolved { config, source })
}

pub fn apply_overrides(config: &mut AvatarConfig, overrides: &Overrides) {
    if let Some((width, height)) = overrides.size {
        config.window.width = width;
        config.window.height = height;
    }
    if let Some(pixel_size) = overrides.pixel_size {
        config.render.pixel_size = pixel_size;
    }
    if let Some(font) = overrides.font.as_ref() {
        config.name_tag.font = Some(font.clone());
    }
    if let Some(directory) = overrides.capture_dir.as_ref() {
        config.capture.directory = directory.clone();
    }
}

pub fn renderer_config(config: &AvatarConfig) -> RendererConfig {
    RendererConfig {
        surface_size: (config.window.width, config.window.height),
        title: config.window.title.clone(),
        vsync: config.window.vsync,
        gpu_power: match config.render.gpu_power {
            GpuPower::Low => GpuPowerPreference::Low,
            GpuPower::High => GpuPowerPreference::High,
        },
        capture_directory: config.capture.directory.clone(),
    }
}

/// Scene inputs; loads the name tag font, falling back to the bitmap font.
pub fn scene_options(config: &AvatarConfig) -> SceneOptions {
    SceneOptions {
        viewport: (config.window.width, config.window.height),
        pixel_size: config.render.pixel_size,
        glyphs: GlyphSource::load_or_fallback(config.name_tag.font.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn paths_in(dir: &TempDir) -> AppPaths {
        AppPaths::from_config_dir(dir.path().to_path_buf())
    }

    #[test]
    fn missing_default_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_config(&Overrides::default(), &paths_in(&dir)).unwrap();
        assert_eq!(resolved.config, AvatarConfig::default());
        assert_eq!(resolved.source, None);
    }

    #[test]
    fn overrides_win_over_the_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.toml"),
            "[render]\npixel_size = 5\n\n[window]\nwidth = 640\nheight = 480\n",
        )
        .unwrap();
        let overrides = Overrides {
            pixel_size: Some(2),
            capture_dir: Some(PathBuf::from("/tmp/shots")),
            ..Overrides::default()
        };

        let resolved = resolve_config(&overrides, &paths_in(&dir)).unwrap();
        assert_eq!(resolved.config.render.pixel_size, 2);
        assert_eq!(resolved.config.window.width, 640);
        assert_eq!(resolved.config.capture.directory, PathBuf::from("/tmp/shots"));
        assert_eq!(resolved.source, Some(dir.path().join("config.toml")));
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = TempDir::new().unwrap();
        let overrides = Overrides {
            config: Some(dir.path().join("absent.toml")),
            ..Overrides::default()
        };
        assert!(resolve_config(&overrides, &paths_in(&dir)).is_err());
    }

    #[test]
    fn out_of_range_pixel_size_is_rejected() {
        let dir = TempDir::new().unwrap();
        let overrides = Overrides {
            pixel_size: Some(40),
            ..Overrides::default()
        };
        assert!(resolve_config(&overrides, &paths_in(&dir)).is_err());
    }

    #[test]
    fn renderer_config_carries_window_and_capture_settings() {
        let mut config = AvatarConfig::default();
        config.render.gpu_power = GpuPower::Low;
        config.capture.directory = PathBuf::from("captures");
        let renderer = renderer_config(&config);
        assert_eq!(renderer.surface_size, (1280, 720));
        assert_eq!(renderer.gpu_power, GpuPowerPreference::Low);
        assert_eq!(renderer.capture_directory, PathBuf::from("captures"));
        assert!(renderer.vsync);
    }

    #[test]
    fn unreadable_font_falls_back_to_bitmap() {
        let mut config = AvatarConfig::default();
        config.name_tag.font = Some(PathBuf::from("/nonexistent/font.ttf"));
        let options = scene_options(&config);
        assert!(options.glyphs.is_fallback());
        assert_eq!(options.pixel_size, 3);
    }
}
