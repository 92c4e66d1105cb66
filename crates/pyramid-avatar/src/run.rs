use anyhow::{Context, Result};
use renderer::Renderer;
use scene::{assemble, AnimationDriver, SystemTimeSource, CAPTURE_FILE_NAME};
use tracing_subscriber::EnvFilter;

use crate::bootstrap::{renderer_config, resolve_config, scene_options, Resolved};
use crate::cli::{CaptureArgs, Cli, Command, ConfigArgs};
use crate::paths::AppPaths;

const DEFAULT_FILTER: &str =
    "warn,pyramid_avatar=info,renderer=info,scene=info,painter=info,wgpu=error,naga=warn";

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let paths = AppPaths::discover()?;
    tracing::debug!(config = %paths.config_dir().display(), "resolved pyramid-avatar paths");
    let resolved = resolve_config(&cli.overrides, &paths)?;

    match cli.command {
        None => run_viewer(resolved),
        Some(Command::Capture(args)) => run_capture(resolved, args),
        Some(Command::Config(args)) => print_config(&resolved, &args),
    }
}

fn initialise_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_viewer(resolved: Resolved) -> Result<()> {
    let config = resolved.config;
    tracing::info!(
        width = config.window.width,
        height = config.window.height,
        pixel_size = config.render.pixel_size,
        capture_dir = %config.capture.directory.display(),
        "starting pyramid avatar"
    );

    let scene = assemble(scene_options(&config)).context("failed to build avatar scene")?;
    let driver = AnimationDriver::new(scene, Box::new(SystemTimeSource::new()));
    Renderer::new(renderer_config(&config)).run(driver)
}

fn run_capture(resolved: Resolved, args: CaptureArgs) -> Result<()> {
    let config = resolved.config;
    let at = args.at.unwrap_or(config.capture.at);
    let output = args
        .output
        .unwrap_or_else(|| config.capture.directory.join(CAPTURE_FILE_NAME));

    let scene = assemble(scene_options(&config)).context("failed to build avatar scene")?;
    let written = Renderer::new(renderer_config(&config)).capture(scene, at, &output)?;
    println!("{}", written.display());
    Ok(())
}

fn print_config(resolved: &Resolved, args: &ConfigArgs) -> Result<()> {
    let rendered = if args.json {
        serde_json::to_string_pretty(&resolved.config).context("failed to encode configuration")?
    } else {
        resolved
            .config
            .to_toml_string()
            .context("failed to encode configuration")?
    };
    if let Some(source) = &resolved.source {
        tracing::info!(path = %source.display(), "configuration file");
    }
    println!("{rendered}");
    Ok(())
}
