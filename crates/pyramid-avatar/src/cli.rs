use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "pyramid-avatar",
    author,
    version,
    about = "Retro pixelated pyramid avatar with bloom and PNG capture"
)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: Overrides,
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Values that take precedence over the configuration file.
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Configuration file to load instead of `config.toml` in the config directory.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Window or capture size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size, global = true)]
    pub size: Option<(u32, u32)>,

    /// Initial pixel block size (1-16).
    #[arg(long, value_name = "PIXELS", global = true)]
    pub pixel_size: Option<u32>,

    /// TTF/OTF font for the name tag; the built-in bitmap font is used otherwise.
    #[arg(long, value_name = "PATH", global = true)]
    pub font: Option<PathBuf>,

    /// Directory the `C` key writes `programmer-avatar.png` into.
    #[arg(long, value_name = "DIR", global = true)]
    pub capture_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render one frame without a window and save it as PNG.
    Capture(CaptureArgs),
    /// Print the resolved configuration.
    Config(ConfigArgs),
}

#[derive(Args, Debug, Default)]
pub struct CaptureArgs {
    /// Elapsed scene time to render (e.g. `2.5s`, `1m 10s`).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub at: Option<Duration>,

    /// Output file; defaults to `programmer-avatar.png` in the capture directory.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Print JSON instead of TOML.
    #[arg(long)]
    pub json: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1280x720".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in size '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in size '{trimmed}'"))?;

    if width == 0 || height == 0 {
        return Err("size must be greater than zero".to_string());
    }

    Ok((width, height))
}

/// Accepts humantime strings and bare seconds (`2.5`).
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if let Ok(seconds) = trimmed.parse::<f64>() {
        if seconds.is_finite() && seconds >= 0.0 {
            return Ok(Duration::from_secs_f64(seconds));
        }
        return Err(format!("duration must be non-negative, got '{trimmed}'"));
    }
    humantime::parse_duration(trimmed).map_err(|err| format!("invalid duration '{trimmed}': {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_size_accepts_common_separators() {
        assert_eq!(parse_surface_size("1280x720"), Ok((1280, 720)));
        assert_eq!(parse_surface_size(" 64 X 32 "), Ok((64, 32)));
        assert_eq!(parse_surface_size("800×600"), Ok((800, 600)));
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("0x720").is_err());
        assert!(parse_surface_size("wide x tall").is_err());
    }

    #[test]
    fn durations_take_seconds_or_humantime() {
        assert_eq!(parse_duration("2.5"), Ok(Duration::from_millis(2_500)));
        assert_eq!(parse_duration("1m 10s"), Ok(Duration::from_secs(70)));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert!(parse_duration("-1").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn overrides_work_after_subcommands() {
        let cli = Cli::try_parse_from([
            "pyramid-avatar",
            "capture",
            "--at",
            "3s",
            "--size",
            "320x200",
            "--pixel-size",
            "4",
        ])
        .unwrap();
        assert_eq!(cli.overrides.size, Some((320, 200)));
        assert_eq!(cli.overrides.pixel_size, Some(4));
        match cli.command {
            Some(Command::Capture(args)) => {
                assert_eq!(args.at, Some(Duration::from_secs(3)));
                assert_eq!(args.output, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn bare_invocation_opens_the_viewer() {
        let cli = Cli::try_parse_from(["pyramid-avatar", "--font", "/tmp/font.ttf"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.overrides.font, Some(PathBuf::from("/tmp/font.ttf")));
    }
}
