use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn pyramid_avatar(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pyramid-avatar"))
        .args(args)
        .env("PYRAMID_AVATAR_CONFIG_DIR", config_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to launch pyramid-avatar")
}

fn json_stdout(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn config_json_reports_defaults() {
    let dir = TempDir::new().unwrap();
    let value = json_stdout(&pyramid_avatar(dir.path(), &["config", "--json"]));

    assert_eq!(value["window"]["width"], 1280);
    assert_eq!(value["window"]["height"], 720);
    assert_eq!(value["render"]["pixel_size"], 3);
    assert_eq!(value["render"]["gpu_power"], "high");
    assert_eq!(value["capture"]["at"], "0s");
}

#[test]
fn config_file_and_flags_are_merged() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("config.toml"),
        "[window]\ntitle = \"Avatar\"\n\n[render]\npixel_size = 6\ngpu_power = \"low\"\n",
    )
    .unwrap();

    let value = json_stdout(&pyramid_avatar(
        dir.path(),
        &["config", "--json", "--size", "320x240", "--capture-dir", "shots"],
    ));

    assert_eq!(value["window"]["title"], "Avatar");
    assert_eq!(value["window"]["width"], 320);
    assert_eq!(value["render"]["pixel_size"], 6);
    assert_eq!(value["render"]["gpu_power"], "low");
    assert_eq!(value["capture"]["directory"], "shots");
}

#[test]
fn config_prints_toml_by_default() {
    let dir = TempDir::new().unwrap();
    let output = pyramid_avatar(dir.path(), &["config", "--pixel-size", "7"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("[render]"));
    assert!(stdout.contains("pixel_size = 7"));
}

#[test]
fn invalid_pixel_size_fails() {
    let dir = TempDir::new().unwrap();
    let output = pyramid_avatar(dir.path(), &["config", "--pixel-size", "0"]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
