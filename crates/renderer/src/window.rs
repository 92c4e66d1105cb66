use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use scene::{AnimationDriver, CaptureBridge};
use tracing::{error, info, warn};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::Key;
use winit::window::WindowBuilder;

use crate::gpu::GpuState;
use crate::types::RendererConfig;

/// Highest block size reachable from the number row.
const MAX_KEY_PIXEL_SIZE: u32 = 8;
/// Trackpad pixels that count as one wheel notch.
const PIXELS_PER_WHEEL_STEP: f64 = 40.0;

/// What a key press asks the viewer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputAction {
    SetPixelSize(u32),
    Capture,
}

pub(crate) fn action_for_key(key: &Key) -> Option<InputAction> {
    let Key::Character(text) = key else {
        return None;
    };
    match text.as_str() {
        "c" | "C" => Some(InputAction::Capture),
        digit => digit
            .parse::<u32>()
            .ok()
            .filter(|value| (1..=MAX_KEY_PIXEL_SIZE).contains(value))
            .map(InputAction::SetPixelSize),
    }
}

/// Converts a wheel event into orbit zoom steps; positive moves closer.
pub(crate) fn wheel_steps(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => (position.y / PIXELS_PER_WHEEL_STEP) as f32,
    }
}

/// Left-button drag tracking for the orbit controller.
#[derive(Debug, Default)]
pub(crate) struct DragState {
    position: Option<PhysicalPosition<f64>>,
    is_pressed: bool,
}

impl DragState {
    /// Records the cursor and returns the movement while dragging.
    pub fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>) -> Option<(f32, f32)> {
        let previous = self.position.replace(position);
        if !self.is_pressed {
            return None;
        }
        previous.map(|last| ((position.x - last.x) as f32, (position.y - last.y) as f32))
    }

    pub fn handle_button(&mut self, state: ElementState) {
        self.is_pressed = state == ElementState::Pressed;
    }
}

fn capture(gpu: &mut GpuState, driver: &AnimationDriver, directory: &Path) {
    match CaptureBridge::in_directory(directory).capture(gpu, driver.scene()) {
        Ok(path) => info!(path = %path.display(), "saved avatar capture"),
        Err(err) => error!(error = %err, "failed to capture avatar"),
    }
}

/// Opens the viewer window and drives the animation from its redraws until
/// the window closes.
pub(crate) fn run(config: &RendererConfig, mut driver: AnimationDriver) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(window_size)
        .build(&event_loop)
        .context("failed to create viewer window")?;
    let window = Arc::new(window);

    let size = window.inner_size();
    let mut gpu = GpuState::new(
        window.as_ref(),
        size,
        config.gpu_power,
        config.vsync,
        driver.scene().post().pixel_size(),
    )
    .context("failed to initialise renderer")?;
    driver.resize_viewport(size.width, size.height);

    let profile = gpu.adapter_profile();
    info!(
        adapter = %profile.name,
        width = size.width,
        height = size.height,
        pixel_size = driver.scene().post().pixel_size(),
        "viewer ready"
    );

    let capture_directory = config.capture_directory.clone();
    let mut drag = DragState::default();
    window.request_redraw();

    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Wait);

            match event {
                Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        elwt.exit();
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if event.state != ElementState::Pressed || event.repeat {
                            return;
                        }
                        match action_for_key(&event.logical_key) {
                            Some(InputAction::SetPixelSize(value)) => {
                                driver.set_pixel_size(value);
                            }
                            Some(InputAction::Capture) => {
                                capture(&mut gpu, &driver, &capture_directory);
                            }
                            None => {}
                        }
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        if let Some((dx, dy)) = drag.handle_cursor_moved(position) {
                            driver.orbit(dx, dy, gpu.size().height as f32);
                        }
                    }
                    WindowEvent::MouseInput {
                        state: button_state,
                        button: MouseButton::Left,
                        ..
                    } => {
                        drag.handle_button(button_state);
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        driver.zoom(wheel_steps(delta));
                    }
                    WindowEvent::Resized(new_size) => {
                        if new_size.width > 0 && new_size.height > 0 {
                            gpu.resize(new_size);
                            driver.resize_viewport(new_size.width, new_size.height);
                        }
                    }
                    WindowEvent::RedrawRequested => match driver.tick(&mut gpu) {
                        Ok(_) => {}
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            gpu.reconfigure();
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            error!("surface out of memory; exiting");
                            elwt.exit();
                        }
                        Err(wgpu::SurfaceError::Timeout) => {
                            warn!("surface timeout; retrying next frame");
                        }
                        Err(other) => {
                            warn!(error = ?other, "surface error; retrying next frame");
                        }
                    },
                    _ => {}
                },
                Event::AboutToWait => {
                    window.request_redraw();
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow!("event loop error: {err}"))
}
