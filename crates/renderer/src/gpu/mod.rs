//! GPU side of the avatar renderer.
//!
//! - `context` owns the wgpu instance, device and optional window surface.
//! - `meshes` and `textures` mirror scene geometry and raster surfaces;
//!   textures re-upload only when a surface's version changes.
//! - `scene_pass` draws the graph into a low-resolution HDR target.
//! - `post` upscales with hard pixel blocks, adds bloom and tone maps into
//!   the output format.
//! - `readback` copies an offscreen frame into CPU memory for capture.
//! - `state` glues everything together as `GpuState`, the frame sink and
//!   frame capture used by `window` and `headless`.

mod context;
mod meshes;
mod post;
mod readback;
mod scene_pass;
mod state;
mod targets;
mod textures;
mod uniforms;

pub use readback::RenderCaptureError;
pub(crate) use state::GpuState;
