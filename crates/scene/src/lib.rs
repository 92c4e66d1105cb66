//! The pyramid avatar scene: what is drawn, where, and how it moves.
//!
//! Everything here is CPU-side. A renderer consumes [`AvatarScene`] through
//! the [`FrameSink`] and [`FrameCapture`] traits; the [`AnimationDriver`]
//! owns the scene and is the only place it changes.

mod animation;
mod assembler;
pub mod camera;
mod capture;
pub mod clock;
pub mod geometry;
mod graph;
pub mod material;
pub mod post;

pub use animation::{AnimationDriver, FrameSink, TickReport};
pub use assembler::{
    assemble, marker_positions, AvatarScene, SceneError, SceneHandles, SceneOptions,
    CAMERA_EYE, FLOOR_SCROLL_SPEED, PYRAMID_SPIN_STEP,
};
pub use capture::{encode_png, CaptureBridge, CaptureError, FrameCapture, RgbaFrame, CAPTURE_FILE_NAME};
pub use clock::{
    BoxedTimeSource, FixedTimeSource, SteppedTimeSource, SystemTimeSource, TimeSample, TimeSource,
};
pub use graph::{DrawItem, Drawable, Node, NodeId, SceneGraph, Transform};

pub use painter;
