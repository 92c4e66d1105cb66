//! Procedural 2D painters for the avatar scene.
//!
//! Each visual element owns one [`RasterSurface`]. Painters draw into the
//! surface's pixel buffer with `tiny-skia`; the surface version then tells
//! the GPU side that new pixels are waiting.

pub mod bitmap_font;
mod brick;
mod font;
mod grid;
mod name_tag;
mod sun;
mod surface;

pub use brick::{BrickPattern, BRICK_SURFACE_SIZE};
pub use font::{FontError, GlyphSource, TextPlacement};
pub use grid::{GridPattern, GRID_REPEAT, GRID_SURFACE_SIZE};
pub use name_tag::{NameTag, OutlinePass, NAME_TAG_HEIGHT, NAME_TAG_TEXT, NAME_TAG_WIDTH};
pub use sun::{StripeBand, SunStripes, SUN_SURFACE_SIZE};
pub use surface::{FilterMode, RasterSurface, SamplingParams, SurfaceAllocError, WrapMode};

pub use tiny_skia::{Color, Pixmap};

/// Opaque colour from a `0xRRGGBB` literal.
pub fn hex_color(rgb: u32) -> Color {
    Color::from_rgba8(
        ((rgb >> 16) & 0xff) as u8,
        ((rgb >> 8) & 0xff) as u8,
        (rgb & 0xff) as u8,
        255,
    )
}
