use tiny_skia::{Color, LineCap, LineJoin, Paint, Pixmap, Stroke, Transform};

use crate::font::{GlyphSource, TextPlacement};
use crate::hex_color;
use crate::surface::RasterSurface;

pub const NAME_TAG_TEXT: &str = "PyramidBuilder";
pub const NAME_TAG_WIDTH: u32 = 2048;
pub const NAME_TAG_HEIGHT: u32 = 512;

/// One outline drawn around the glyphs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlinePass {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ContentKey {
    text: String,
    font_generation: u64,
}

/// Hollow outlined name: a wide dark outline under a thin bright one, with
/// transparent glyph interiors.
///
/// The content does not depend on time, so the surface is repainted only
/// when the text or the font changes.
#[derive(Debug)]
pub struct NameTag {
    text: String,
    glyphs: GlyphSource,
    font_generation: u64,
    placement: TextPlacement,
    passes: [OutlinePass; 2],
    painted: Option<ContentKey>,
}

impl NameTag {
    pub fn new(glyphs: GlyphSource) -> Self {
        Self {
            text: NAME_TAG_TEXT.to_string(),
            glyphs,
            font_generation: 0,
            placement: TextPlacement {
                center: (NAME_TAG_WIDTH as f32 / 2.0, NAME_TAG_HEIGHT as f32 / 2.0),
                size: 200.0,
            },
            passes: [
                OutlinePass {
                    width: 14.0,
                    color: Color::BLACK,
                },
                OutlinePass {
                    width: 6.0,
                    color: hex_color(0x00ffff),
                },
            ],
            painted: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn glyphs(&self) -> &GlyphSource {
        &self.glyphs
    }

    pub fn set_glyphs(&mut self, glyphs: GlyphSource) {
        self.glyphs = glyphs;
        self.font_generation += 1;
    }

    fn content_key(&self) -> ContentKey {
        ContentKey {
            text: self.text.clone(),
            font_generation: self.font_generation,
        }
    }

    pub fn needs_repaint(&self) -> bool {
        self.painted.as_ref() != Some(&self.content_key())
    }

    /// Repaints `surface` if the content changed since the last paint.
    /// Returns whether a repaint happened. `_elapsed` is accepted for
    /// symmetry with the animated painters.
    pub fn update(&mut self, surface: &mut RasterSurface, _elapsed: f32) -> bool {
        if !self.needs_repaint() {
            return false;
        }
        surface.repaint(|pixmap| self.paint(pixmap));
        self.painted = Some(self.content_key());
        tracing::debug!(
            text = %self.text,
            fallback = self.glyphs.is_fallback(),
            "painted name tag"
        );
        true
    }

    /// Strokes the glyph outline once per pass, widest first. The glyph
    /// interior is never filled.
    pub fn paint(&self, pixmap: &mut Pixmap) {
        pixmap.fill(Color::TRANSPARENT);
        let Some(path) = self.glyphs.outline_path(&self.text, self.placement) else {
            tracing::warn!(text = %self.text, "name tag has no glyph outlines");
            return;
        };
        for pass in &self.passes {
            let mut paint = Paint::default();
            paint.set_color(pass.color);
            let stroke = Stroke {
                width: pass.width,
                line_cap: LineCap::Round,
                line_join: LineJoin::Round,
                ..Stroke::default()
            };
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SamplingParams;

    fn surface() -> RasterSurface {
        RasterSurface::new(
            "name-tag",
            NAME_TAG_WIDTH,
            NAME_TAG_HEIGHT,
            SamplingParams::SMOOTH,
        )
        .unwrap()
    }

    #[test]
    fn repaints_only_when_content_changes() {
        let mut tag = NameTag::new(GlyphSource::Bitmap);
        let mut surface = surface();

        assert!(tag.update(&mut surface, 0.0));
        assert_eq!(surface.version(), 1);

        assert!(!tag.update(&mut surface, 1.0));
        assert!(!tag.update(&mut surface, 42.0));
        assert_eq!(surface.version(), 1);

        tag.set_glyphs(GlyphSource::Bitmap);
        assert!(tag.needs_repaint());
        assert!(tag.update(&mut surface, 43.0));
        assert_eq!(surface.version(), 2);
    }

    #[test]
    fn glyphs_are_hollow_with_cyan_rim() {
        let tag = NameTag::new(GlyphSource::Bitmap);
        let mut surface = surface();
        surface.repaint(|pixmap| tag.paint(pixmap));

        // 'P' starts at x = 194, y = 186 with 20 px dots; its stem spans
        // x 194..214 for rows 186..326. The stem centre is glyph interior.
        assert_eq!(surface.pixel(204, 256).unwrap()[3], 0);

        // right on the outer edge of the stem the cyan stroke wins
        let rim = surface.pixel(193, 256).unwrap();
        assert_eq!(rim, [0, 255, 255, 255]);

        // a few pixels further out only the black outline remains
        let shadow = surface.pixel(188, 256).unwrap();
        assert_eq!(shadow, [0, 0, 0, 255]);

        // far from any glyph the surface is clear
        assert_eq!(surface.pixel(20, 20).unwrap()[3], 0);
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Ink {
        Clear,
        Black,
        Cyan,
    }

    fn ink(pixel: [u8; 4]) -> Option<Ink> {
        match pixel {
            [_, _, _, 0] => Some(Ink::Clear),
            [r, g, b, 255] if r < 32 && g < 32 && b < 32 => Some(Ink::Black),
            [r, g, b, 255] if r < 32 && g > 224 && b > 224 => Some(Ink::Cyan),
            _ => None,
        }
    }

    #[test]
    fn cyan_ring_sits_centred_on_wider_black_ring() {
        let tag = NameTag::new(GlyphSource::Bitmap);
        let mut surface = surface();
        surface.repaint(|pixmap| tag.paint(pixmap));

        // row 296 crosses only the one-dot stem of 'P' (x 194..214), well
        // clear of any horizontal dot side
        let mut runs: Vec<(Ink, u32)> = Vec::new();
        for x in 175..235 {
            let Some(kind) = ink(surface.pixel(x, 296).unwrap()) else {
                continue;
            };
            match runs.last_mut() {
                Some((last, len)) if *last == kind => *len += 1,
                _ => runs.push((kind, 1)),
            }
        }

        let kinds: Vec<Ink> = runs.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(
            kinds,
            [
                Ink::Clear,
                Ink::Black,
                Ink::Cyan,
                Ink::Black,
                Ink::Clear,
                Ink::Black,
                Ink::Cyan,
                Ink::Black,
                Ink::Clear,
            ],
            "runs across the stem: {runs:?}"
        );

        // outer edge of the stem: black ring of 14 with the 6 px cyan ring
        // drawn over its middle
        let (outer_black, cyan, inner_black) = (runs[1].1, runs[2].1, runs[3].1);
        assert!((5..=7).contains(&cyan), "cyan ring {cyan}");
        let black = outer_black + cyan + inner_black;
        assert!((13..=15).contains(&black), "black ring {black}");
        assert!(outer_black.abs_diff(inner_black) <= 1);

        // the stem interior between the two edges stays hollow
        assert!(runs[4].1 >= 4, "interior {}", runs[4].1);
    }
}
