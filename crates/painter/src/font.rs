use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rusttype::{point, Font, OutlineBuilder, Scale};
use tiny_skia::PathBuilder;

use crate::bitmap_font;

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("failed to read font at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("font at {path} is not valid TrueType/OpenType data")]
    InvalidFontData { path: PathBuf },
}

/// Where the glyph shapes for the name tag come from.
pub enum GlyphSource {
    Outline { font: Font<'static>, path: PathBuf },
    Bitmap,
}

impl fmt::Debug for GlyphSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Outline { path, .. } => f.debug_struct("Outline").field("path", path).finish(),
            Self::Bitmap => f.write_str("Bitmap"),
        }
    }
}

/// Placement of a single line of text: `center` is the middle of the em box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPlacement {
    pub center: (f32, f32),
    pub size: f32,
}

impl GlyphSource {
    pub fn load(path: &Path) -> Result<Self, FontError> {
        let data = fs::read(path).map_err(|source| FontError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let font = Font::try_from_vec(data).ok_or_else(|| FontError::InvalidFontData {
            path: path.to_path_buf(),
        })?;
        Ok(Self::Outline {
            font,
            path: path.to_path_buf(),
        })
    }

    /// Loads `path` when given; any failure is logged and replaced by the
    /// built-in bitmap font.
    pub fn load_or_fallback(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::Bitmap;
        };
        match Self::load(path) {
            Ok(source) => {
                tracing::info!(path = %path.display(), "loaded name tag font");
                source
            }
            Err(err) => {
                tracing::warn!(error = %err, "name tag font unavailable; using built-in bitmap font");
                Self::Bitmap
            }
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Bitmap)
    }

    /// Outline of `text` as a path in pixel space, or `None` when no glyph
    /// has an outline.
    pub fn outline_path(&self, text: &str, placement: TextPlacement) -> Option<tiny_skia::Path> {
        match self {
            Self::Outline { font, .. } => outline_glyphs(font, text, placement),
            Self::Bitmap => outline_bitmap(text, placement),
        }
    }
}

/// Forwards rusttype outline callbacks into a tiny-skia path.
struct GlyphPath(PathBuilder);

impl OutlineBuilder for GlyphPath {
    fn move_to(&mut self, x: f32, y: f32) {
        self.0.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.0.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.0.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.0.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.0.close();
    }
}

fn outline_glyphs(font: &Font<'static>, text: &str, placement: TextPlacement) -> Option<tiny_skia::Path> {
    let scale = Scale::uniform(placement.size);
    let metrics = font.v_metrics(scale);
    let advance = font
        .layout(text, scale, point(0.0, 0.0))
        .last()
        .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0);

    let origin_x = placement.center.0 - advance / 2.0;
    let baseline = placement.center.1 + (metrics.ascent + metrics.descent) / 2.0;

    let mut builder = GlyphPath(PathBuilder::new());
    for glyph in font.layout(text, scale, point(origin_x, baseline)) {
        glyph.build_outline(&mut builder);
    }
    builder.0.finish()
}

/// Traces the boundary of the lit dots: every dot side that faces an unlit
/// neighbour becomes one segment, so shared sides inside a glyph are skipped.
fn outline_bitmap(text: &str, placement: TextPlacement) -> Option<tiny_skia::Path> {
    // seven rows of dots span roughly the cap height of the requested size
    let dot = (placement.size / 10.0).round().max(1.0);
    let text_width = bitmap_font::text_columns(text) as f32 * dot;
    let text_height = bitmap_font::GLYPH_ROWS as f32 * dot;
    let left = (placement.center.0 - text_width / 2.0).round();
    let top = (placement.center.1 - text_height / 2.0).round();

    let mut builder = PathBuilder::new();
    for (index, ch) in text.chars().enumerate() {
        let glyph_left = left + (index as u32 * bitmap_font::GLYPH_ADVANCE) as f32 * dot;
        for row in 0..bitmap_font::GLYPH_ROWS as i32 {
            for column in 0..bitmap_font::GLYPH_COLUMNS as i32 {
                if !lit(ch, column, row) {
                    continue;
                }
                let x0 = glyph_left + column as f32 * dot;
                let y0 = top + row as f32 * dot;
                let (x1, y1) = (x0 + dot, y0 + dot);
                let sides = [
                    ((0, -1), (x0, y0), (x1, y0)),
                    ((1, 0), (x1, y0), (x1, y1)),
                    ((0, 1), (x1, y1), (x0, y1)),
                    ((-1, 0), (x0, y1), (x0, y0)),
                ];
                for ((dx, dy), from, to) in sides {
                    if !lit(ch, column + dx, row + dy) {
                        builder.move_to(from.0, from.1);
                        builder.line_to(to.0, to.1);
                    }
                }
            }
        }
    }
    builder.finish()
}

fn lit(ch: char, column: i32, row: i32) -> bool {
    column >= 0 && row >= 0 && bitmap_font::dot(ch, column as u32, row as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_font_reports_path() {
        let err = GlyphSource::load(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(matches!(err, FontError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/font.ttf"));
    }

    #[test]
    fn garbage_font_is_rejected_and_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not a font").unwrap();

        let err = GlyphSource::load(file.path()).unwrap_err();
        assert!(matches!(err, FontError::InvalidFontData { .. }));

        let source = GlyphSource::load_or_fallback(Some(file.path()));
        assert!(source.is_fallback());
    }

    #[test]
    fn no_font_configured_uses_bitmap() {
        assert!(GlyphSource::load_or_fallback(None).is_fallback());
    }

    #[test]
    fn bitmap_text_is_centred() {
        let placement = TextPlacement {
            center: (1024.0, 256.0),
            size: 200.0,
        };
        let path = GlyphSource::Bitmap
            .outline_path("PyramidBuilder", placement)
            .unwrap();
        let bounds = path.bounds();

        let mid_x = (bounds.left() + bounds.right()) / 2.0;
        let mid_y = (bounds.top() + bounds.bottom()) / 2.0;
        assert!((mid_x - 1024.0).abs() <= 20.0, "horizontal centre {mid_x}");
        assert!((mid_y - 256.0).abs() <= 20.0, "vertical centre {mid_y}");
        assert!(bounds.width() > 1500.0 && bounds.width() < 2048.0);
    }

    #[test]
    fn bitmap_outline_skips_shared_dot_sides() {
        // 'I' at 10 px dots: a bar of three, a one-dot stem, a bar of three
        let placement = TextPlacement {
            center: (25.0, 35.0),
            size: 100.0,
        };
        let path = GlyphSource::Bitmap.outline_path("I", placement).unwrap();
        let segments = path
            .segments()
            .filter(|segment| matches!(segment, tiny_skia::PathSegment::LineTo(_)))
            .count();
        // one segment per dot side on the perimeter
        assert_eq!(segments, 24);
        assert_eq!(path.bounds().width(), 30.0);
        assert_eq!(path.bounds().height(), 70.0);
    }

    #[test]
    fn empty_text_has_no_outline() {
        let placement = TextPlacement {
            center: (0.0, 0.0),
            size: 100.0,
        };
        assert!(GlyphSource::Bitmap.outline_path("   ", placement).is_none());
    }
}
