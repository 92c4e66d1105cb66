use tiny_skia::Pixmap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapMode {
    Clamp,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// How the GPU should sample a surface once uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplingParams {
    pub wrap: WrapMode,
    pub filter: FilterMode,
}

impl SamplingParams {
    /// Hard-edged tiles: repeat wrapping, nearest filtering.
    pub const TILED: Self = Self {
        wrap: WrapMode::Repeat,
        filter: FilterMode::Nearest,
    };

    /// Single image stretched over a billboard.
    pub const SMOOTH: Self = Self {
        wrap: WrapMode::Clamp,
        filter: FilterMode::Linear,
    };
}

#[derive(Debug, thiserror::Error)]
#[error("cannot allocate {width}x{height} raster surface '{label}'")]
pub struct SurfaceAllocError {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Fixed-size pixel buffer that backs one GPU texture.
///
/// Every call to [`RasterSurface::repaint`] bumps the content version. The
/// GPU texture cache compares that version with the one it last uploaded, so
/// a repaint is always followed by exactly one upload and an untouched
/// surface is never uploaded twice. A fresh surface has version 0 and holds
/// transparent pixels until its first repaint.
#[derive(Debug)]
pub struct RasterSurface {
    label: &'static str,
    pixmap: Pixmap,
    sampling: SamplingParams,
    version: u64,
}

impl RasterSurface {
    pub fn new(
        label: &'static str,
        width: u32,
        height: u32,
        sampling: SamplingParams,
    ) -> Result<Self, SurfaceAllocError> {
        let pixmap = Pixmap::new(width, height).ok_or(SurfaceAllocError {
            label,
            width,
            height,
        })?;
        Ok(Self {
            label,
            pixmap,
            sampling,
            version: 0,
        })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn sampling(&self) -> SamplingParams {
        self.sampling
    }

    /// Content version; changes exactly once per repaint.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Runs `paint` against the pixel buffer and flags the new content for
    /// upload.
    pub fn repaint<F>(&mut self, paint: F)
    where
        F: FnOnce(&mut Pixmap),
    {
        paint(&mut self.pixmap);
        self.mark_dirty();
    }

    fn mark_dirty(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Copies the pixels out as straight (non-premultiplied) RGBA8, the
    /// layout the GPU textures use.
    pub fn straight_rgba(&self) -> Vec<u8> {
        let mut bytes = self.pixmap.data().to_vec();
        unpremultiply_rgba_in_place(&mut bytes);
        bytes
    }

    /// Straight RGBA value of a single pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let color = self.pixmap.pixel(x, y)?.demultiply();
        Some([color.red(), color.green(), color.blue(), color.alpha()])
    }
}

fn unpremultiply_rgba_in_place(bytes: &mut [u8]) {
    for pixel in bytes.chunks_exact_mut(4) {
        let alpha = pixel[3];
        if alpha == 0 {
            pixel[0] = 0;
            pixel[1] = 0;
            pixel[2] = 0;
            continue;
        }
        if alpha == u8::MAX {
            continue;
        }

        let alpha_u16 = alpha as u16;
        for channel in &mut pixel[..3] {
            *channel = ((*channel as u16 * 255 + alpha_u16 / 2) / alpha_u16).min(255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::Color;

    #[test]
    fn repaint_bumps_version_once() {
        let mut surface = RasterSurface::new("test", 4, 4, SamplingParams::TILED).unwrap();
        assert_eq!(surface.version(), 0);

        surface.repaint(|pixmap| pixmap.fill(Color::BLACK));
        assert_eq!(surface.version(), 1);

        surface.repaint(|pixmap| pixmap.fill(Color::WHITE));
        assert_eq!(surface.version(), 2);
    }

    #[test]
    fn zero_sized_surface_is_rejected() {
        let err = RasterSurface::new("empty", 0, 16, SamplingParams::SMOOTH).unwrap_err();
        assert_eq!(err.label, "empty");
        assert_eq!(err.width, 0);
    }

    #[test]
    fn straight_rgba_undoes_premultiplication() {
        let mut surface = RasterSurface::new("alpha", 2, 1, SamplingParams::SMOOTH).unwrap();
        surface.repaint(|pixmap| pixmap.fill(Color::from_rgba8(255, 0, 128, 128)));

        let bytes = surface.straight_rgba();
        assert_eq!(bytes.len(), 8);
        assert_eq!(bytes[3], 128);
        assert!(bytes[0] >= 253, "red channel {}", bytes[0]);
        assert_eq!(bytes[1], 0);
        assert!((bytes[2] as i32 - 128).abs() <= 2, "blue channel {}", bytes[2]);
    }

    #[test]
    fn transparent_pixels_have_zero_colour() {
        let mut bytes = vec![10, 20, 30, 0, 255, 255, 255, 255];
        unpremultiply_rgba_in_place(&mut bytes);
        assert_eq!(bytes, vec![0, 0, 0, 0, 255, 255, 255, 255]);
    }
}
