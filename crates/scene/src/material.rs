use glam::{Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub(crate) usize);

impl MaterialId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub(crate) usize);

impl SurfaceId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    /// Unlit textured surface.
    Basic,
    /// Unlit line segments.
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blending {
    Opaque,
    /// Alpha blended and drawn after opaque geometry, back to front.
    Transparent,
}

/// `uv * repeat + offset`, applied before sampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvTransform {
    pub repeat: Vec2,
    pub offset: Vec2,
}

impl Default for UvTransform {
    fn default() -> Self {
        Self {
            repeat: Vec2::ONE,
            offset: Vec2::ZERO,
        }
    }
}

/// Depth bias pushing filled faces behind coincident lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonOffset {
    pub factor: f32,
    pub units: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub label: &'static str,
    pub kind: MaterialKind,
    /// Linear RGB multiplier.
    pub color: Vec3,
    pub opacity: f32,
    pub blending: Blending,
    pub texture: Option<SurfaceId>,
    pub uv: UvTransform,
    pub double_sided: bool,
    pub polygon_offset: Option<PolygonOffset>,
    /// Quad stays facing the camera; only the node position and scale apply.
    pub billboard: bool,
    pub fog: bool,
}

impl Material {
    pub fn basic(label: &'static str, color: Vec3) -> Self {
        Self {
            label,
            kind: MaterialKind::Basic,
            color,
            opacity: 1.0,
            blending: Blending::Opaque,
            texture: None,
            uv: UvTransform::default(),
            double_sided: false,
            polygon_offset: None,
            billboard: false,
            fog: true,
        }
    }

    pub fn line(label: &'static str, color: Vec3) -> Self {
        Self {
            kind: MaterialKind::Line,
            ..Self::basic(label, color)
        }
    }

    pub fn with_texture(mut self, surface: SurfaceId) -> Self {
        self.texture = Some(surface);
        self
    }

    pub fn transparent(mut self, opacity: f32) -> Self {
        self.blending = Blending::Transparent;
        self.opacity = opacity;
        self
    }

    pub fn double_sided(mut self) -> Self {
        self.double_sided = true;
        self
    }

    pub fn with_polygon_offset(mut self, factor: f32, units: f32) -> Self {
        self.polygon_offset = Some(PolygonOffset { factor, units });
        self
    }

    pub fn with_uv_repeat(mut self, repeat: Vec2) -> Self {
        self.uv.repeat = repeat;
        self
    }

    pub fn billboard(mut self) -> Self {
        self.billboard = true;
        self
    }

    pub fn is_transparent(&self) -> bool {
        self.blending == Blending::Transparent
    }
}

/// Converts a `0xRRGGBB` sRGB literal to linear RGB.
pub fn srgb_hex(rgb: u32) -> Vec3 {
    let channel = |shift: u32| srgb_to_linear(((rgb >> shift) & 0xff) as f32 / 255.0);
    Vec3::new(channel(16), channel(8), channel(0))
}

pub fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colours_convert_to_linear() {
        assert_eq!(srgb_hex(0xffffff), Vec3::ONE);
        assert_eq!(srgb_hex(0x000000), Vec3::ZERO);
        let magenta = srgb_hex(0xff00ff);
        assert_eq!((magenta.x, magenta.y, magenta.z), (1.0, 0.0, 1.0));
        let mid = srgb_to_linear(0.5);
        assert!((mid - 0.214).abs() < 1e-3);
    }

    #[test]
    fn builders_compose() {
        let material = Material::basic("floor", Vec3::ONE)
            .with_texture(SurfaceId(1))
            .transparent(1.0)
            .double_sided()
            .with_uv_repeat(Vec2::splat(8.0));
        assert!(material.is_transparent());
        assert!(material.double_sided);
        assert_eq!(material.texture, Some(SurfaceId(1)));
        assert_eq!(material.uv.repeat, Vec2::new(8.0, 8.0));

        let line = Material::line("edges", Vec3::X);
        assert_eq!(line.kind, MaterialKind::Line);
        assert!(!line.is_transparent());
    }
}
