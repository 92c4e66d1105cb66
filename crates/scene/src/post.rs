use glam::Vec3;

use crate::material::srgb_hex;

/// Number of blur levels in the bloom chain.
pub const BLOOM_LEVELS: usize = 5;

/// Bloom parameters. Fixed for the lifetime of the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct BloomSettings {
    pub strength: f32,
    pub radius: f32,
    pub threshold: f32,
    pub smooth_width: f32,
    pub kernel_radii: [u32; BLOOM_LEVELS],
    pub level_factors: [f32; BLOOM_LEVELS],
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            strength: 0.3,
            radius: 0.2,
            threshold: 0.9,
            smooth_width: 0.01,
            kernel_radii: [3, 5, 7, 9, 11],
            level_factors: [1.0, 0.8, 0.6, 0.4, 0.2],
        }
    }
}

impl BloomSettings {
    /// Per-level weights after blending each factor toward its mirror
    /// `1.2 - f` by the bloom radius.
    pub fn mixed_factors(&self) -> [f32; BLOOM_LEVELS] {
        self.level_factors
            .map(|factor| factor + (1.2 - factor - factor) * self.radius)
    }

    /// One-sided Gaussian weights for a kernel of `radius` taps, sigma equal
    /// to the radius. Index 0 is the centre tap.
    pub fn kernel_weights(radius: u32) -> Vec<f32> {
        let sigma = radius.max(1) as f32;
        (0..radius.max(1))
            .map(|tap| {
                let x = tap as f32;
                0.398_94 * (-0.5 * x * x / (sigma * sigma)).exp() / sigma
            })
            .collect()
    }
}

/// Post-processing chain parameters. Only the pixel block size changes at
/// run time.
#[derive(Debug, Clone, PartialEq)]
pub struct PostSettings {
    pixel_size: u32,
    bloom: BloomSettings,
}

impl PostSettings {
    pub fn new(pixel_size: u32) -> Self {
        Self {
            pixel_size: pixel_size.max(1),
            bloom: BloomSettings::default(),
        }
    }

    pub fn pixel_size(&self) -> u32 {
        self.pixel_size
    }

    pub fn bloom(&self) -> &BloomSettings {
        &self.bloom
    }

    /// Returns whether the value changed. Zero is raised to one.
    pub fn set_pixel_size(&mut self, value: u32) -> bool {
        let value = value.max(1);
        if value == self.pixel_size {
            return false;
        }
        self.pixel_size = value;
        true
    }

    /// Resolution the scene is rendered at before upscaling.
    pub fn scene_resolution(&self, width: u32, height: u32) -> (u32, u32) {
        (
            (width / self.pixel_size).max(1),
            (height / self.pixel_size).max(1),
        )
    }
}

impl Default for PostSettings {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Background, fog and tone mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Environment {
    /// Linear RGB.
    pub background: Vec3,
    /// Linear RGB.
    pub fog_color: Vec3,
    pub fog_density: f32,
    pub exposure: f32,
}

impl Default for Environment {
    fn default() -> Self {
        let backdrop = srgb_hex(0x0a0015);
        Self {
            background: backdrop,
            fog_color: backdrop,
            fog_density: 0.12,
            exposure: 0.85,
        }
    }
}

impl Environment {
    /// Exponential-squared fog amount at `distance`.
    pub fn fog_factor(&self, distance: f32) -> f32 {
        let amount = self.fog_density * distance;
        (1.0 - (-amount * amount).exp()).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_size_change_leaves_bloom_alone() {
        let mut post = PostSettings::default();
        let bloom = post.bloom().clone();

        assert!(post.set_pixel_size(6));
        assert_eq!(post.pixel_size(), 6);
        assert_eq!(post.bloom(), &bloom);

        assert!(!post.set_pixel_size(6));
        assert!(post.set_pixel_size(0));
        assert_eq!(post.pixel_size(), 1);
    }

    #[test]
    fn scene_resolution_floors_and_never_hits_zero() {
        let post = PostSettings::new(3);
        assert_eq!(post.scene_resolution(1280, 720), (426, 240));
        assert_eq!(post.scene_resolution(2, 2), (1, 1));
    }

    #[test]
    fn mixed_factors_follow_radius() {
        let bloom = BloomSettings::default();
        let mixed = bloom.mixed_factors();
        assert!((mixed[0] - 0.84).abs() < 1e-6);
        assert!((mixed[4] - 0.36).abs() < 1e-6);
    }

    #[test]
    fn kernel_weights_fall_off() {
        let weights = BloomSettings::kernel_weights(5);
        assert_eq!(weights.len(), 5);
        assert!(weights.windows(2).all(|pair| pair[0] > pair[1]));
        assert!((weights[0] - 0.398_94 / 5.0).abs() < 1e-6);
    }

    #[test]
    fn fog_thickens_with_distance() {
        let env = Environment::default();
        assert_eq!(env.fog_factor(0.0), 0.0);
        assert!(env.fog_factor(4.0) < env.fog_factor(12.0));
        assert!(env.fog_factor(1000.0) > 0.999);
    }
}
