use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl PerspectiveCamera {
    pub fn new(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y_degrees,
            aspect,
            near,
            far,
        }
    }

    /// Updates the aspect ratio; a zero-sized viewport keeps the old value.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Right-handed projection with a `[0, 1]` depth range.
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_degrees.to_radians(), self.aspect, self.near, self.far)
    }
}

/// Radius, polar angle from +Y and azimuth around +Y measured from +Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub phi: f32,
    pub theta: f32,
}

impl Spherical {
    pub fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(self) -> Vec3 {
        let sin_phi = self.phi.sin();
        Vec3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        )
    }
}

/// Keeps the view direction away from the up axis.
const POLE_EPSILON: f32 = 1.0e-3;

/// Orbit camera with inertia: input accumulates a pending rotation that is
/// released a fraction at a time on every `update`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitController {
    eye: Vec3,
    target: Vec3,
    pending_theta: f32,
    pending_phi: f32,
    pending_scale: f32,
    pub damping: f32,
    pub rotate_speed: f32,
    pub zoom_step: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl OrbitController {
    pub fn new(eye: Vec3, target: Vec3) -> Self {
        Self {
            eye,
            target,
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_scale: 1.0,
            damping: 0.05,
            rotate_speed: 1.0,
            zoom_step: 0.95,
            min_distance: 0.5,
            max_distance: 100.0,
        }
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }

    /// Pointer drag of (`dx`, `dy`) pixels in a viewport `viewport_height`
    /// pixels tall. A full-height drag is one full turn.
    pub fn rotate(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        self.pending_theta -= TAU * dx / viewport_height * self.rotate_speed;
        self.pending_phi -= TAU * dy / viewport_height * self.rotate_speed;
    }

    /// Positive steps move the eye toward the target.
    pub fn zoom(&mut self, steps: f32) {
        self.pending_scale *= self.zoom_step.powf(steps);
    }

    pub fn is_settled(&self) -> bool {
        self.pending_theta.abs() < 1.0e-6
            && self.pending_phi.abs() < 1.0e-6
            && (self.pending_scale - 1.0).abs() < 1.0e-6
    }

    /// Applies one damping step of the pending input.
    pub fn update(&mut self) {
        let mut spherical = Spherical::from_offset(self.eye - self.target);
        spherical.theta += self.pending_theta * self.damping;
        spherical.phi = (spherical.phi + self.pending_phi * self.damping)
            .clamp(POLE_EPSILON, PI - POLE_EPSILON);
        spherical.radius =
            (spherical.radius * self.pending_scale).clamp(self.min_distance, self.max_distance);

        self.eye = self.target + spherical.to_offset();

        self.pending_theta *= 1.0 - self.damping;
        self.pending_phi *= 1.0 - self.damping;
        self.pending_scale = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> OrbitController {
        OrbitController::new(Vec3::new(0.0, 1.5, 4.0), Vec3::ZERO)
    }

    #[test]
    fn update_without_input_keeps_the_eye() {
        let mut orbit = controller();
        for _ in 0..100 {
            orbit.update();
        }
        assert!((orbit.eye() - Vec3::new(0.0, 1.5, 4.0)).length() < 1e-4);
        assert!(orbit.is_settled());
    }

    #[test]
    fn drag_is_released_gradually() {
        let mut orbit = controller();
        let start = Spherical::from_offset(orbit.eye());
        orbit.rotate(-100.0, 0.0, 800.0);
        let expected = TAU * 100.0 / 800.0;

        orbit.update();
        let first = Spherical::from_offset(orbit.eye());
        assert!((first.theta - start.theta - expected * 0.05).abs() < 1e-4);

        for _ in 0..400 {
            orbit.update();
        }
        let settled = Spherical::from_offset(orbit.eye());
        assert!((settled.theta - start.theta - expected).abs() < 1e-3);
        assert!((settled.radius - start.radius).abs() < 1e-3);
    }

    #[test]
    fn polar_angle_never_reaches_the_pole() {
        let mut orbit = controller();
        orbit.rotate(0.0, 10_000.0, 100.0);
        for _ in 0..200 {
            orbit.update();
        }
        let spherical = Spherical::from_offset(orbit.eye());
        assert!(spherical.phi > 0.0);
        assert!(orbit.eye().y > 0.0);
        assert!(orbit.view().is_finite());
    }

    #[test]
    fn zoom_scales_distance_within_bounds() {
        let mut orbit = controller();
        let before = orbit.eye().length();
        orbit.zoom(1.0);
        orbit.update();
        assert!((orbit.eye().length() - before * 0.95).abs() < 1e-4);

        orbit.zoom(500.0);
        orbit.update();
        assert!((orbit.eye().length() - orbit.min_distance).abs() < 1e-4);
    }

    #[test]
    fn projection_tracks_aspect() {
        let mut camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 1000.0);
        camera.set_viewport(1600, 800);
        assert_eq!(camera.aspect, 2.0);
        camera.set_viewport(0, 800);
        assert_eq!(camera.aspect, 2.0);

        let clip = camera.projection() * glam::Vec4::new(0.0, 0.0, -0.1, 1.0);
        assert!((clip.z / clip.w).abs() < 1e-5);
    }
}
