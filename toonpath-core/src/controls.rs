//! Orbit controls: the camera circles its target on a sphere whose polar angle
//! and radius are clamped, with optional damping and auto-rotation.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::camera::PerspectiveCamera;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitSettings {
    pub enabled: bool,
    /// Polar angle is measured from +Y, so 90 keeps the camera above the ground plane.
    pub min_polar_deg: f32,
    pub max_polar_deg: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub rotate_speed: f32,
    pub auto_rotate_deg_per_sec: f32,
    /// Fraction of the pending motion applied per update; 1 disables damping.
    pub damping: f32,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_polar_deg: 45.0,
            max_polar_deg: 90.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            rotate_speed: 1.0,
            auto_rotate_deg_per_sec: 0.0,
            damping: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    /// From +Y.
    polar: f32,
    /// About +Y, zero on +Z.
    azimuth: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return Self { radius: 0.0, polar: 0.0, azimuth: 0.0 };
        }
        Self {
            radius,
            polar: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            azimuth: offset.x.atan2(offset.z),
        }
    }

    fn to_offset(self) -> Vec3 {
        let (sin_p, cos_p) = self.polar.sin_cos();
        let (sin_a, cos_a) = self.azimuth.sin_cos();
        Vec3::new(self.radius * sin_p * sin_a, self.radius * cos_p, self.radius * sin_p * cos_a)
    }
}

/// Orbit camera driver. The host forwards pointer drags to [`rotate`](Self::rotate) and
/// wheel steps to [`zoom`](Self::zoom); the frame loop calls [`update`](Self::update)
/// once per frame, which eases queued input in by `damping`.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub settings: OrbitSettings,
    /// Radians still to apply: x is azimuth, y is polar.
    pending: Vec2,
    pending_zoom: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new(OrbitSettings::default())
    }
}

impl OrbitControls {
    pub fn new(settings: OrbitSettings) -> Self {
        Self { settings, pending: Vec2::ZERO, pending_zoom: 1.0 }
    }

    /// Queue a drag, in radians of azimuth and polar angle before `rotate_speed`.
    pub fn rotate(&mut self, azimuth: f32, polar: f32) {
        if !self.settings.enabled {
            return;
        }
        self.pending += Vec2::new(azimuth, polar) * self.settings.rotate_speed;
    }

    /// Queue a dolly; factors below 1 move closer.
    pub fn zoom(&mut self, factor: f32) {
        if self.settings.enabled && factor.is_finite() && factor > 0.0 {
            self.pending_zoom *= factor;
        }
    }

    /// Apply pending input, auto-rotation and clamps to `camera`. Returns whether it moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera, dt: f64) -> bool {
        if !self.settings.enabled {
            return false;
        }
        let s = self.settings;
        let mut sph = Spherical::from_offset(camera.position - camera.target);
        if sph.radius == 0.0 {
            return false;
        }

        let damping = if s.damping > 0.0 && s.damping < 1.0 { s.damping } else { 1.0 };
        let step = self.pending * damping;
        self.pending -= step;
        let zoom_step = self.pending_zoom.powf(damping);
        self.pending_zoom /= zoom_step;

        sph.azimuth += step.x + (s.auto_rotate_deg_per_sec.to_radians() as f64 * dt) as f32;
        let (lo, hi) = polar_limits(&s);
        sph.polar = (sph.polar + step.y).clamp(lo, hi);
        sph.radius = (sph.radius * zoom_step).clamp(s.min_distance.max(1e-3), s.max_distance.max(1e-3));

        let next = camera.target + sph.to_offset();
        let moved = !next.abs_diff_eq(camera.position, 1e-6);
        camera.position = next;
        moved
    }
}

fn polar_limits(s: &OrbitSettings) -> (f32, f32) {
    let lo = s.min_polar_deg.clamp(0.0, 180.0).to_radians();
    let hi = s.max_polar_deg.clamp(0.0, 180.0).to_radians();
    if lo <= hi {
        (lo, hi)
    } else {
        (hi, lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera { position: Vec3::new(0.0, 5.0, 5.0), ..Default::default() }
    }

    #[test]
    fn polar_angle_is_clamped() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(OrbitSettings::default());
        controls.rotate(0.0, 3.0);
        controls.update(&mut cam, 0.0);
        assert!(cam.position.y.abs() < 1e-4, "clamped at the horizon");
        controls.rotate(0.0, -3.0);
        controls.update(&mut cam, 0.0);
        let polar = (cam.position.y / cam.distance()).acos().to_degrees();
        assert!((polar - 45.0).abs() < 1e-3);
    }

    #[test]
    fn distance_is_clamped() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(OrbitSettings { min_distance: 5.0, max_distance: 20.0, ..Default::default() });
        controls.zoom(0.01);
        controls.update(&mut cam, 0.0);
        assert!((cam.distance() - 5.0).abs() < 1e-4);
        controls.zoom(100.0);
        controls.update(&mut cam, 0.0);
        assert!((cam.distance() - 20.0).abs() < 1e-3);
    }

    #[test]
    fn auto_rotate_circles_the_target() {
        let mut cam = camera();
        let before = cam.distance();
        let mut controls = OrbitControls::new(OrbitSettings { auto_rotate_deg_per_sec: 90.0, ..Default::default() });
        assert!(controls.update(&mut cam, 1.0));
        assert!((cam.distance() - before).abs() < 1e-4);
        assert!(cam.position.x > 4.9 && cam.position.z.abs() < 1e-4);
    }

    #[test]
    fn damping_spreads_motion_over_updates() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(OrbitSettings { damping: 0.5, ..Default::default() });
        controls.rotate(1.0, 0.0);
        controls.update(&mut cam, 0.0);
        let first = cam.position.x.atan2(cam.position.z);
        assert!((first - 0.5).abs() < 1e-4);
        controls.update(&mut cam, 0.0);
        let second = cam.position.x.atan2(cam.position.z);
        assert!((second - 0.75).abs() < 1e-4);
    }

    #[test]
    fn disabled_controls_do_nothing() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(OrbitSettings { enabled: false, auto_rotate_deg_per_sec: 90.0, ..Default::default() });
        controls.rotate(1.0, 1.0);
        assert!(!controls.update(&mut cam, 1.0));
        assert_eq!(cam.position, camera().position);
    }
}
