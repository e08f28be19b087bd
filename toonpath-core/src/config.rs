//! YAML scene descriptions: shapes, palette, camera, controls, outline and animations.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::PerspectiveCamera;
use crate::color::Rgb;
use crate::controls::OrbitSettings;
use crate::outline::OutlineParams;
use crate::path::CurveType;
use crate::scene::{MaterialDef, ShapeDescriptor};
use crate::timeline::Easing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    pub name: String,
    #[serde(default)]
    pub viewport: ViewportConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub controls: OrbitSettings,
    #[serde(default = "default_clear_color")]
    pub clear_color: Rgb,
    #[serde(default)]
    pub outline: OutlineParams,
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialDef>,
    #[serde(default)]
    pub shapes: Vec<ShapeDescriptor>,
    #[serde(default)]
    pub paths: Vec<PathConfig>,
    #[serde(default)]
    pub spins: Vec<SpinConfig>,
}

fn default_clear_color() -> Rgb {
    Rgb::BLACK
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self { width: 1280, height: 720 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        let cam = PerspectiveCamera::default();
        Self {
            fov_y_deg: cam.fov_y_deg,
            near: cam.near,
            far: cam.far,
            position: cam.position.to_array(),
            target: cam.target.to_array(),
        }
    }
}

impl CameraConfig {
    pub fn to_camera(&self, aspect: f32) -> PerspectiveCamera {
        PerspectiveCamera {
            fov_y_deg: self.fov_y_deg,
            aspect,
            near: self.near,
            far: self.far,
            position: Vec3::from_array(self.position),
            target: Vec3::from_array(self.target),
        }
    }
}

/// Moves the shape named `target` along a curve through `points`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    pub target: String,
    pub points: Vec<[f32; 3]>,
    /// Seconds for one full cycle.
    pub duration: f64,
    #[serde(default = "yes")]
    pub ping_pong: bool,
    #[serde(default = "yes")]
    pub looping: bool,
    #[serde(default)]
    pub easing: Easing,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub curve: CurveType,
    #[serde(default = "default_tension")]
    pub tension: f32,
    /// Reparameterize by arc length so the target moves at constant speed.
    #[serde(default)]
    pub constant_speed: bool,
    #[serde(default = "yes")]
    pub autostart: bool,
}

/// Turns the shape named `target` about `axis` by `angle_deg` per cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinConfig {
    pub target: String,
    #[serde(default = "y_axis")]
    pub axis: [f32; 3],
    #[serde(default = "full_turn")]
    pub angle_deg: f32,
    pub duration: f64,
    #[serde(default)]
    pub easing: Easing,
    #[serde(default = "yes")]
    pub looping: bool,
}

fn yes() -> bool {
    true
}

fn default_tension() -> f32 {
    0.5
}

fn y_axis() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}

fn full_turn() -> f32 {
    360.0
}

pub fn load_from_yaml_str(s: &str) -> Result<SceneConfig> {
    let cfg: SceneConfig = serde_yaml::from_str(s)?;
    Ok(cfg)
}

pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<SceneConfig> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    load_from_yaml_str(&data).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let cfg = load_from_yaml_str("name: empty\n").unwrap();
        assert_eq!(cfg.viewport, ViewportConfig { width: 1280, height: 720 });
        assert_eq!(cfg.outline, OutlineParams::default());
        assert_eq!(cfg.controls.max_polar_deg, 90.0);
        assert!(cfg.shapes.is_empty() && cfg.paths.is_empty());
    }

    #[test]
    fn shapes_paths_and_palette_parse() {
        let yaml = r##"
name: demo
clear_color: "#a3f6ff"
materials:
  grass: { color: "0x027812" }
  bare: {}
shapes:
  - { name: ground, shape: plane, dims: [10, 12], material: grass }
  - { name: box, shape: box, dims: [1, 2, 1], pos: [0, 1, 0], color: "rgb(12, 225, 232)" }
paths:
  - target: box
    points: [[0, 0.5, -4], [0, 0, 0], [1.5, 0.5, 2.5]]
    duration: 8
    easing: sine.inOut
spins:
  - { target: ground, duration: 10 }
"##;
        let cfg = load_from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.clear_color, Rgb::from_hex(0xa3f6ff));
        assert_eq!(cfg.materials["grass"].color, Some(Rgb::from_hex(0x027812)));
        assert_eq!(cfg.materials["bare"].color, None);
        assert_eq!(cfg.shapes[1].position, [0.0, 1.0, 0.0]);
        assert_eq!(cfg.shapes[1].color, Some(Rgb::from_hex(0x0ce1e8)));
        let path = &cfg.paths[0];
        assert!(path.ping_pong && path.looping && path.autostart);
        assert_eq!(format!("{:?}", path.easing), "sine.inOut");
        assert_eq!(path.curve, CurveType::Centripetal);
        assert_eq!(cfg.spins[0].axis, [0.0, 1.0, 0.0]);
        assert_eq!(cfg.spins[0].angle_deg, 360.0);
    }

    #[test]
    fn bad_color_is_an_error() {
        let err = load_from_yaml_str("name: x\nclear_color: \"#zz0000\"\n").unwrap_err();
        assert!(err.to_string().contains("zz0000"), "{err}");
    }
}
