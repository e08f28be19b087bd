//! Everything one frame loop owns: the built scene, the camera and its controls, and the
//! animations bound to scene nodes.

use glam::Vec3;

use crate::animator::{PathAnimator, SpinAnimator};
use crate::camera::PerspectiveCamera;
use crate::color::Rgb;
use crate::config::{PathConfig, SceneConfig, SpinConfig};
use crate::controls::OrbitControls;
use crate::error::{ConstructionError, SceneError};
use crate::outline::{apply_outlines, OutlineReport};
use crate::path::{ControlPath, PathOptions};
use crate::scene::{NodeId, Scene, SceneBuilder};
use crate::timeline::{LoopMode, Timing};

#[derive(Debug, Clone)]
pub enum Animation {
    Path(PathAnimator),
    Spin(SpinAnimator),
}

impl Animation {
    pub fn is_running(&self) -> bool {
        match self {
            Animation::Path(a) => a.is_running(),
            Animation::Spin(a) => a.state().is_running(),
        }
    }
}

/// An animation and the node it drives.
#[derive(Debug, Clone)]
pub struct Binding {
    pub target: NodeId,
    pub animation: Animation,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Animations that moved their target this tick.
    pub advanced: usize,
    /// Stopped animations, skipped.
    pub idle: usize,
    /// Bindings whose target could not be updated; the target keeps last frame's pose.
    pub failed: Vec<(NodeId, SceneError)>,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Stage {
    pub name: String,
    pub scene: Scene,
    pub camera: PerspectiveCamera,
    pub controls: OrbitControls,
    pub clear_color: Rgb,
    pub bindings: Vec<Binding>,
    outline: OutlineReport,
}

impl Stage {
    /// Stage around an already built scene, with default camera and no animations.
    pub fn new(name: impl Into<String>, scene: Scene) -> Self {
        Self {
            name: name.into(),
            scene,
            camera: PerspectiveCamera::default(),
            controls: OrbitControls::default(),
            clear_color: Rgb::BLACK,
            bindings: Vec::new(),
            outline: OutlineReport::default(),
        }
    }

    /// Build the scene, run the outline pass once, then bind every animation by target name.
    pub fn from_config(cfg: &SceneConfig) -> Result<Self, ConstructionError> {
        let (width, height) = (cfg.viewport.width, cfg.viewport.height);
        if width == 0 || height == 0 {
            return Err(ConstructionError::InvalidViewport { width, height });
        }
        let mut builder = SceneBuilder::new();
        for (name, def) in &cfg.materials {
            builder.add_material(name.clone(), def);
        }
        let mut scene = builder.build(&cfg.shapes)?;
        let outline = apply_outlines(&mut scene, &cfg.outline);

        let mut stage = Self {
            name: cfg.name.clone(),
            scene,
            camera: cfg.camera.to_camera(width as f32 / height as f32),
            controls: OrbitControls::new(cfg.controls),
            clear_color: cfg.clear_color,
            bindings: Vec::with_capacity(cfg.paths.len() + cfg.spins.len()),
            outline,
        };
        for path in &cfg.paths {
            let target = stage.target(&path.target)?;
            stage.bind(target, Animation::Path(path_animator(path)?));
        }
        for spin in &cfg.spins {
            let target = stage.target(&spin.target)?;
            stage.bind(target, Animation::Spin(spin_animator(spin)?));
        }
        log::debug!(
            "stage `{}`: {} nodes, {} shells, {} animations",
            stage.name,
            stage.scene.len(),
            stage.scene.shell_count(),
            stage.bindings.len()
        );
        Ok(stage)
    }

    pub fn outline_report(&self) -> &OutlineReport {
        &self.outline
    }

    pub fn bind(&mut self, target: NodeId, animation: Animation) {
        self.bindings.push(Binding { target, animation });
    }

    /// Source node named `name`; outline shells are never animation targets.
    pub fn target(&self, name: &str) -> Result<NodeId, ConstructionError> {
        self.scene
            .walk()
            .into_iter()
            .find(|id| self.scene.node(*id).is_some_and(|n| !n.is_derived() && n.name == name))
            .ok_or_else(|| ConstructionError::UnknownTarget(name.to_string()))
    }

    pub fn any_running(&self) -> bool {
        self.bindings.iter().any(|b| b.animation.is_running())
    }

    /// Advance every animation by `dt` and drag outline shells along with their sources.
    pub fn update(&mut self, dt: f64) -> TickReport {
        let mut report = TickReport::default();
        for binding in &mut self.bindings {
            let Some(node) = self.scene.node_mut(binding.target) else {
                report.failed.push((binding.target, SceneError::UnknownNode(binding.target)));
                continue;
            };
            let moved = match &mut binding.animation {
                Animation::Path(a) => a.tick(dt, node).is_some(),
                Animation::Spin(a) => a.tick(dt, node).is_some(),
            };
            if !moved {
                report.idle += 1;
                continue;
            }
            match self.scene.sync_shell(binding.target) {
                Ok(()) => report.advanced += 1,
                Err(err) => report.failed.push((binding.target, err)),
            }
        }
        for (id, err) in &report.failed {
            log::warn!("tick skipped for {id}: {err}");
        }
        report
    }

    /// World positions of the animated nodes, in binding order.
    pub fn tracked_positions(&self) -> Vec<(String, Vec3)> {
        self.bindings
            .iter()
            .filter_map(|b| {
                let node = self.scene.node(b.target)?;
                let pos = self.scene.world_position(b.target).ok()?;
                Some((node.name.clone(), pos))
            })
            .collect()
    }
}

pub fn path_animator(cfg: &PathConfig) -> Result<PathAnimator, ConstructionError> {
    let points: Vec<Vec3> = cfg.points.iter().copied().map(Vec3::from_array).collect();
    let options = PathOptions {
        closed: cfg.closed,
        curve: cfg.curve,
        tension: cfg.tension,
        constant_speed: cfg.constant_speed,
    };
    let path = ControlPath::with_options(&points, options)?;
    let loop_mode = match (cfg.looping, cfg.ping_pong) {
        (false, _) => LoopMode::Once,
        (true, true) => LoopMode::PingPong,
        (true, false) => LoopMode::Repeat,
    };
    let mut animator = PathAnimator::from_parts(path, Timing::new(cfg.duration, loop_mode, cfg.easing)?);
    if !cfg.autostart {
        animator.stop();
    }
    Ok(animator)
}

pub fn spin_animator(cfg: &SpinConfig) -> Result<SpinAnimator, ConstructionError> {
    let loop_mode = if cfg.looping { LoopMode::Repeat } else { LoopMode::Once };
    let timing = Timing::new(cfg.duration, loop_mode, cfg.easing)?;
    SpinAnimator::new(Vec3::from_array(cfg.axis), cfg.angle_deg.to_radians(), timing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_from_yaml_str;

    const TOWN: &str = r##"
name: town
shapes:
  - { name: ground, shape: plane, dims: [10, 12], color: "#027812" }
  - { name: courier, shape: box, dims: [1, 2, 1], color: "#0ce1e8" }
paths:
  - target: courier
    points: [[0, 0.5, -4], [0, 0, 0], [1.5, 0.5, 2.5]]
    duration: 8
"##;

    #[test]
    fn shells_follow_animated_sources() {
        let mut stage = Stage::from_config(&load_from_yaml_str(TOWN).unwrap()).unwrap();
        assert_eq!(stage.outline_report().shells_added, 2);
        let courier = stage.target("courier").unwrap();
        let shell = stage.scene.shell_of(courier).unwrap();
        let report = stage.update(1.0);
        assert_eq!(report.advanced, 1);
        assert!(report.is_clean());
        let src = stage.scene.node(courier).unwrap().transform;
        let out = stage.scene.node(shell).unwrap().transform;
        assert_eq!(out.translation, src.translation);
        assert_eq!(out.rotation, src.rotation);
        assert!(out.scale.abs_diff_eq(src.scale * 1.05, 1e-6));
    }

    #[test]
    fn unknown_or_derived_targets_are_rejected() {
        let mut cfg = load_from_yaml_str(TOWN).unwrap();
        cfg.paths[0].target = "courier-outline".into();
        assert_eq!(
            Stage::from_config(&cfg).unwrap_err(),
            ConstructionError::UnknownTarget("courier-outline".into())
        );
        cfg.paths[0].target = "bus".into();
        assert!(matches!(Stage::from_config(&cfg), Err(ConstructionError::UnknownTarget(_))));
    }

    #[test]
    fn shells_never_shadow_a_shape_with_the_same_name() {
        let mut cfg = load_from_yaml_str(TOWN).unwrap();
        let mut decoy = cfg.shapes[1].clone();
        decoy.name = Some("courier-outline".into());
        decoy.position = [4.0, 0.0, 0.0];
        cfg.shapes.push(decoy);
        cfg.paths[0].target = "courier-outline".into();
        let stage = Stage::from_config(&cfg).unwrap();
        let target = stage.target("courier-outline").unwrap();
        let node = stage.scene.node(target).unwrap();
        assert!(!node.is_derived());
        assert_eq!(node.transform.translation, Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(stage.bindings[0].target, target);
    }

    #[test]
    fn duplicate_shape_names_fail_the_build() {
        let mut cfg = load_from_yaml_str(TOWN).unwrap();
        cfg.shapes.push(cfg.shapes[1].clone());
        assert!(matches!(
            Stage::from_config(&cfg),
            Err(ConstructionError::MalformedShape { ref name, .. }) if name == "courier"
        ));
    }

    #[test]
    fn invalid_path_surfaces_at_build_time() {
        let mut cfg = load_from_yaml_str(TOWN).unwrap();
        cfg.paths[0].points.truncate(1);
        assert_eq!(Stage::from_config(&cfg).unwrap_err(), ConstructionError::TooFewPoints(1));
        cfg.viewport.height = 0;
        assert!(matches!(Stage::from_config(&cfg), Err(ConstructionError::InvalidViewport { .. })));
    }

    #[test]
    fn missing_target_fails_the_tick_not_the_loop() {
        let mut stage = Stage::from_config(&load_from_yaml_str(TOWN).unwrap()).unwrap();
        let ghost = stage.target("courier").unwrap();
        let animation = stage.bindings[0].animation.clone();
        stage.bindings.push(Binding { target: NodeId::from_index(999), animation });
        let report = stage.update(0.5);
        assert_eq!(report.advanced, 1);
        assert_eq!(report.failed.len(), 1);
        assert!(stage.scene.node(ghost).is_some());
    }

    #[test]
    fn paused_animations_are_idle() {
        let mut cfg = load_from_yaml_str(TOWN).unwrap();
        cfg.paths[0].autostart = false;
        let mut stage = Stage::from_config(&cfg).unwrap();
        assert!(!stage.any_running());
        let before = stage.scene.node(stage.target("courier").unwrap()).unwrap().transform;
        assert_eq!(stage.update(1.0).idle, 1);
        assert_eq!(stage.scene.node(stage.target("courier").unwrap()).unwrap().transform, before);
    }
}
