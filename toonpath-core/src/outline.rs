//! Cel-style outline pass: every renderable node gets a back-face-only, darker,
//! slightly inflated sibling ("shell") that peeks out around its silhouette.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::scene::{MaterialDescriptor, MeshBinding, NodeId, Scene, SceneNode, ShellLink, Side, Transform};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineParams {
    pub enabled: bool,
    /// Uniform factor applied to the source scale.
    pub scale_factor: f32,
    /// HSL lightness removed from the source color.
    pub lightness_delta: f32,
}

impl Default for OutlineParams {
    fn default() -> Self {
        Self { enabled: true, scale_factor: 1.05, lightness_delta: 0.25 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutlineReport {
    pub shells_added: usize,
    /// Renderable nodes that already had a shell from an earlier pass.
    pub already_outlined: usize,
    /// Shells whose source material had no color to darken.
    pub missing_color: Vec<NodeId>,
}

/// Outline material for `source`: same color darkened, back faces only, flagged derived.
pub fn derive_material(source: &MaterialDescriptor, params: &OutlineParams) -> MaterialDescriptor {
    MaterialDescriptor {
        color: source.color.map(|c| c.darken(params.lightness_delta)),
        side: Side::Back,
        derived: true,
    }
}

/// Build the shell for `node` without touching any scene.
///
/// Returns `None` for groups and for nodes that are themselves outline output.
pub fn derive_shell(id: NodeId, node: &SceneNode, params: &OutlineParams) -> Option<SceneNode> {
    if node.is_derived() {
        return None;
    }
    let binding = node.binding()?;
    let material = derive_material(&binding.material, params);
    let shell_binding = MeshBinding { geometry: Arc::clone(&binding.geometry), material: Arc::new(material) };
    let transform = Transform { scale: node.transform.scale * params.scale_factor, ..node.transform };
    Some(SceneNode::shell(
        format!("{}-outline", node.name),
        shell_binding,
        transform,
        ShellLink { source: id, scale_factor: params.scale_factor },
    ))
}

/// Insert a shell after every renderable node that does not have one yet.
///
/// Shells are never outlined themselves, so repeated passes leave the scene unchanged.
pub fn apply_outlines(scene: &mut Scene, params: &OutlineParams) -> OutlineReport {
    let mut report = OutlineReport::default();
    if !params.enabled {
        return report;
    }
    let outlined: HashSet<NodeId> =
        scene.iter().filter_map(|(_, node)| node.shell_link()).map(|link| link.source).collect();

    for id in scene.walk() {
        let Some(node) = scene.node(id) else { continue };
        if !node.has_geometry() || node.is_derived() {
            continue;
        }
        if outlined.contains(&id) {
            report.already_outlined += 1;
            continue;
        }
        let Some(shell) = derive_shell(id, node, params) else { continue };
        if shell.material().is_some_and(|m| m.color.is_none()) {
            log::warn!("node `{}` has no material color, outline keeps the untinted material", node.name);
            report.missing_color.push(id);
        }
        match scene.insert_after(id, shell) {
            Ok(_) => report.shells_added += 1,
            Err(err) => log::warn!("could not attach outline for {id}: {err}"),
        }
    }
    log::debug!(
        "outline pass: {} added, {} already outlined",
        report.shells_added,
        report.already_outlined
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::scene::{build_scene, GeometryDescriptor, ShapeDescriptor, ShapeKind};
    use glam::Vec3;

    fn town() -> Scene {
        build_scene(&[
            ShapeDescriptor::new(ShapeKind::Plane, &[10.0, 12.0]).colored(Rgb::from_hex(0x027812)),
            ShapeDescriptor::new(ShapeKind::Box, &[1.0, 2.0, 1.0]).colored(Rgb::from_hex(0x0ce1e8)),
            ShapeDescriptor::new(ShapeKind::Circle, &[1.0]).colored(Rgb::from_hex(0x353835)),
        ])
        .unwrap()
    }

    #[test]
    fn shells_follow_their_sources() {
        let mut scene = town();
        let report = apply_outlines(&mut scene, &OutlineParams::default());
        assert_eq!(report.shells_added, 3);
        let kids = scene.children(scene.root()).to_vec();
        assert_eq!(kids.len(), 6);
        for pair in kids.chunks(2) {
            let source = scene.node(pair[0]).unwrap();
            let shell = scene.node(pair[1]).unwrap();
            assert!(!source.is_derived());
            assert_eq!(shell.shell_link().map(|l| l.source), Some(pair[0]));
            assert!(Arc::ptr_eq(source.geometry().unwrap(), shell.geometry().unwrap()));
            assert!(shell.transform.scale.abs_diff_eq(source.transform.scale * 1.05, 1e-6));
            assert_eq!(shell.transform.translation, source.transform.translation);
            assert_eq!(shell.material().unwrap().side, Side::Back);
        }
    }

    #[test]
    fn second_pass_adds_nothing() {
        let mut scene = town();
        apply_outlines(&mut scene, &OutlineParams::default());
        let once = scene.len();
        let report = apply_outlines(&mut scene, &OutlineParams::default());
        assert_eq!(scene.len(), once);
        assert_eq!(report.shells_added, 0);
        assert_eq!(report.already_outlined, 3);
    }

    #[test]
    fn derive_does_not_touch_source() {
        let scene = town();
        let id = scene.children(scene.root())[1];
        let before = scene.node(id).unwrap().clone();
        let shell = derive_shell(id, &before, &OutlineParams::default()).unwrap();
        let after = scene.node(id).unwrap();
        assert_eq!(after.transform, before.transform);
        assert!(Arc::ptr_eq(after.material().unwrap(), before.material().unwrap()));
        assert!(shell.material().unwrap().derived);
        assert!(derive_shell(id, &shell, &OutlineParams::default()).is_none());
    }

    #[test]
    fn missing_color_is_reported_not_fatal() {
        let mut scene = Scene::new();
        let root = scene.root();
        let binding = MeshBinding {
            geometry: Arc::new(GeometryDescriptor::new(ShapeKind::Plane, &[30.0, 30.0], None).unwrap()),
            material: Arc::new(MaterialDescriptor::untinted(Side::Front)),
        };
        let floor = scene.add(root, SceneNode::mesh("floor", binding, Transform::default())).unwrap();
        let report = apply_outlines(&mut scene, &OutlineParams::default());
        assert_eq!(report.shells_added, 1);
        assert_eq!(report.missing_color, vec![floor]);
        let shell = scene.shell_of(floor).unwrap();
        assert_eq!(scene.node(shell).unwrap().material().unwrap().color, None);
    }

    #[test]
    fn nested_meshes_get_shells_in_their_own_parent() {
        let mut scene = Scene::new();
        let root = scene.root();
        let group = scene.add(root, SceneNode::group("block")).unwrap();
        let binding = MeshBinding {
            geometry: Arc::new(GeometryDescriptor::new(ShapeKind::Box, &[1.0, 1.0, 1.0], None).unwrap()),
            material: Arc::new(MaterialDescriptor::new(Rgb::WHITE, Side::Front)),
        };
        let leaf = SceneNode::mesh("leaf", binding, Transform { scale: Vec3::new(1.0, 2.0, 1.0), ..Default::default() });
        let leaf = scene.add(group, leaf).unwrap();
        apply_outlines(&mut scene, &OutlineParams::default());
        let shell = scene.shell_of(leaf).unwrap();
        assert_eq!(scene.parent(shell), Some(group));
        assert_eq!(scene.children(root), &[group]);
    }

    #[test]
    fn disabled_pass_is_a_no_op() {
        let mut scene = town();
        let params = OutlineParams { enabled: false, ..OutlineParams::default() };
        assert_eq!(apply_outlines(&mut scene, &params), OutlineReport::default());
        assert_eq!(scene.shell_count(), 0);
    }
}
